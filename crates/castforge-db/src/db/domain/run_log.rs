use castforge_core::error::AppError;
use castforge_core::models::recording::PipelineStage;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres};
use uuid::Uuid;

/// One append-only row per pipeline stage attempt (spec §4.7, §4.12). Not a
/// source of truth for FSM state — exists for observability and support.
#[derive(Debug, Clone, FromRow)]
pub struct ProcessingStageEntry {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub recording_id: Uuid,
    pub stage: PipelineStage,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub progress: i32,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct RunLogRepository {
    pool: PgPool,
}

impl RunLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "processing_stages", db.operation = "insert"))]
    pub async fn start_stage(
        &self,
        tenant_id: Uuid,
        recording_id: Uuid,
        stage: PipelineStage,
    ) -> Result<ProcessingStageEntry, AppError> {
        sqlx::query_as::<Postgres, ProcessingStageEntry>(
            r#"
            INSERT INTO processing_stages (id, tenant_id, recording_id, stage, started_at, completed_at, duration_ms, progress, error)
            VALUES ($1, $2, $3, $4, now(), NULL, NULL, 0, NULL)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(recording_id)
        .bind(stage)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    /// Progress is monotone within a run (spec §4.7); callers are expected
    /// not to report a lower value than the last one written.
    #[tracing::instrument(skip(self), fields(db.table = "processing_stages", db.operation = "update"))]
    pub async fn report_progress(&self, id: Uuid, progress: i32) -> Result<(), AppError> {
        sqlx::query("UPDATE processing_stages SET progress = $2 WHERE id = $1")
            .bind(id)
            .bind(progress.clamp(0, 100))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "processing_stages", db.operation = "update"))]
    pub async fn complete_stage(
        &self,
        id: Uuid,
        duration_ms: i64,
        error: Option<String>,
    ) -> Result<ProcessingStageEntry, AppError> {
        let progress = if error.is_none() { 100 } else { 0 };
        sqlx::query_as::<Postgres, ProcessingStageEntry>(
            r#"
            UPDATE processing_stages
            SET completed_at = now(), duration_ms = $2, error = $3, progress = GREATEST(progress, $4)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(duration_ms)
        .bind(error)
        .bind(progress)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("processing stage entry not found".into()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "processing_stages", db.operation = "select"))]
    pub async fn list_by_recording(&self, recording_id: Uuid) -> Result<Vec<ProcessingStageEntry>, AppError> {
        sqlx::query_as::<Postgres, ProcessingStageEntry>(
            "SELECT * FROM processing_stages WHERE recording_id = $1 ORDER BY started_at",
        )
        .bind(recording_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    #[tracing::instrument(skip(self), fields(db.table = "processing_stages", db.operation = "select"))]
    pub async fn list_by_tenant_window(
        &self,
        tenant_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ProcessingStageEntry>, AppError> {
        sqlx::query_as::<Postgres, ProcessingStageEntry>(
            "SELECT * FROM processing_stages WHERE tenant_id = $1 AND started_at BETWEEN $2 AND $3 ORDER BY started_at",
        )
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }
}
