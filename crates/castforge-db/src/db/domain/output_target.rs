use castforge_core::error::AppError;
use castforge_core::models::credential::Platform;
use castforge_core::models::output_target::{OutputTarget, OutputTargetStatus};
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

#[derive(Clone)]
pub struct OutputTargetRepository {
    pool: PgPool,
}

impl OutputTargetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "output_targets", db.operation = "insert"))]
    pub async fn create(
        &self,
        recording_id: Uuid,
        target_platform: Platform,
        preset_id: Uuid,
    ) -> Result<OutputTarget, AppError> {
        sqlx::query_as::<Postgres, OutputTarget>(
            r#"
            INSERT INTO output_targets (id, recording_id, target_platform, status, failed, retry_count, preset_id, target_meta, uploaded_at, last_updated_at)
            VALUES ($1, $2, $3, 'not_uploaded', false, 0, $4, NULL, NULL, now())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(recording_id)
        .bind(target_platform)
        .bind(preset_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    #[tracing::instrument(skip(self), fields(db.table = "output_targets", db.operation = "select"))]
    pub async fn get(&self, id: Uuid) -> Result<OutputTarget, AppError> {
        sqlx::query_as::<Postgres, OutputTarget>("SELECT * FROM output_targets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("output target not found".into()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "output_targets", db.operation = "select"))]
    pub async fn list_by_recording(&self, recording_id: Uuid) -> Result<Vec<OutputTarget>, AppError> {
        sqlx::query_as::<Postgres, OutputTarget>(
            "SELECT * FROM output_targets WHERE recording_id = $1 ORDER BY target_platform",
        )
        .bind(recording_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    #[tracing::instrument(skip(self), fields(db.table = "output_targets", db.operation = "update"))]
    pub async fn mark_uploading(&self, id: Uuid) -> Result<OutputTarget, AppError> {
        sqlx::query_as::<Postgres, OutputTarget>(
            "UPDATE output_targets SET status = 'uploading', last_updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("output target not found".into()))
    }

    #[tracing::instrument(skip(self, target_meta), fields(db.table = "output_targets", db.operation = "update"))]
    pub async fn record_success(
        &self,
        id: Uuid,
        target_meta: JsonValue,
        now: DateTime<Utc>,
    ) -> Result<OutputTarget, AppError> {
        sqlx::query_as::<Postgres, OutputTarget>(
            r#"
            UPDATE output_targets
            SET status = 'uploaded', failed = false, target_meta = $2, uploaded_at = $3, last_updated_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(target_meta)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("output target not found".into()))
    }

    /// Only moves `status` to `Failed` once the retry budget is exhausted
    /// (`MAX_TARGET_RETRY_COUNT`, spec §4.6) — computed by the caller and
    /// passed in as `next_status` to keep this repository free of policy.
    #[tracing::instrument(skip(self), fields(db.table = "output_targets", db.operation = "update"))]
    pub async fn record_attempt_failure(
        &self,
        id: Uuid,
        next_status: OutputTargetStatus,
        retry_count: i32,
    ) -> Result<OutputTarget, AppError> {
        sqlx::query_as::<Postgres, OutputTarget>(
            r#"
            UPDATE output_targets
            SET status = $2, failed = true, retry_count = $3, last_updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(next_status)
        .bind(retry_count)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("output target not found".into()))
    }

    #[tracing::instrument(skip(self, target_meta), fields(db.table = "output_targets", db.operation = "update"))]
    pub async fn apply_metadata_update(
        &self,
        id: Uuid,
        target_meta: JsonValue,
        now: DateTime<Utc>,
    ) -> Result<OutputTarget, AppError> {
        sqlx::query_as::<Postgres, OutputTarget>(
            "UPDATE output_targets SET target_meta = $2, last_updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(target_meta)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("output target not found".into()))
    }

    /// Reopens a terminal target to `NotUploaded` when it is newly added to
    /// an already-`UPLOADED` recording (spec §4.6).
    #[tracing::instrument(skip(self), fields(db.table = "output_targets", db.operation = "update"))]
    pub async fn reopen(&self, id: Uuid) -> Result<OutputTarget, AppError> {
        sqlx::query_as::<Postgres, OutputTarget>(
            "UPDATE output_targets SET status = 'not_uploaded', failed = false, retry_count = 0, last_updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("output target not found".into()))
    }
}
