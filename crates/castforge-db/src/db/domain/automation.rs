use castforge_core::error::AppError;
use castforge_core::models::automation_job::{AutomationJob, JobLastStatus, ScheduleDescriptor};
use castforge_core::models::automation_run::{AutomationRun, RunCounts, RunStatus};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

#[derive(Clone)]
pub struct AutomationJobRepository {
    pool: PgPool,
}

impl AutomationJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, schedule), fields(db.table = "automation_jobs", db.operation = "insert"))]
    pub async fn create(
        &self,
        tenant_id: Uuid,
        template_id: Uuid,
        schedule: ScheduleDescriptor,
        next_run: Option<DateTime<Utc>>,
        retry_max_attempts: i32,
        retry_delay_seconds: i64,
    ) -> Result<AutomationJob, AppError> {
        sqlx::query_as::<Postgres, AutomationJob>(
            r#"
            INSERT INTO automation_jobs (
                id, tenant_id, template_id, schedule, enabled, last_run, next_run,
                last_status, retry_max_attempts, retry_delay_seconds, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, true, NULL, $5, NULL, $6, $7, now(), now())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(template_id)
        .bind(sqlx::types::Json(schedule))
        .bind(next_run)
        .bind(retry_max_attempts)
        .bind(retry_delay_seconds)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    #[tracing::instrument(skip(self), fields(db.table = "automation_jobs", db.operation = "select"))]
    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<AutomationJob, AppError> {
        sqlx::query_as::<Postgres, AutomationJob>(
            "SELECT * FROM automation_jobs WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("automation job not found".into()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "automation_jobs", db.operation = "select"))]
    pub async fn list(&self, tenant_id: Uuid) -> Result<Vec<AutomationJob>, AppError> {
        sqlx::query_as::<Postgres, AutomationJob>(
            "SELECT * FROM automation_jobs WHERE tenant_id = $1 ORDER BY created_at",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    /// Every enabled job whose `next_run` has arrived, across all tenants —
    /// the scheduler bucket-sorts this set by wall-clock time (spec §4.9).
    #[tracing::instrument(skip(self), fields(db.table = "automation_jobs", db.operation = "select"))]
    pub async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<AutomationJob>, AppError> {
        sqlx::query_as::<Postgres, AutomationJob>(
            "SELECT * FROM automation_jobs WHERE enabled = true AND next_run IS NOT NULL AND next_run <= $1 ORDER BY next_run",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    #[tracing::instrument(skip(self), fields(db.table = "automation_jobs", db.operation = "update"))]
    pub async fn record_run_outcome(
        &self,
        id: Uuid,
        last_run: DateTime<Utc>,
        next_run: Option<DateTime<Utc>>,
        last_status: JobLastStatus,
    ) -> Result<AutomationJob, AppError> {
        sqlx::query_as::<Postgres, AutomationJob>(
            r#"
            UPDATE automation_jobs
            SET last_run = $2, next_run = $3, last_status = $4, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(last_run)
        .bind(next_run)
        .bind(last_status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("automation job not found".into()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "automation_jobs", db.operation = "update"))]
    pub async fn set_enabled(&self, tenant_id: Uuid, id: Uuid, enabled: bool) -> Result<AutomationJob, AppError> {
        sqlx::query_as::<Postgres, AutomationJob>(
            "UPDATE automation_jobs SET enabled = $3, updated_at = now() WHERE id = $1 AND tenant_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(enabled)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("automation job not found".into()))
    }

    #[tracing::instrument(skip(self, schedule), fields(db.table = "automation_jobs", db.operation = "update"))]
    pub async fn update_schedule(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        schedule: ScheduleDescriptor,
        next_run: Option<DateTime<Utc>>,
    ) -> Result<AutomationJob, AppError> {
        sqlx::query_as::<Postgres, AutomationJob>(
            r#"
            UPDATE automation_jobs SET schedule = $3, next_run = $4, updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(sqlx::types::Json(schedule))
        .bind(next_run)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("automation job not found".into()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "automation_jobs", db.operation = "delete"))]
    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM automation_jobs WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("automation job not found".into()));
        }
        Ok(())
    }
}

/// Append-only log of automation job invocations (spec §3 `Automation Run`, §4.12).
#[derive(Clone)]
pub struct AutomationRunRepository {
    pool: PgPool,
}

impl AutomationRunRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "automation_runs", db.operation = "insert"))]
    pub async fn start(
        &self,
        job_id: Uuid,
        tenant_id: Uuid,
        retry_attempt: i32,
        dry_run: bool,
    ) -> Result<AutomationRun, AppError> {
        sqlx::query_as::<Postgres, AutomationRun>(
            r#"
            INSERT INTO automation_runs (id, job_id, tenant_id, started_at, completed_at, counts, error, retry_attempt, status, dry_run)
            VALUES ($1, $2, $3, now(), NULL, $4, NULL, $5, 'running', $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(job_id)
        .bind(tenant_id)
        .bind(sqlx::types::Json(RunCounts::default()))
        .bind(retry_attempt)
        .bind(dry_run)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    #[tracing::instrument(skip(self, counts), fields(db.table = "automation_runs", db.operation = "update"))]
    pub async fn complete(
        &self,
        id: Uuid,
        status: RunStatus,
        counts: RunCounts,
        error: Option<String>,
    ) -> Result<AutomationRun, AppError> {
        sqlx::query_as::<Postgres, AutomationRun>(
            r#"
            UPDATE automation_runs
            SET completed_at = now(), status = $2, counts = $3, error = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(sqlx::types::Json(counts))
        .bind(error)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("automation run not found".into()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "automation_runs", db.operation = "select"))]
    pub async fn list_by_job(&self, job_id: Uuid) -> Result<Vec<AutomationRun>, AppError> {
        sqlx::query_as::<Postgres, AutomationRun>(
            "SELECT * FROM automation_runs WHERE job_id = $1 ORDER BY started_at DESC",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    #[tracing::instrument(skip(self), fields(db.table = "automation_runs", db.operation = "select"))]
    pub async fn list_by_tenant(
        &self,
        tenant_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<AutomationRun>, AppError> {
        sqlx::query_as::<Postgres, AutomationRun>(
            "SELECT * FROM automation_runs WHERE tenant_id = $1 AND started_at >= $2 ORDER BY started_at DESC",
        )
        .bind(tenant_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }
}
