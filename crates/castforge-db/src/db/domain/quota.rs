use castforge_core::error::AppError;
use castforge_core::models::quota_usage::{QuotaReservationHandle, QuotaUsage};
use chrono::Utc;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::db::transaction::TransactionGuard;

/// Atomic reserve/commit/release over `(tenant_id, period)` (spec §4.8).
/// Every mutation runs inside a `SELECT ... FOR UPDATE` transaction so
/// concurrent pipeline invocations for the same tenant serialize on the
/// row, not in application memory.
#[derive(Clone)]
pub struct QuotaRepository {
    pool: PgPool,
}

impl QuotaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_or_init_row(
        tx: &mut TransactionGuard<'_>,
        tenant_id: Uuid,
        period: &str,
    ) -> Result<QuotaUsage, AppError> {
        sqlx::query(
            r#"
            INSERT INTO quota_usage (tenant_id, period, recordings_this_period, storage_bytes, active_concurrent_processes, updated_at)
            VALUES ($1, $2, 0, 0, 0, now())
            ON CONFLICT (tenant_id, period) DO NOTHING
            "#,
        )
        .bind(tenant_id)
        .bind(period)
        .execute(tx.as_mut().expect("transaction open"))
        .await?;

        sqlx::query_as::<Postgres, QuotaUsage>(
            "SELECT * FROM quota_usage WHERE tenant_id = $1 AND period = $2 FOR UPDATE",
        )
        .bind(tenant_id)
        .bind(period)
        .fetch_one(tx.as_mut().expect("transaction open"))
        .await
        .map_err(Into::into)
    }

    #[tracing::instrument(skip(self), fields(db.table = "quota_usage", db.operation = "reserve"))]
    pub async fn reserve(
        &self,
        tenant_id: Uuid,
        max_concurrent_processes: i32,
        max_recordings_per_month: Option<i32>,
    ) -> Result<QuotaReservationHandle, AppError> {
        let period = QuotaUsage::current_period(Utc::now());
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        let usage = Self::lock_or_init_row(&mut tx, tenant_id, &period).await?;

        if usage.active_concurrent_processes >= max_concurrent_processes {
            tx.rollback().await?;
            return Err(AppError::QuotaExceeded(
                "max_concurrent_processes reached".into(),
            ));
        }
        if let Some(limit) = max_recordings_per_month {
            if usage.recordings_this_period >= limit {
                tx.rollback().await?;
                return Err(AppError::QuotaExceeded(
                    "max_recordings_per_month reached".into(),
                ));
            }
        }

        sqlx::query(
            "UPDATE quota_usage SET active_concurrent_processes = active_concurrent_processes + 1, updated_at = now() WHERE tenant_id = $1 AND period = $2",
        )
        .bind(tenant_id)
        .bind(&period)
        .execute(tx.as_mut().expect("transaction open"))
        .await?;

        tx.commit().await?;
        Ok(QuotaReservationHandle { tenant_id, period })
    }

    #[tracing::instrument(skip(self, handle), fields(db.table = "quota_usage", db.operation = "commit"))]
    pub async fn commit(&self, handle: QuotaReservationHandle) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE quota_usage
            SET active_concurrent_processes = GREATEST(active_concurrent_processes - 1, 0),
                recordings_this_period = recordings_this_period + 1,
                updated_at = now()
            WHERE tenant_id = $1 AND period = $2
            "#,
        )
        .bind(handle.tenant_id)
        .bind(&handle.period)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, handle), fields(db.table = "quota_usage", db.operation = "release"))]
    pub async fn release(&self, handle: QuotaReservationHandle) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE quota_usage SET active_concurrent_processes = GREATEST(active_concurrent_processes - 1, 0), updated_at = now() WHERE tenant_id = $1 AND period = $2",
        )
        .bind(handle.tenant_id)
        .bind(&handle.period)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "quota_usage", db.operation = "track_storage_added"))]
    pub async fn track_storage_added(
        &self,
        tenant_id: Uuid,
        bytes: i64,
        quota_disk_bytes: i64,
    ) -> Result<(), AppError> {
        let period = QuotaUsage::current_period(Utc::now());
        let mut tx = TransactionGuard::begin(&self.pool).await?;
        let usage = Self::lock_or_init_row(&mut tx, tenant_id, &period).await?;

        if usage.storage_bytes + bytes > quota_disk_bytes {
            tx.rollback().await?;
            return Err(AppError::QuotaExceeded("quota_disk_bytes would be exceeded".into()));
        }

        sqlx::query(
            "UPDATE quota_usage SET storage_bytes = storage_bytes + $3, updated_at = now() WHERE tenant_id = $1 AND period = $2",
        )
        .bind(tenant_id)
        .bind(&period)
        .bind(bytes)
        .execute(tx.as_mut().expect("transaction open"))
        .await?;

        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "quota_usage", db.operation = "track_storage_removed"))]
    pub async fn track_storage_removed(&self, tenant_id: Uuid, bytes: i64) -> Result<(), AppError> {
        let period = QuotaUsage::current_period(Utc::now());
        sqlx::query(
            "UPDATE quota_usage SET storage_bytes = GREATEST(storage_bytes - $3, 0), updated_at = now() WHERE tenant_id = $1 AND period = $2",
        )
        .bind(tenant_id)
        .bind(&period)
        .bind(bytes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "quota_usage", db.operation = "select"))]
    pub async fn get_usage(&self, tenant_id: Uuid, period: &str) -> Result<QuotaUsage, AppError> {
        sqlx::query_as::<Postgres, QuotaUsage>("SELECT * FROM quota_usage WHERE tenant_id = $1 AND period = $2")
            .bind(tenant_id)
            .bind(period)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("quota usage not found".into()))
    }

    /// Background month-boundary job: carries `storage_bytes` forward into
    /// the new period and zeroes `recordings_this_period` (spec §4.8).
    #[tracing::instrument(skip(self), fields(db.table = "quota_usage", db.operation = "reset_monthly"))]
    pub async fn reset_monthly(&self, from_period: &str, to_period: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO quota_usage (tenant_id, period, recordings_this_period, storage_bytes, active_concurrent_processes, updated_at)
            SELECT tenant_id, $2, 0, storage_bytes, active_concurrent_processes, now()
            FROM quota_usage
            WHERE period = $1
            ON CONFLICT (tenant_id, period) DO UPDATE
            SET storage_bytes = EXCLUDED.storage_bytes, updated_at = now()
            "#,
        )
        .bind(from_period)
        .bind(to_period)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
