//! Quota Service (spec §4.8): per-tenant limit enforcement under concurrency.

use castforge_core::error::AppError;
use castforge_core::models::quota_usage::{QuotaReservationHandle, QuotaUsage};
use castforge_core::models::tenant::TenantLimits;
use castforge_db::QuotaRepository;
use uuid::Uuid;

#[derive(Clone)]
pub struct QuotaService {
    repo: QuotaRepository,
}

impl QuotaService {
    pub fn new(repo: QuotaRepository) -> Self {
        Self { repo }
    }

    #[tracing::instrument(skip(self, limits))]
    pub async fn reserve(&self, tenant_id: Uuid, limits: &TenantLimits) -> Result<QuotaReservationHandle, AppError> {
        self.repo
            .reserve(tenant_id, limits.max_concurrent_processes, limits.max_recordings_per_month)
            .await
    }

    #[tracing::instrument(skip(self, handle))]
    pub async fn commit(&self, handle: QuotaReservationHandle) -> Result<(), AppError> {
        self.repo.commit(handle).await
    }

    #[tracing::instrument(skip(self, handle))]
    pub async fn release(&self, handle: QuotaReservationHandle) -> Result<(), AppError> {
        self.repo.release(handle).await
    }

    #[tracing::instrument(skip(self, limits))]
    pub async fn track_storage_added(&self, tenant_id: Uuid, bytes: i64, limits: &TenantLimits) -> Result<(), AppError> {
        self.repo.track_storage_added(tenant_id, bytes, limits.quota_disk_bytes).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn track_storage_removed(&self, tenant_id: Uuid, bytes: i64) -> Result<(), AppError> {
        self.repo.track_storage_removed(tenant_id, bytes).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_usage(&self, tenant_id: Uuid, period: &str) -> Result<QuotaUsage, AppError> {
        self.repo.get_usage(tenant_id, period).await
    }

    /// Month-boundary background job.
    #[tracing::instrument(skip(self))]
    pub async fn reset_monthly(&self, from_period: &str, to_period: &str) -> Result<u64, AppError> {
        self.repo.reset_monthly(from_period, to_period).await
    }
}

/// RAII-style guard releasing an un-committed reservation on drop would
/// require async drop, which Rust does not support; callers must explicitly
/// call `commit` or `release` on every code path, mirroring `TransactionGuard`.
pub struct ReservationGuard {
    pub handle: QuotaReservationHandle,
    committed_or_released: bool,
}

impl ReservationGuard {
    pub fn new(handle: QuotaReservationHandle) -> Self {
        Self {
            handle,
            committed_or_released: false,
        }
    }

    pub fn mark_resolved(&mut self) {
        self.committed_or_released = true;
    }
}

impl Drop for ReservationGuard {
    fn drop(&mut self) {
        if !self.committed_or_released {
            tracing::warn!(
                tenant_id = %self.handle.tenant_id,
                period = %self.handle.period,
                "quota reservation dropped without commit or release"
            );
        }
    }
}
