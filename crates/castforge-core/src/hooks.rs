//! Observer hooks for quota accounting
//!
//! The Quota Service calls through `QuotaObserver` whenever it commits or
//! releases a reservation so that billing/analytics layers (out of core
//! scope) can subscribe without the core depending on them.

use async_trait::async_trait;
use uuid::Uuid;

/// A quota change the Quota Service reports after a successful
/// commit/release, independent of the counter it mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaResource {
    ConcurrentProcesses,
    MonthlyRecordings,
    StorageBytes,
}

/// Current usage snapshot for a tenant.
#[derive(Debug, Clone)]
pub struct UsageInfo {
    pub storage_bytes_used: i64,
    pub storage_bytes_limit: i64,
    pub monthly_recordings_used: i32,
    pub monthly_recordings_limit: i32,
    pub concurrent_processes_used: i32,
    pub concurrent_processes_limit: i32,
}

/// Observer interface the Quota Service reports through. The core calls
/// these on every committed reservation or release; implementations are
/// expected to be fire-and-forget (errors are logged, never propagated back
/// into the pipeline).
#[async_trait]
pub trait QuotaObserver: Send + Sync {
    /// A reservation against `resource` was committed (or released, with a
    /// negative `delta`).
    async fn report_usage_change(
        &self,
        tenant_id: Uuid,
        resource: QuotaResource,
        delta: i64,
    ) -> Result<(), String>;

    /// Current usage snapshot, if the observer tracks one.
    async fn get_usage(&self, tenant_id: Uuid) -> Result<Option<UsageInfo>, String>;
}

/// No-op implementation used when no external billing/analytics layer is wired up.
pub struct NoOpQuotaObserver;

#[async_trait]
impl QuotaObserver for NoOpQuotaObserver {
    async fn report_usage_change(
        &self,
        _tenant_id: Uuid,
        _resource: QuotaResource,
        _delta: i64,
    ) -> Result<(), String> {
        Ok(())
    }

    async fn get_usage(&self, _tenant_id: Uuid) -> Result<Option<UsageInfo>, String> {
        Ok(None)
    }
}
