use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row per `(tenant_id, period)`, mutated only by Quota Service
/// transactions (spec §3 `Quota Usage`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct QuotaUsage {
    pub tenant_id: Uuid,
    /// `YYYYMM`, e.g. `202607`.
    pub period: String,
    pub recordings_this_period: i32,
    pub storage_bytes: i64,
    pub active_concurrent_processes: i32,
    pub updated_at: DateTime<Utc>,
}

impl QuotaUsage {
    pub fn current_period(now: DateTime<Utc>) -> String {
        now.format("%Y%m").to_string()
    }
}

/// An active reservation returned by `Reserve`, consumed exactly once by
/// either `Commit` or `Release` (spec §4.8).
#[derive(Debug, Clone)]
pub struct QuotaReservationHandle {
    pub tenant_id: Uuid,
    pub period: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn current_period_formats_as_yyyymm() {
        let dt = Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap();
        assert_eq!(QuotaUsage::current_period(dt), "202607");
    }
}
