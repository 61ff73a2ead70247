use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a single automation run invocation (spec §3 `Automation Run`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "run_status", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
    Skipped,
}

/// Counts collected during one scheduler-driven run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct RunCounts {
    pub synced: i32,
    pub processed: i32,
    pub uploaded: i32,
}

/// Append-only entry per Automation Job invocation (spec §3 `Automation Run`, §4.12).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AutomationRun {
    pub id: Uuid,
    pub job_id: Uuid,
    pub tenant_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub counts: sqlx::types::Json<RunCounts>,
    pub error: Option<String>,
    pub retry_attempt: i32,
    pub status: RunStatus,
    pub dry_run: bool,
}

impl AutomationRun {
    pub fn is_terminal(&self) -> bool {
        !matches!(self.status, RunStatus::Running)
    }
}
