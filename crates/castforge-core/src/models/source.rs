use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// The kind of ingestion endpoint (spec §3 `Source`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "source_type", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    ConferencingCloud,
    CloudDrive,
    LocalFile,
}

/// A configured ingestion endpoint for a tenant. Unique `(tenant_id, type, name)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Source {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub source_type: SourceType,
    pub name: String,
    pub credential_id: Option<Uuid>,
    /// Settings document: folder path, URL, sync cadence — shape is
    /// adapter-specific and opaque to the core beyond `sync_days`.
    pub settings: JsonValue,
    pub sync_days: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SourceType {
    /// The `AdapterRegistry` lookup key for this source kind, mirroring
    /// `Platform::adapter_id` (spec §4.10).
    pub fn adapter_id(&self) -> &'static str {
        match self {
            SourceType::ConferencingCloud => "conferencing_cloud",
            SourceType::CloudDrive => "cloud_drive",
            SourceType::LocalFile => "local_file",
        }
    }
}

impl Source {
    /// Default lookback window for `Sync` when not overridden in `settings` (spec §4.9).
    pub const DEFAULT_SYNC_DAYS: i32 = 1;

    pub fn effective_sync_days(&self) -> i32 {
        if self.sync_days > 0 {
            self.sync_days
        } else {
            Self::DEFAULT_SYNC_DAYS
        }
    }
}

/// Raw metadata a source adapter returns when listing candidates, before a
/// `Recording` row is materialized (spec §4.10 `List`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingCandidate {
    pub source_key: String,
    pub display_name: String,
    pub start_time: DateTime<Utc>,
    pub duration_seconds: i64,
    pub size_bytes: i64,
    pub raw_payload: JsonValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_sync_days_falls_back_to_default() {
        let source = Source {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            source_type: SourceType::ConferencingCloud,
            name: "main".to_string(),
            credential_id: None,
            settings: serde_json::json!({}),
            sync_days: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(source.effective_sync_days(), Source::DEFAULT_SYNC_DAYS);
    }
}
