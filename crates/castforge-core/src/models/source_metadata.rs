use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::source::SourceType;

/// 1:1 with Recording: the raw provider payload the source adapter returned
/// (spec §3). Unique globally on `(source_type, source_key)` so the same
/// provider recording is never ingested twice even across tenants'
/// differently-configured sources of the same type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SourceMetadata {
    pub recording_id: Uuid,
    pub source_type: SourceType,
    pub source_key: String,
    pub raw_payload: JsonValue,
    pub fetched_at: DateTime<Utc>,
}
