use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::credential::Platform;

/// A named reusable bundle of `(target_platform, credential, default
/// platform-metadata)` (spec §3 `Output Preset`). Unique `(tenant_id, name)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OutputPreset {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub target_platform: Platform,
    pub credential_id: Uuid,
    /// Default platform-level metadata (privacy, playlist id, category, ...).
    pub default_metadata: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
