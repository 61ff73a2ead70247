use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Template lifecycle state (spec §3 `Template`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "template_status", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum TemplateStatus {
    Draft,
    Active,
}

/// A named bundle of matching rules, processing/transcription overrides,
/// metadata templates, and output configs (spec §3 `Template`).
/// Unique `(tenant_id, name)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Template {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub status: TemplateStatus,
    /// Ordering among templates during matching (descending), spec §4.4.
    pub priority: i32,
    /// Config layer 2 of the Config Resolver: processing + transcription + metadata overrides.
    pub config_overrides: JsonValue,
    /// Output configs referring to Output Presets (list of preset ids + enablement).
    pub output_configs: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    pub fn is_eligible_for_matching(&self) -> bool {
        self.status == TemplateStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_templates_are_not_eligible() {
        let tpl = Template {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "t".to_string(),
            status: TemplateStatus::Draft,
            priority: 0,
            config_overrides: serde_json::json!({}),
            output_configs: serde_json::json!([]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(!tpl.is_eligible_for_matching());
    }
}
