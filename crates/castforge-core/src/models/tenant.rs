use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Tenant status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "tenant_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Suspended,
    Deleted,
}

/// Tenant role. Admin bypasses tenant filtering only through a distinct,
/// explicitly-marked API surface — never from pipeline code (spec §4.1).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "tenant_role", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum TenantRole {
    Admin,
    User,
}

/// The permission flag set from spec §6. Each gates the corresponding core operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TenantPermissions {
    pub can_transcribe: bool,
    pub can_process_video: bool,
    pub can_upload: bool,
    pub can_create_templates: bool,
    pub can_delete_recordings: bool,
    pub can_update_uploaded_videos: bool,
    pub can_manage_credentials: bool,
    pub can_export_data: bool,
}

/// Per-tenant limits enforced by the Quota Service and Pipeline Executor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TenantLimits {
    pub max_concurrent_processes: i32,
    pub max_recordings_per_month: Option<i32>,
    pub quota_disk_bytes: i64,
    pub max_file_bytes: i64,
    pub rate_limit_per_minute: i32,
}

/// Tenant (organization) entity — the principal of isolation (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub status: TenantStatus,
    pub role: TenantRole,
    pub permissions: sqlx::types::Json<TenantPermissions>,
    pub limits: sqlx::types::Json<TenantLimits>,
    pub timezone: String,
    /// Tenant-default config document (layer 1 of the Config Resolver, spec §4.3).
    pub default_config: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(chrono_tz::UTC)
    }

    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }

    pub fn is_admin(&self) -> bool {
        self.role == TenantRole::Admin
    }
}

/// Carries tenant identity, effective permissions, and the quota handle
/// through every downstream call (spec §4.1). Constructed only by the
/// (out-of-scope) auth layer; pipeline code never fabricates one.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: Uuid,
    pub role: TenantRole,
    pub permissions: TenantPermissions,
    pub limits: TenantLimits,
    pub timezone: Tz,
}

impl TenantContext {
    pub fn from_tenant(tenant: &Tenant) -> Self {
        Self {
            tenant_id: tenant.id,
            role: tenant.role,
            permissions: tenant.permissions.0,
            limits: tenant.limits.0,
            timezone: tenant.tz(),
        }
    }

    /// Admin bypass of tenant-filtering is never available through this
    /// type — it exists on a separate, explicitly-marked admin API surface.
    pub fn require_permission(&self, flag: impl Fn(&TenantPermissions) -> bool) -> bool {
        flag(&self.permissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_context() -> TenantContext {
        TenantContext {
            tenant_id: Uuid::new_v4(),
            role: TenantRole::User,
            permissions: TenantPermissions {
                can_upload: true,
                ..Default::default()
            },
            limits: TenantLimits {
                max_concurrent_processes: 2,
                max_recordings_per_month: Some(100),
                quota_disk_bytes: 1 << 40,
                max_file_bytes: 1 << 31,
                rate_limit_per_minute: 60,
            },
            timezone: chrono_tz::UTC,
        }
    }

    #[test]
    fn require_permission_checks_the_flag() {
        let ctx = sample_context();
        assert!(ctx.require_permission(|p| p.can_upload));
        assert!(!ctx.require_permission(|p| p.can_manage_credentials));
    }

    #[test]
    fn unknown_timezone_falls_back_to_utc() {
        let tenant = Tenant {
            id: Uuid::new_v4(),
            name: "acme".to_string(),
            status: TenantStatus::Active,
            role: TenantRole::User,
            permissions: sqlx::types::Json(TenantPermissions::default()),
            limits: sqlx::types::Json(TenantLimits {
                max_concurrent_processes: 1,
                max_recordings_per_month: None,
                quota_disk_bytes: 0,
                max_file_bytes: 0,
                rate_limit_per_minute: 10,
            }),
            timezone: "Not/ARealZone".to_string(),
            default_config: serde_json::json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(tenant.tz(), chrono_tz::UTC);
    }
}
