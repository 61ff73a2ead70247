use castforge_core::error::AppError;
use castforge_core::models::tenant::{Tenant, TenantLimits, TenantPermissions, TenantStatus};
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Tenant CRUD. Unlike every other repository, these queries are not
/// tenant-scoped — a `Tenant` row is the scoping key itself. Callers are
/// the (out-of-scope) auth layer building a `TenantContext`, and the
/// admin surface that provisions tenants.
#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "tenants", db.operation = "insert"))]
    pub async fn create(
        &self,
        name: &str,
        timezone: &str,
        permissions: TenantPermissions,
        limits: TenantLimits,
    ) -> Result<Tenant, AppError> {
        sqlx::query_as::<Postgres, Tenant>(
            r#"
            INSERT INTO tenants (id, name, status, role, permissions, limits, timezone, default_config, created_at, updated_at)
            VALUES ($1, $2, 'active', 'user', $3, $4, $5, '{}'::jsonb, now(), now())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(sqlx::types::Json(permissions))
        .bind(sqlx::types::Json(limits))
        .bind(timezone)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    #[tracing::instrument(skip(self), fields(db.table = "tenants", db.operation = "select"))]
    pub async fn get(&self, tenant_id: Uuid) -> Result<Tenant, AppError> {
        sqlx::query_as::<Postgres, Tenant>("SELECT * FROM tenants WHERE id = $1")
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("tenant not found".into()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "tenants", db.operation = "update"))]
    pub async fn update_status(&self, tenant_id: Uuid, status: TenantStatus) -> Result<Tenant, AppError> {
        sqlx::query_as::<Postgres, Tenant>(
            "UPDATE tenants SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(tenant_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("tenant not found".into()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "tenants", db.operation = "update"))]
    pub async fn update_limits(&self, tenant_id: Uuid, limits: TenantLimits) -> Result<Tenant, AppError> {
        sqlx::query_as::<Postgres, Tenant>(
            "UPDATE tenants SET limits = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(tenant_id)
        .bind(sqlx::types::Json(limits))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("tenant not found".into()))
    }

    /// Layer 1 of the Config Resolver: the tenant-default config document.
    #[tracing::instrument(skip(self, config), fields(db.table = "tenants", db.operation = "update"))]
    pub async fn update_default_config(&self, tenant_id: Uuid, config: JsonValue) -> Result<Tenant, AppError> {
        sqlx::query_as::<Postgres, Tenant>(
            "UPDATE tenants SET default_config = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(tenant_id)
        .bind(config)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("tenant not found".into()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "tenants", db.operation = "select"))]
    pub async fn list_active(&self) -> Result<Vec<Tenant>, AppError> {
        sqlx::query_as::<Postgres, Tenant>("SELECT * FROM tenants WHERE status = 'active' ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }
}
