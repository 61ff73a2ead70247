//! Output Preset operations (spec §6): `UpsertPreset`.

use castforge_core::error::AppError;
use castforge_core::models::credential::Platform;
use castforge_core::models::output_preset::OutputPreset;
use castforge_core::models::tenant::TenantContext;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::context::ApiContext;
use crate::permissions;

#[allow(clippy::too_many_arguments)]
pub async fn upsert_preset(
    ctx: &ApiContext,
    tenant_ctx: &TenantContext,
    id: Option<Uuid>,
    name: &str,
    target_platform: Platform,
    credential_id: Uuid,
    default_metadata: JsonValue,
) -> Result<OutputPreset, AppError> {
    permissions::require(tenant_ctx, |p| p.can_create_templates, "UpsertPreset")?;
    match id {
        Some(id) => ctx.output_presets.update(tenant_ctx.tenant_id, id, credential_id, default_metadata).await,
        None => {
            ctx.output_presets
                .create(tenant_ctx.tenant_id, name, target_platform, credential_id, default_metadata)
                .await
        }
    }
}

pub async fn get_preset(ctx: &ApiContext, tenant_ctx: &TenantContext, id: Uuid) -> Result<OutputPreset, AppError> {
    ctx.output_presets.get(tenant_ctx.tenant_id, id).await
}

pub async fn list_presets(ctx: &ApiContext, tenant_ctx: &TenantContext) -> Result<Vec<OutputPreset>, AppError> {
    ctx.output_presets.list(tenant_ctx.tenant_id).await
}

pub async fn delete_preset(ctx: &ApiContext, tenant_ctx: &TenantContext, id: Uuid) -> Result<(), AppError> {
    permissions::require(tenant_ctx, |p| p.can_create_templates, "DeletePreset")?;
    ctx.output_presets.delete(tenant_ctx.tenant_id, id).await
}
