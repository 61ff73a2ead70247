//! Source operations (spec §6): `UpsertSource`, `RunSync`.

use castforge_core::error::AppError;
use castforge_core::models::recording::Recording;
use castforge_core::models::source::{Source, SourceType};
use castforge_core::models::tenant::TenantContext;
use castforge_services::sync_service::SyncOutcome;
use chrono::{Duration, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::context::ApiContext;

pub async fn upsert_source(
    ctx: &ApiContext,
    tenant_ctx: &TenantContext,
    id: Option<Uuid>,
    source_type: SourceType,
    name: &str,
    credential_id: Option<Uuid>,
    settings: JsonValue,
    sync_days: i32,
) -> Result<Source, AppError> {
    match id {
        Some(id) => ctx.sources.update(tenant_ctx.tenant_id, id, name, settings, sync_days).await,
        None => {
            ctx.sources
                .create(tenant_ctx.tenant_id, source_type, name, credential_id, settings, sync_days)
                .await
        }
    }
}

pub async fn get_source(ctx: &ApiContext, tenant_ctx: &TenantContext, id: Uuid) -> Result<Source, AppError> {
    ctx.sources.get(tenant_ctx.tenant_id, id).await
}

pub async fn list_sources(ctx: &ApiContext, tenant_ctx: &TenantContext) -> Result<Vec<Source>, AppError> {
    ctx.sources.list(tenant_ctx.tenant_id).await
}

pub async fn delete_source(ctx: &ApiContext, tenant_ctx: &TenantContext, id: Uuid) -> Result<(), AppError> {
    ctx.sources.delete(tenant_ctx.tenant_id, id).await
}

/// On-demand `Sync(tenant, source, from=now - sync_days, to=now)` (spec
/// §4.9 step 2), the same lookback window and intake logic an automation
/// job's scheduled tick runs.
pub async fn run_sync(ctx: &ApiContext, tenant_ctx: &TenantContext, source_id: Uuid) -> Result<(Vec<Recording>, SyncOutcome), AppError> {
    let source = ctx.sources.get(tenant_ctx.tenant_id, source_id).await?;
    let to = Utc::now();
    let from = to - Duration::days(source.effective_sync_days() as i64);
    ctx.sync.sync(tenant_ctx.tenant_id, &source, from, to).await
}
