//! Recording operations (spec §6): `CreateRecording`, `BindTemplate`,
//! `RunPipeline`, `RetryRecording`, `CancelRun`, `DeleteRecording`,
//! `GetRecording`, `ListRecordings(filters)`.

use castforge_core::constants::{SYNC_MIN_DURATION_SECONDS_FOR_FULL_PIPELINE, SYNC_MIN_SIZE_BYTES_FOR_FULL_PIPELINE};
use castforge_core::error::AppError;
use castforge_core::models::recording::Recording;
use castforge_core::models::tenant::TenantContext;
use castforge_db::db::domain::recording::RecordingFilter;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::context::ApiContext;
use crate::permissions;

/// Directly materializes a Recording row from already-known metadata (the
/// local-file ingestion path — no adapter `list()` round-trip). Uses the
/// same full-pipeline eligibility bounds `Sync` applies (spec §4.9 step 2).
#[allow(clippy::too_many_arguments)]
pub async fn create_recording(
    ctx: &ApiContext,
    tenant_ctx: &TenantContext,
    source_id: Uuid,
    display_name: &str,
    start_time: DateTime<Utc>,
    duration_seconds: i64,
    size_bytes: i64,
    source_key: &str,
    raw_payload: JsonValue,
) -> Result<Recording, AppError> {
    let blank = duration_seconds < SYNC_MIN_DURATION_SECONDS_FOR_FULL_PIPELINE || size_bytes < SYNC_MIN_SIZE_BYTES_FOR_FULL_PIPELINE;
    ctx.recordings
        .create(
            tenant_ctx.tenant_id,
            source_id,
            display_name,
            start_time,
            duration_seconds,
            size_bytes,
            blank,
            source_key,
            raw_payload,
        )
        .await
}

pub async fn get_recording(ctx: &ApiContext, tenant_ctx: &TenantContext, id: Uuid) -> Result<Recording, AppError> {
    ctx.recordings.get(tenant_ctx.tenant_id, id).await
}

pub async fn list_recordings(ctx: &ApiContext, tenant_ctx: &TenantContext, filter: &RecordingFilter) -> Result<Vec<Recording>, AppError> {
    ctx.recordings.list(tenant_ctx.tenant_id, filter).await
}

pub async fn bind_template(ctx: &ApiContext, tenant_ctx: &TenantContext, id: Uuid, template_id: Uuid) -> Result<Recording, AppError> {
    ctx.templates.get(tenant_ctx.tenant_id, template_id).await?;
    ctx.recordings.bind_template(tenant_ctx.tenant_id, id, template_id).await
}

/// Runs the recording through the Pipeline Executor, registering a
/// cancellation token in the `RunRegistry` so a concurrent `CancelRun` call
/// can reach this invocation (spec §5).
pub async fn run_pipeline(ctx: &ApiContext, tenant_ctx: &TenantContext, id: Uuid) -> Result<Recording, AppError> {
    permissions::require(tenant_ctx, |p| p.can_process_video, "RunPipeline")?;

    let cancel = ctx.runs.register(id);
    let result = ctx.executor.run(tenant_ctx.tenant_id, id, &tenant_ctx.limits, cancel).await;
    ctx.runs.remove(id);
    result
}

/// `Retry(recording)` (spec §4.5): restores the stage indicated by
/// `failed_at_stage`, clears `failed`, bumps `retry_count`, then re-enters
/// the executor from there.
pub async fn retry_recording(ctx: &ApiContext, tenant_ctx: &TenantContext, id: Uuid) -> Result<Recording, AppError> {
    permissions::require(tenant_ctx, |p| p.can_process_video, "RetryRecording")?;

    ctx.recordings.begin_retry(tenant_ctx.tenant_id, id).await?;
    let cancel = ctx.runs.register(id);
    let result = ctx.executor.run(tenant_ctx.tenant_id, id, &tenant_ctx.limits, cancel).await;
    ctx.runs.remove(id);
    result
}

/// Resets the retry budget after exhaustion, an explicit admin/user
/// override (spec §4.5).
pub async fn reset_retry_budget(ctx: &ApiContext, tenant_ctx: &TenantContext, id: Uuid) -> Result<Recording, AppError> {
    permissions::require(tenant_ctx, |p| p.can_process_video, "ResetRetryBudget")?;
    ctx.recordings.reset_retry_budget(tenant_ctx.tenant_id, id).await
}

/// `ResetConfig(recording_id)` (spec §4.3): clears the per-recording config
/// override and, if no stage has started yet, the captured snapshot too.
pub async fn reset_config(ctx: &ApiContext, tenant_ctx: &TenantContext, id: Uuid) -> Result<(), AppError> {
    permissions::require(tenant_ctx, |p| p.can_process_video, "ResetConfig")?;
    ctx.config_resolver.reset_config(tenant_ctx.tenant_id, id).await
}

/// Signals cooperative cancellation to an in-flight run. Returns `false` if
/// nothing is currently running for this recording.
pub async fn cancel_run(ctx: &ApiContext, _tenant_ctx: &TenantContext, id: Uuid) -> bool {
    ctx.runs.cancel(id)
}

/// Deletes the recording row (cascades to output targets and source
/// metadata at the database level), removes every file under its storage
/// prefix, and decrements `storage_bytes` by exactly what was freed (spec
/// §8 scenario 8 "deletion completeness").
pub async fn delete_recording(ctx: &ApiContext, tenant_ctx: &TenantContext, id: Uuid) -> Result<(), AppError> {
    permissions::require(tenant_ctx, |p| p.can_delete_recordings, "DeleteRecording")?;

    let prefix = castforge_services::storage_path_builder::StoragePathBuilder::recording_prefix(tenant_ctx.tenant_id, id);
    let freed_bytes = ctx
        .storage
        .delete_prefix(&prefix)
        .await
        .map_err(|e| AppError::Internal(format!("failed to delete storage prefix {prefix}: {e}")))?;

    ctx.recordings.delete(tenant_ctx.tenant_id, id).await?;

    if freed_bytes > 0 {
        ctx.quota.track_storage_removed(tenant_ctx.tenant_id, freed_bytes as i64).await?;
    }
    Ok(())
}
