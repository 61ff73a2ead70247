//! Automation Job operations (spec §6): `UpsertAutomationJob`,
//! `DryRunAutomationJob`, plus the reads an HTTP router needs to render
//! them. The scheduled tick itself (spec §4.9) lives in the worker, which
//! calls the same `SyncService`/`TemplateMatcher`/`PipelineExecutor` this
//! crate wires up.

use castforge_core::error::AppError;
use castforge_core::models::automation_job::{AutomationJob, ScheduleDescriptor};
use castforge_core::models::automation_run::{AutomationRun, RunCounts, RunStatus};
use castforge_core::models::tenant::TenantContext;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::context::ApiContext;
use crate::permissions;

#[allow(clippy::too_many_arguments)]
pub async fn upsert_automation_job(
    ctx: &ApiContext,
    tenant_ctx: &TenantContext,
    id: Option<Uuid>,
    template_id: Uuid,
    schedule: ScheduleDescriptor,
    next_run: Option<DateTime<Utc>>,
    retry_max_attempts: i32,
    retry_delay_seconds: i64,
) -> Result<AutomationJob, AppError> {
    permissions::require(tenant_ctx, |p| p.can_create_templates, "UpsertAutomationJob")?;
    match id {
        Some(id) => ctx.automation_jobs.update_schedule(tenant_ctx.tenant_id, id, schedule, next_run).await,
        None => {
            ctx.automation_jobs
                .create(tenant_ctx.tenant_id, template_id, schedule, next_run, retry_max_attempts, retry_delay_seconds)
                .await
        }
    }
}

pub async fn get_automation_job(ctx: &ApiContext, tenant_ctx: &TenantContext, id: Uuid) -> Result<AutomationJob, AppError> {
    ctx.automation_jobs.get(tenant_ctx.tenant_id, id).await
}

pub async fn list_automation_jobs(ctx: &ApiContext, tenant_ctx: &TenantContext) -> Result<Vec<AutomationJob>, AppError> {
    ctx.automation_jobs.list(tenant_ctx.tenant_id).await
}

pub async fn set_automation_job_enabled(
    ctx: &ApiContext,
    tenant_ctx: &TenantContext,
    id: Uuid,
    enabled: bool,
) -> Result<AutomationJob, AppError> {
    permissions::require(tenant_ctx, |p| p.can_create_templates, "SetAutomationJobEnabled")?;
    ctx.automation_jobs.set_enabled(tenant_ctx.tenant_id, id, enabled).await
}

pub async fn delete_automation_job(ctx: &ApiContext, tenant_ctx: &TenantContext, id: Uuid) -> Result<(), AppError> {
    permissions::require(tenant_ctx, |p| p.can_create_templates, "DeleteAutomationJob")?;
    ctx.automation_jobs.delete(tenant_ctx.tenant_id, id).await
}

pub async fn list_automation_runs(ctx: &ApiContext, tenant_ctx: &TenantContext, since: DateTime<Utc>) -> Result<Vec<AutomationRun>, AppError> {
    ctx.automation_runs.list_by_tenant(tenant_ctx.tenant_id, since).await
}

/// Runs the sync + matching half of a job's tick without touching quota or
/// the Pipeline Executor, so a tenant can preview what a scheduled run
/// would pick up before enabling it (spec §4.9 dry-run mode).
pub async fn dry_run_automation_job(ctx: &ApiContext, tenant_ctx: &TenantContext, job_id: Uuid) -> Result<AutomationRun, AppError> {
    let job = ctx.automation_jobs.get(tenant_ctx.tenant_id, job_id).await?;
    let template = ctx.templates.get(tenant_ctx.tenant_id, job.template_id).await?;
    let run = ctx.automation_runs.start(job.id, tenant_ctx.tenant_id, 0, true).await?;

    let sources = ctx.sources.list(tenant_ctx.tenant_id).await?;
    let to = Utc::now();
    let mut counts = RunCounts::default();
    let mut errors = Vec::new();

    for source in sources {
        let from = to - Duration::days(source.effective_sync_days() as i64);
        match ctx.sync.sync(tenant_ctx.tenant_id, &source, from, to).await {
            Ok((created, outcome)) => {
                counts.synced += outcome.inserted as i32;
                for recording in created {
                    if let Some(matched) = ctx
                        .template_matcher
                        .find_match(tenant_ctx.tenant_id, &recording, source.source_type)
                        .await?
                    {
                        if matched == template.id {
                            counts.processed += 1;
                        }
                    }
                }
            }
            Err(e) => errors.push(e.to_string()),
        }
    }

    let status = if errors.is_empty() { RunStatus::Success } else { RunStatus::Failed };
    let error = if errors.is_empty() { None } else { Some(errors.join("; ")) };
    ctx.automation_runs.complete(run.id, status, counts, error).await
}
