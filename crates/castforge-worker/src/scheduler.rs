//! Automation Scheduler (spec §4.9): fires scheduled Template runs, grouped
//! by wall-clock time for efficiency. Mirrors the teacher's `TaskQueue`
//! worker pool (`mindia-worker/src/queue.rs`) — a background loop spawned
//! from `new`, a bounded concurrency gate, and an explicit `shutdown`
//! signal rather than relying on drop order.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use castforge_core::error::AppError;
use castforge_core::models::automation_job::AutomationJob;
use castforge_core::models::automation_run::{AutomationRun, RunCounts, RunStatus};
use castforge_core::models::tenant::TenantContext;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::{mpsc, Semaphore};
use uuid::Uuid;

use crate::context::WorkerContext;

#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    pub tick_interval: StdDuration,
    pub max_concurrent_jobs: usize,
}

impl SchedulerConfig {
    pub fn from_config(config: &castforge_core::config::Config) -> Self {
        Self {
            tick_interval: StdDuration::from_secs(config.scheduler_tick_interval_secs()),
            max_concurrent_jobs: config.max_concurrent_processes_default() as usize,
        }
    }
}

pub struct Scheduler {
    shutdown_tx: mpsc::Sender<()>,
}

impl Scheduler {
    pub fn new(context: WorkerContext, config: SchedulerConfig) -> Self {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            let semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));
            let mut interval = tokio::time::interval(config.tick_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            tracing::info!(tick_interval_secs = config.tick_interval.as_secs(), "scheduler started");

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::info!("scheduler shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        if let Err(e) = run_tick(&context, Utc::now(), &semaphore).await {
                            tracing::error!(error = %e, "scheduler tick failed");
                        }
                    }
                }
            }
        });

        Self { shutdown_tx }
    }

    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Groups a `next_run`-ordered list of due jobs into buckets of identical
/// `next_run` timestamps — jobs in the same bucket fire concurrently (spec
/// §4.9 scenario 6: four jobs all due at `06:00 Europe/Moscow` run in
/// parallel in one tick).
fn bucket_due_jobs(jobs: Vec<AutomationJob>) -> Vec<Vec<AutomationJob>> {
    let mut buckets: Vec<Vec<AutomationJob>> = Vec::new();
    for job in jobs {
        match buckets.last_mut() {
            Some(bucket) if bucket[0].next_run == job.next_run => bucket.push(job),
            _ => buckets.push(vec![job]),
        }
    }
    buckets
}

async fn run_tick(context: &WorkerContext, now: DateTime<Utc>, semaphore: &Arc<Semaphore>) -> Result<(), AppError> {
    let due = context.automation_jobs.list_due(now).await?;
    if due.is_empty() {
        return Ok(());
    }
    tracing::info!(job_count = due.len(), "scheduler tick firing due jobs");

    for bucket in bucket_due_jobs(due) {
        let mut handles = Vec::with_capacity(bucket.len());
        for job in bucket {
            let context = context.clone();
            let permit = semaphore.clone().acquire_owned().await.expect("semaphore never closed");
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                run_job_with_retry_bookkeeping(&context, job, now).await;
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }

    Ok(())
}

/// Runs one job's tick, then records the outcome and computes the job's
/// next fire time: on success, the schedule's regular next occurrence; on
/// failure, an exponential backoff slot until `retry_max_attempts` is
/// exhausted, after which the job falls back to its regular schedule and
/// `last_status` is left `Failed` for an operator to notice (spec §4.9
/// Retry / Catch-up policy).
async fn run_job_with_retry_bookkeeping(context: &WorkerContext, job: AutomationJob, now: DateTime<Utc>) {
    let attempt = match consecutive_failures(context, job.id).await {
        Ok(n) => n + 1,
        Err(e) => {
            tracing::error!(job_id = %job.id, error = %e, "failed to read automation run history, assuming attempt 1");
            1
        }
    };

    let result = execute_job(context, &job, attempt, false).await;

    let (last_status, next_run) = match &result {
        Ok(_) => (castforge_core::models::automation_job::JobLastStatus::Success, job.schedule.0.next_after(now)),
        Err(_) if attempt < job.retry_max_attempts => {
            let backoff = job.retry_backoff_seconds(attempt);
            (castforge_core::models::automation_job::JobLastStatus::Failed, Some(now + Duration::seconds(backoff)))
        }
        Err(_) => (castforge_core::models::automation_job::JobLastStatus::Failed, job.schedule.0.next_after(now)),
    };

    if let Err(e) = context.automation_jobs.record_run_outcome(job.id, now, next_run, last_status).await {
        tracing::error!(job_id = %job.id, error = %e, "failed to record automation job outcome");
    }

    if let Err(e) = result {
        tracing::error!(job_id = %job.id, attempt, error = %e, "automation job run failed");
    }
}

/// Count of consecutive `Failed` runs immediately preceding `now` for this
/// job (most recent run first), used to derive the next retry attempt
/// number without a dedicated counter column on `AutomationJob`.
async fn consecutive_failures(context: &WorkerContext, job_id: Uuid) -> Result<i32, AppError> {
    let runs = context.automation_runs.list_by_job(job_id).await?;
    let mut count = 0;
    for run in runs {
        if run.status == RunStatus::Failed {
            count += 1;
        } else {
            break;
        }
    }
    Ok(count)
}

/// Per-job execution (spec §4.9 steps 1-5): look up the template, sync
/// every one of the tenant's sources, match new recordings against this
/// job's template, and (unless `dry_run`) submit matches to the Pipeline
/// Executor respecting the tenant's concurrency limit.
pub async fn execute_job(context: &WorkerContext, job: &AutomationJob, retry_attempt: i32, dry_run: bool) -> Result<AutomationRun, AppError> {
    let tenant = context.tenants.get(job.tenant_id).await?;
    let tenant_ctx = TenantContext::from_tenant(&tenant);
    let template = context.templates.get(job.tenant_id, job.template_id).await?;
    let run = context.automation_runs.start(job.id, job.tenant_id, retry_attempt, dry_run).await?;

    let sources = context.sources.list(job.tenant_id).await?;
    let to = Utc::now();
    let mut counts = RunCounts::default();
    let mut errors = Vec::new();

    for source in sources {
        let from = to - Duration::days(source.effective_sync_days() as i64);
        let (created, outcome) = match context.sync.sync(job.tenant_id, &source, from, to).await {
            Ok(result) => result,
            Err(e) => {
                errors.push(e.to_string());
                continue;
            }
        };
        counts.synced += outcome.inserted;

        for recording in created {
            let matched = match context
                .template_matcher
                .find_match(job.tenant_id, &recording, source.source_type)
                .await
            {
                Ok(matched) => matched,
                Err(e) => {
                    errors.push(e.to_string());
                    continue;
                }
            };
            if matched != Some(template.id) {
                continue;
            }

            context.recordings.bind_template(job.tenant_id, recording.id, template.id).await.ok();
            counts.processed += 1;

            if dry_run {
                continue;
            }

            let cancel = tokio_util::sync::CancellationToken::new();
            match context.executor.run(job.tenant_id, recording.id, &tenant_ctx.limits, cancel).await {
                Ok(_) => counts.uploaded += 1,
                Err(e) => errors.push(e.to_string()),
            }
        }
    }

    let status = if errors.is_empty() { RunStatus::Success } else { RunStatus::Failed };
    let error = if errors.is_empty() { None } else { Some(errors.join("; ")) };
    context.automation_runs.complete(run.id, status, counts, error).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use castforge_core::models::automation_job::ScheduleDescriptor;
    use chrono::TimeZone;

    fn job_with_next_run(next_run: Option<DateTime<Utc>>) -> AutomationJob {
        AutomationJob {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            template_id: Uuid::new_v4(),
            schedule: sqlx::types::Json(ScheduleDescriptor::EveryNHours { n: 6 }),
            enabled: true,
            last_run: None,
            next_run,
            last_status: None,
            retry_max_attempts: 3,
            retry_delay_seconds: 10,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn buckets_group_identical_next_run_timestamps() {
        let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 6, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 1, 1, 7, 0, 0).unwrap();

        let jobs = vec![
            job_with_next_run(Some(t1)),
            job_with_next_run(Some(t1)),
            job_with_next_run(Some(t1)),
            job_with_next_run(Some(t2)),
        ];

        let buckets = bucket_due_jobs(jobs);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].len(), 3);
        assert_eq!(buckets[1].len(), 1);
    }

    #[test]
    fn empty_job_list_produces_no_buckets() {
        assert!(bucket_due_jobs(Vec::new()).is_empty());
    }
}
