//! Recording FSM orchestration: the glue between a stage runner's outcome
//! and the rollback-plus-flag failure model already implemented at the
//! model (`castforge_core::models::recording`) and repository layers.
//!
//! Stage runners never touch `RecordingRepository` directly for status
//! transitions — they go through `RecordingFsm` so every transition is
//! paired with a `processing_stages` row (spec §4.12 Audit/Run Log).

use castforge_core::error::AppError;
use castforge_core::models::recording::{PipelineStage, Recording, RecordingStatus};
use castforge_db::db::domain::run_log::ProcessingStageEntry;
use castforge_db::{RecordingRepository, RunLogRepository};
use chrono::Utc;
use uuid::Uuid;

#[derive(Clone)]
pub struct RecordingFsm {
    recordings: RecordingRepository,
    run_log: RunLogRepository,
}

/// A stage's run-log row, held open for the duration of one stage attempt.
pub struct StageHandle {
    pub entry: ProcessingStageEntry,
    stage: PipelineStage,
    started_at: std::time::Instant,
}

impl RecordingFsm {
    pub fn new(recordings: RecordingRepository, run_log: RunLogRepository) -> Self {
        Self { recordings, run_log }
    }

    /// Opens a run-log row for `stage` and transitions the recording into
    /// its in-progress status (`DOWNLOADING`, `PROCESSING`, ...). Callers
    /// supply the in-progress `RecordingStatus` since it isn't derivable
    /// from `PipelineStage` alone (trim's in-progress status is `PROCESSING`,
    /// matching the spec's naming for that stage).
    #[tracing::instrument(skip(self))]
    pub async fn begin_stage(
        &self,
        tenant_id: Uuid,
        recording_id: Uuid,
        stage: PipelineStage,
        in_progress_status: RecordingStatus,
    ) -> Result<StageHandle, AppError> {
        self.recordings.update_status(tenant_id, recording_id, in_progress_status).await?;
        let entry = self.run_log.start_stage(tenant_id, recording_id, stage).await?;
        Ok(StageHandle {
            entry,
            stage,
            started_at: std::time::Instant::now(),
        })
    }

    #[tracing::instrument(skip(self, handle))]
    pub async fn report_progress(&self, handle: &StageHandle, progress: i32) -> Result<(), AppError> {
        self.run_log.report_progress(handle.entry.id, progress).await
    }

    /// Stage succeeded: closes the run-log row and advances the recording to
    /// `next_status`.
    #[tracing::instrument(skip(self, handle))]
    pub async fn complete_stage(
        &self,
        tenant_id: Uuid,
        recording_id: Uuid,
        handle: StageHandle,
        next_status: RecordingStatus,
    ) -> Result<Recording, AppError> {
        self.run_log
            .complete_stage(handle.entry.id, handle.started_at.elapsed().as_millis() as i64, None)
            .await?;
        self.recordings.update_status(tenant_id, recording_id, next_status).await
    }

    /// Stage failed: closes the run-log row with the error, then applies the
    /// rollback-plus-flag model (spec §4.5) in one statement.
    #[tracing::instrument(skip(self, handle, reason))]
    pub async fn fail_stage(
        &self,
        tenant_id: Uuid,
        recording_id: Uuid,
        handle: StageHandle,
        reason: impl Into<String>,
    ) -> Result<Recording, AppError> {
        let reason = reason.into();
        self.run_log
            .complete_stage(
                handle.entry.id,
                handle.started_at.elapsed().as_millis() as i64,
                Some(reason.clone()),
            )
            .await?;
        let now = Utc::now();
        self.recordings
            .apply_stage_failure(tenant_id, recording_id, handle.stage.rollback_status(), handle.stage, &reason, now)
            .await
    }

    /// `Retry(recording)` (spec §4.5): restores the recording to its
    /// pre-failure status and bumps `retry_count`, without re-running the stage.
    #[tracing::instrument(skip(self))]
    pub async fn retry(&self, tenant_id: Uuid, recording_id: Uuid) -> Result<Recording, AppError> {
        self.recordings.begin_retry(tenant_id, recording_id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn reset_retry_budget(&self, tenant_id: Uuid, recording_id: Uuid) -> Result<Recording, AppError> {
        self.recordings.reset_retry_budget(tenant_id, recording_id).await
    }
}
