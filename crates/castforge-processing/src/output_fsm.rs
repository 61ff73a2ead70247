//! Output Target Sub-FSM orchestration (spec §4.6): per-`(recording,
//! platform)` upload state, independent of the main Recording FSM, plus the
//! glue that folds the combined outcome back onto the recording once every
//! target reaches a terminal state.

use castforge_core::error::AppError;
use castforge_core::models::output_target::{
    derive_combined_upload_status, OutputTarget, OutputTargetStatus, MAX_TARGET_RETRY_COUNT,
};
use castforge_db::{OutputTargetRepository, RecordingRepository};
use chrono::Utc;
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Clone)]
pub struct OutputTargetFsm {
    targets: OutputTargetRepository,
    recordings: RecordingRepository,
}

impl OutputTargetFsm {
    pub fn new(targets: OutputTargetRepository, recordings: RecordingRepository) -> Self {
        Self { targets, recordings }
    }

    #[tracing::instrument(skip(self))]
    pub async fn begin_upload(&self, id: Uuid) -> Result<OutputTarget, AppError> {
        self.targets.mark_uploading(id).await
    }

    #[tracing::instrument(skip(self, target_meta))]
    pub async fn record_success(&self, id: Uuid, target_meta: JsonValue) -> Result<OutputTarget, AppError> {
        self.targets.record_success(id, target_meta, Utc::now()).await
    }

    /// Records a failed upload attempt. Mirrors the model method's policy
    /// (`OutputTarget::record_attempt_failure`) so the repository itself
    /// stays free of the retry-budget decision (spec §4.6, keeping policy at
    /// the orchestration layer rather than the SQL layer).
    #[tracing::instrument(skip(self))]
    pub async fn record_failure(&self, target: &OutputTarget) -> Result<OutputTarget, AppError> {
        let next_retry_count = target.retry_count + 1;
        let next_status = if next_retry_count > MAX_TARGET_RETRY_COUNT {
            OutputTargetStatus::Failed
        } else {
            OutputTargetStatus::Uploading
        };
        self.targets.record_attempt_failure(target.id, next_status, next_retry_count).await
    }

    #[tracing::instrument(skip(self, target_meta))]
    pub async fn update_metadata(&self, id: Uuid, target_meta: JsonValue) -> Result<OutputTarget, AppError> {
        self.targets.apply_metadata_update(id, target_meta, Utc::now()).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn reopen(&self, id: Uuid) -> Result<OutputTarget, AppError> {
        self.targets.reopen(id).await
    }

    /// Checks every target for `recording_id` and, once all are terminal,
    /// folds the combined outcome back onto the recording's main status
    /// (spec §4.6 "Combined upload status"). A no-op while any target is
    /// still `NotUploaded`/`Uploading`.
    #[tracing::instrument(skip(self))]
    pub async fn settle_recording(&self, tenant_id: Uuid, recording_id: Uuid) -> Result<(), AppError> {
        let targets = self.targets.list_by_recording(recording_id).await?;
        let Some(outcome) = derive_combined_upload_status(&targets) else {
            return Ok(());
        };

        if outcome.failed {
            let reason = "one or more output targets failed to upload".to_string();
            self.recordings
                .apply_stage_failure(
                    tenant_id,
                    recording_id,
                    outcome.status,
                    castforge_core::models::recording::PipelineStage::Uploading,
                    &reason,
                    Utc::now(),
                )
                .await?;
        } else {
            self.recordings.update_status(tenant_id, recording_id, outcome.status).await?;
        }
        Ok(())
    }
}
