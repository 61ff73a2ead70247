use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::credential::Platform;

/// Per-platform upload state, independent of the main Recording FSM (spec §4.6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "output_target_status", rename_all = "snake_case")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputTargetStatus {
    NotUploaded,
    Uploading,
    Uploaded,
    Failed,
}

/// Upload retries budget per target before the sub-FSM gives up (spec §4.6).
pub const MAX_TARGET_RETRY_COUNT: i32 = 2;

/// One row per `(recording, target_platform)` (spec §3 `OutputTarget`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OutputTarget {
    pub id: Uuid,
    pub recording_id: Uuid,
    pub target_platform: Platform,
    pub status: OutputTargetStatus,
    pub failed: bool,
    pub retry_count: i32,
    pub preset_id: Uuid,
    /// Remote id, URL, privacy, playlist/album id.
    pub target_meta: Option<JsonValue>,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub last_updated_at: DateTime<Utc>,
}

impl OutputTarget {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            OutputTargetStatus::Uploaded | OutputTargetStatus::Failed
        )
    }

    /// Record a failed upload attempt; the status only moves to `Failed`
    /// once the retry budget is exhausted (spec §4.6).
    pub fn record_attempt_failure(&mut self) {
        self.failed = true;
        self.retry_count += 1;
        if self.retry_count > MAX_TARGET_RETRY_COUNT {
            self.status = OutputTargetStatus::Failed;
        }
    }

    pub fn record_success(&mut self, target_meta: JsonValue, now: DateTime<Utc>) {
        self.status = OutputTargetStatus::Uploaded;
        self.failed = false;
        self.target_meta = Some(target_meta);
        self.uploaded_at = Some(now);
        self.last_updated_at = now;
    }

    /// `UpdateMetadata` re-entry on an already-uploaded target: does not
    /// change `status` (spec §4.6).
    pub fn apply_metadata_update(&mut self, target_meta: JsonValue, now: DateTime<Utc>) {
        self.target_meta = Some(target_meta);
        self.last_updated_at = now;
    }

    /// Reopen a terminal target to `NotUploaded` when a new target is added
    /// to an already-`UPLOADED` recording (spec §4.6, "adding a new target").
    pub fn reopen(&mut self) {
        self.status = OutputTargetStatus::NotUploaded;
        self.failed = false;
        self.retry_count = 0;
    }
}

/// The recording-level status/failed pair derived once all targets reach a
/// terminal state, or `None` if at least one target is still non-terminal
/// (spec §4.6 "Combined upload status").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombinedUploadOutcome {
    pub status: super::recording::RecordingStatus,
    pub failed: bool,
}

pub fn derive_combined_upload_status(targets: &[OutputTarget]) -> Option<CombinedUploadOutcome> {
    use super::recording::RecordingStatus;

    if targets.is_empty() {
        return None;
    }
    if !targets.iter().all(OutputTarget::is_terminal) {
        return None;
    }

    let uploaded = targets
        .iter()
        .filter(|t| t.status == OutputTargetStatus::Uploaded)
        .count();
    let failed = targets
        .iter()
        .filter(|t| t.status == OutputTargetStatus::Failed)
        .count();

    Some(if failed == 0 {
        CombinedUploadOutcome {
            status: RecordingStatus::Uploaded,
            failed: false,
        }
    } else if uploaded > 0 {
        CombinedUploadOutcome {
            status: RecordingStatus::Uploaded,
            failed: true,
        }
    } else {
        CombinedUploadOutcome {
            status: RecordingStatus::Transcribed,
            failed: true,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(status: OutputTargetStatus) -> OutputTarget {
        OutputTarget {
            id: Uuid::new_v4(),
            recording_id: Uuid::new_v4(),
            target_platform: Platform::HostingProviderA,
            status,
            failed: status == OutputTargetStatus::Failed,
            retry_count: 0,
            preset_id: Uuid::new_v4(),
            target_meta: None,
            uploaded_at: None,
            last_updated_at: Utc::now(),
        }
    }

    #[test]
    fn non_terminal_target_yields_no_derivation() {
        let targets = vec![target(OutputTargetStatus::Uploaded), target(OutputTargetStatus::Uploading)];
        assert!(derive_combined_upload_status(&targets).is_none());
    }

    #[test]
    fn all_uploaded_is_success() {
        let targets = vec![target(OutputTargetStatus::Uploaded), target(OutputTargetStatus::Uploaded)];
        let outcome = derive_combined_upload_status(&targets).unwrap();
        assert_eq!(outcome.status, super::super::recording::RecordingStatus::Uploaded);
        assert!(!outcome.failed);
    }

    #[test]
    fn mixed_outcome_is_partial_success() {
        let targets = vec![target(OutputTargetStatus::Uploaded), target(OutputTargetStatus::Failed)];
        let outcome = derive_combined_upload_status(&targets).unwrap();
        assert_eq!(outcome.status, super::super::recording::RecordingStatus::Uploaded);
        assert!(outcome.failed);
    }

    #[test]
    fn all_failed_rolls_back_to_transcribed() {
        let targets = vec![target(OutputTargetStatus::Failed), target(OutputTargetStatus::Failed)];
        let outcome = derive_combined_upload_status(&targets).unwrap();
        assert_eq!(
            outcome.status,
            super::super::recording::RecordingStatus::Transcribed
        );
        assert!(outcome.failed);
    }

    #[test]
    fn retry_budget_exhaustion_marks_failed() {
        let mut t = target(OutputTargetStatus::Uploading);
        t.record_attempt_failure();
        t.record_attempt_failure();
        assert_eq!(t.status, OutputTargetStatus::Uploading);
        t.record_attempt_failure();
        assert_eq!(t.status, OutputTargetStatus::Failed);
    }

    #[test]
    fn reopen_resets_to_not_uploaded() {
        let mut t = target(OutputTargetStatus::Uploaded);
        t.reopen();
        assert_eq!(t.status, OutputTargetStatus::NotUploaded);
        assert!(!t.failed);
    }
}
