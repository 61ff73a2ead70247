use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Main-pipeline status. There is deliberately no `Failed` variant: failure
/// is expressed as a rollback to the prior completed status plus `failed =
/// true` (spec §4.5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "recording_status", rename_all = "snake_case")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordingStatus {
    Initialized,
    Downloading,
    Downloaded,
    Processing,
    Processed,
    Transcribing,
    Transcribed,
    Uploading,
    Uploaded,
    Skipped,
    Expired,
}

impl fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordingStatus::Initialized => "INITIALIZED",
            RecordingStatus::Downloading => "DOWNLOADING",
            RecordingStatus::Downloaded => "DOWNLOADED",
            RecordingStatus::Processing => "PROCESSING",
            RecordingStatus::Processed => "PROCESSED",
            RecordingStatus::Transcribing => "TRANSCRIBING",
            RecordingStatus::Transcribed => "TRANSCRIBED",
            RecordingStatus::Uploading => "UPLOADING",
            RecordingStatus::Uploaded => "UPLOADED",
            RecordingStatus::Skipped => "SKIPPED",
            RecordingStatus::Expired => "EXPIRED",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for RecordingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INITIALIZED" => Ok(RecordingStatus::Initialized),
            "DOWNLOADING" => Ok(RecordingStatus::Downloading),
            "DOWNLOADED" => Ok(RecordingStatus::Downloaded),
            "PROCESSING" => Ok(RecordingStatus::Processing),
            "PROCESSED" => Ok(RecordingStatus::Processed),
            "TRANSCRIBING" => Ok(RecordingStatus::Transcribing),
            "TRANSCRIBED" => Ok(RecordingStatus::Transcribed),
            "UPLOADING" => Ok(RecordingStatus::Uploading),
            "UPLOADED" => Ok(RecordingStatus::Uploaded),
            "SKIPPED" => Ok(RecordingStatus::Skipped),
            "EXPIRED" => Ok(RecordingStatus::Expired),
            other => Err(format!("unknown recording status: {}", other)),
        }
    }
}

/// The stage a recording was mid-execution of when it failed or was
/// cancelled (spec §4.5/§4.7). Doubles as the resumption point for `Retry`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "pipeline_stage", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Downloading,
    Processing,
    Transcribing,
    Uploading,
}

impl PipelineStage {
    /// The status a recording rolls back to when it fails mid-stage (spec §4.5 table).
    pub fn rollback_status(&self) -> RecordingStatus {
        match self {
            PipelineStage::Downloading => RecordingStatus::Initialized,
            PipelineStage::Processing => RecordingStatus::Downloaded,
            PipelineStage::Transcribing => RecordingStatus::Processed,
            PipelineStage::Uploading => RecordingStatus::Transcribed,
        }
    }

    /// The status a recording was in before this stage was attempted — the
    /// resumption point `Retry` restores the executor to.
    pub fn resumes_from(&self) -> RecordingStatus {
        self.rollback_status()
    }
}

/// Maximum number of retries before a recording requires an explicit
/// override (admin/user action that resets `retry_count`), spec §4.5.
pub const MAX_RETRY_COUNT: i32 = 2;

/// The central pipeline entity (spec §3 `Recording`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Recording {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub source_id: Uuid,
    pub template_id: Option<Uuid>,
    pub is_mapped: bool,
    pub display_name: String,
    pub start_time: DateTime<Utc>,
    pub duration_seconds: i64,
    pub size_bytes: i64,
    pub status: RecordingStatus,
    pub failed: bool,
    pub failed_at_stage: Option<PipelineStage>,
    pub failed_reason: Option<String>,
    pub failed_at: Option<DateTime<Utc>>,
    pub retry_count: i32,
    pub blank_record: bool,

    pub source_file_path: Option<String>,
    pub processed_video_path: Option<String>,
    pub processed_audio_path: Option<String>,
    pub transcription_dir_path: Option<String>,

    pub transcription_info: Option<JsonValue>,
    pub topics: Option<JsonValue>,
    pub active_topics_version: Option<i32>,

    /// Frozen effective config, captured when the pipeline first advances
    /// past `INITIALIZED` (spec §4.3). Immutable for the life of the run.
    pub effective_config_snapshot: Option<JsonValue>,
    /// Per-recording override: only the differences from the bound template (spec §4.3).
    pub config_override: Option<JsonValue>,

    pub expire_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Blank-record thresholds (spec §3, §4.7): below either bound the recording
/// is auto-skipped and never enters the pipeline.
pub const BLANK_RECORD_MIN_DURATION_SECONDS: i64 = 20 * 60;
pub const BLANK_RECORD_MIN_SIZE_BYTES: i64 = 25 * 1024 * 1024;

impl Recording {
    pub fn is_blank(duration_seconds: i64, size_bytes: i64) -> bool {
        duration_seconds < BLANK_RECORD_MIN_DURATION_SECONDS || size_bytes < BLANK_RECORD_MIN_SIZE_BYTES
    }

    /// Whether `Retry(recording)` is legal right now (spec §4.5 pre-conditions).
    pub fn can_retry(&self) -> bool {
        self.failed && self.retry_count < MAX_RETRY_COUNT && self.failed_at_stage.is_some()
    }

    /// Whether a fresh pipeline invocation may start from this recording's
    /// current status (i.e. it isn't mid-failure, skipped, or expired).
    pub fn is_ready_to_run(&self) -> bool {
        !self.failed
            && !matches!(
                self.status,
                RecordingStatus::Skipped | RecordingStatus::Expired | RecordingStatus::Uploaded
            )
    }

    /// Apply the rollback-plus-flag failure model for a stage that threw (spec §4.5).
    pub fn apply_stage_failure(&mut self, stage: PipelineStage, reason: impl Into<String>, now: DateTime<Utc>) {
        self.status = stage.rollback_status();
        self.failed = true;
        self.failed_at_stage = Some(stage);
        self.failed_reason = Some(reason.into());
        self.failed_at = Some(now);
    }

    /// Apply a successful `Retry` trigger: restore to the failed stage,
    /// clear the flag, bump `retry_count`. Does not run the stage itself.
    pub fn begin_retry(&mut self) -> Result<(), String> {
        if !self.can_retry() {
            return Err("recording is not retryable".to_string());
        }
        self.failed = false;
        self.failed_reason = None;
        self.failed_at = None;
        self.retry_count += 1;
        Ok(())
    }

    /// Admin/user override that resets the retry budget after exhaustion (spec §4.5).
    pub fn reset_retry_budget(&mut self) {
        self.retry_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample() -> Recording {
        Recording {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            source_id: Uuid::new_v4(),
            template_id: None,
            is_mapped: false,
            display_name: "Weekly sync".to_string(),
            start_time: Utc::now() - Duration::hours(1),
            duration_seconds: 3600,
            size_bytes: 500_000_000,
            status: RecordingStatus::Downloaded,
            failed: false,
            failed_at_stage: None,
            failed_reason: None,
            failed_at: None,
            retry_count: 0,
            blank_record: false,
            source_file_path: None,
            processed_video_path: None,
            processed_audio_path: None,
            transcription_dir_path: None,
            transcription_info: None,
            topics: None,
            active_topics_version: None,
            effective_config_snapshot: None,
            config_override: None,
            expire_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn blank_record_thresholds() {
        assert!(Recording::is_blank(10 * 60, 100_000_000));
        assert!(Recording::is_blank(30 * 60, 10_000_000));
        assert!(!Recording::is_blank(30 * 60, 100_000_000));
    }

    #[test]
    fn stage_failure_rolls_back_and_flags() {
        let mut rec = sample();
        rec.status = RecordingStatus::Processing;
        let now = Utc::now();
        rec.apply_stage_failure(PipelineStage::Processing, "ffmpeg crashed", now);
        assert_eq!(rec.status, RecordingStatus::Downloaded);
        assert!(rec.failed);
        assert_eq!(rec.failed_at_stage, Some(PipelineStage::Processing));
        assert_eq!(rec.retry_count, 0);
    }

    #[test]
    fn retry_count_is_bumped_only_by_retry_trigger() {
        let mut rec = sample();
        rec.apply_stage_failure(PipelineStage::Downloading, "timeout", Utc::now());
        assert_eq!(rec.retry_count, 0);
        rec.begin_retry().unwrap();
        assert_eq!(rec.retry_count, 1);
        assert!(!rec.failed);
    }

    #[test]
    fn retry_fails_after_budget_exhausted() {
        let mut rec = sample();
        rec.apply_stage_failure(PipelineStage::Downloading, "e1", Utc::now());
        rec.begin_retry().unwrap();
        rec.apply_stage_failure(PipelineStage::Downloading, "e2", Utc::now());
        rec.begin_retry().unwrap();
        assert_eq!(rec.retry_count, MAX_RETRY_COUNT);
        rec.apply_stage_failure(PipelineStage::Downloading, "e3", Utc::now());
        assert!(!rec.can_retry());
    }

    #[test]
    fn status_display_round_trips() {
        for s in [
            RecordingStatus::Initialized,
            RecordingStatus::Uploaded,
            RecordingStatus::Skipped,
        ] {
            let rendered = s.to_string();
            assert_eq!(RecordingStatus::from_str(&rendered).unwrap(), s);
        }
    }
}
