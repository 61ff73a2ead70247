//! Pipeline Executor (spec §4.7): drives one recording through
//! Download → Trim → Transcribe → ExtractTopics → GenerateSubtitles →
//! Upload, resuming from `recording.status` (or `failed_at_stage` after a
//! `Retry`), gated by the Quota Service and the per-tenant/per-recording
//! concurrency bounds in `castforge_core::constants`.
//!
//! Mirrors the teacher's `TaskQueue` worker loop (`mindia-worker/src/queue.rs`):
//! one permitted unit of work in flight per resource, advisory locking so
//! the same item is never processed twice concurrently, and an explicit
//! commit/release on every exit path instead of relying on drop order.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use castforge_adapters::registry::AdapterRegistry;
use castforge_adapters::sink::UploadMetadata;
use castforge_adapters::source::FetchProgress;
use castforge_core::config::Config;
use castforge_core::constants::{MAX_CONCURRENT_TRANSCRIPTIONS_PER_TENANT, MAX_CONCURRENT_UPLOADS_PER_RECORDING};
use castforge_core::error::AppError;
use castforge_core::models::credential::Platform;
use castforge_core::models::output_target::OutputTarget;
use castforge_core::models::recording::{PipelineStage, Recording, RecordingStatus};
use castforge_core::models::tenant::TenantLimits;
use castforge_db::{OutputPresetRepository, OutputTargetRepository, RecordingRepository, SourceRepository, TenantRepository};
use castforge_services::config_resolver::ConfigResolver;
use castforge_services::credential_vault::CredentialVault;
use castforge_services::quota_service::{QuotaService, ReservationGuard};
use castforge_services::storage_path_builder::StoragePathBuilder;
use castforge_storage::Storage;
use chrono::Utc;
use serde_json::Value as JsonValue;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::fsm::RecordingFsm;
use crate::media::{FfmpegRunner, SilenceDetectionSettings};
use crate::output_fsm::OutputTargetFsm;
use crate::stages::{self, download, extract_topics, generate_subtitles, transcribe, trim, upload};
use crate::template_vars::{TemplateContext, Topic, TopicsDisplayFormat};
use crate::topics::TopicMode;

const DEFAULT_SOURCE_EXT: &str = "mp4";
const ACCOUNT_KEY_DEFAULT: &str = "default";

fn no_progress() -> FetchProgress {
    Arc::new(|_, _| {})
}

/// Releases a recording's advisory lock when the run completes, however it
/// completes. The lock set itself is a plain `std::sync::Mutex` since
/// membership never needs to be held across an `.await`.
struct RunGuard {
    recording_id: Uuid,
    running: Arc<StdMutex<HashSet<Uuid>>>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.lock().unwrap().remove(&self.recording_id);
    }
}

/// Everything the Pipeline Executor needs, wired once at startup and shared
/// across every `run()` invocation.
#[derive(Clone)]
pub struct PipelineExecutor {
    recordings: RecordingRepository,
    sources: SourceRepository,
    tenants: TenantRepository,
    output_targets: OutputTargetRepository,
    output_presets: OutputPresetRepository,
    fsm: RecordingFsm,
    output_fsm: OutputTargetFsm,
    config_resolver: ConfigResolver,
    credential_vault: Arc<CredentialVault>,
    quota: QuotaService,
    adapters: AdapterRegistry,
    storage: Arc<dyn Storage>,
    ffmpeg: FfmpegRunner,
    config: Arc<Config>,
    transcription_semaphores: Arc<tokio::sync::Mutex<HashMap<Uuid, Arc<Semaphore>>>>,
    running: Arc<StdMutex<HashSet<Uuid>>>,
}

impl PipelineExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        recordings: RecordingRepository,
        sources: SourceRepository,
        tenants: TenantRepository,
        output_targets: OutputTargetRepository,
        output_presets: OutputPresetRepository,
        fsm: RecordingFsm,
        output_fsm: OutputTargetFsm,
        config_resolver: ConfigResolver,
        credential_vault: Arc<CredentialVault>,
        quota: QuotaService,
        adapters: AdapterRegistry,
        storage: Arc<dyn Storage>,
        ffmpeg: FfmpegRunner,
        config: Arc<Config>,
    ) -> Self {
        Self {
            recordings,
            sources,
            tenants,
            output_targets,
            output_presets,
            fsm,
            output_fsm,
            config_resolver,
            credential_vault,
            quota,
            adapters,
            storage,
            ffmpeg,
            config,
            transcription_semaphores: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
            running: Arc::new(StdMutex::new(HashSet::new())),
        }
    }

    async fn transcription_permit(&self, tenant_id: Uuid) -> Arc<Semaphore> {
        let mut map = self.transcription_semaphores.lock().await;
        map.entry(tenant_id)
            .or_insert_with(|| Arc::new(Semaphore::new(MAX_CONCURRENT_TRANSCRIPTIONS_PER_TENANT)))
            .clone()
    }

    /// Runs `recording_id` from its current status through to `UPLOADED`
    /// (or the furthest it can get before hitting a permanent failure).
    /// Returns `AlreadyRunning` if another invocation holds the recording's
    /// advisory lock.
    #[tracing::instrument(skip(self, limits, cancel))]
    pub async fn run(
        &self,
        tenant_id: Uuid,
        recording_id: Uuid,
        limits: &TenantLimits,
        cancel: CancellationToken,
    ) -> Result<Recording, AppError> {
        {
            let mut running = self.running.lock().unwrap();
            if !running.insert(recording_id) {
                return Err(AppError::AlreadyRunning(format!("recording {recording_id} is already running")));
            }
        }
        let _run_guard = RunGuard {
            recording_id,
            running: self.running.clone(),
        };

        let recording = self.recordings.get(tenant_id, recording_id).await?;
        if recording.status == RecordingStatus::Uploaded {
            return Ok(recording);
        }
        if !recording.is_ready_to_run() {
            return Err(AppError::Conflict(format!(
                "recording {recording_id} is not runnable in status {} (failed={})",
                recording.status, recording.failed
            )));
        }

        let reservation = self.quota.reserve(tenant_id, limits).await?;
        let mut guard = ReservationGuard::new(reservation);

        match self.drive(tenant_id, recording_id, &cancel).await {
            Ok(final_recording) => {
                guard.mark_resolved();
                self.quota.commit(guard.handle.clone()).await?;
                Ok(final_recording)
            }
            Err(err) => {
                guard.mark_resolved();
                self.quota.release(guard.handle.clone()).await.ok();
                Err(err)
            }
        }
    }

    /// Advances the recording one stage at a time until it reaches a
    /// terminal status or a stage fails. Each stage re-fetches the current
    /// recording so resumption from `failed_at_stage` after a `Retry` just
    /// falls out of the same loop.
    async fn drive(&self, tenant_id: Uuid, recording_id: Uuid, cancel: &CancellationToken) -> Result<Recording, AppError> {
        self.config_resolver.snapshot_if_absent(tenant_id, recording_id).await?;

        loop {
            if cancel.is_cancelled() {
                return Err(AppError::Cancelled(format!("run cancelled for recording {recording_id}")));
            }

            let recording = self.recordings.get(tenant_id, recording_id).await?;
            match recording.status {
                RecordingStatus::Initialized => {
                    self.stage_download(tenant_id, &recording, cancel).await?;
                }
                RecordingStatus::Downloaded => {
                    self.stage_trim(tenant_id, &recording).await?;
                }
                RecordingStatus::Processed => {
                    self.stage_transcribe(tenant_id, &recording).await?;
                }
                RecordingStatus::Transcribed => {
                    self.stage_upload(tenant_id, &recording, cancel).await?;
                }
                RecordingStatus::Uploaded => return Ok(recording),
                other => {
                    return Err(AppError::Conflict(format!(
                        "recording {recording_id} is in status {other} with no pipeline stage to advance"
                    )));
                }
            }
        }
    }

    fn effective_config(&self, recording: &Recording) -> JsonValue {
        recording.effective_config_snapshot.clone().unwrap_or_else(|| JsonValue::Object(Default::default()))
    }

    async fn materialize_local(&self, storage_path: &str) -> Result<(tempfile::TempDir, PathBuf), AppError> {
        let bytes = self
            .storage
            .read(storage_path)
            .await
            .map_err(|e| AppError::Internal(format!("failed to read {storage_path} from storage: {e}")))?;
        let dir = tempfile::tempdir().map_err(|e| AppError::Internal(format!("failed to create temp dir: {e}")))?;
        let ext = Path::new(storage_path).extension().and_then(|e| e.to_str()).unwrap_or("bin");
        let local_path = dir.path().join(format!("material.{ext}"));
        tokio::fs::write(&local_path, bytes)
            .await
            .map_err(|e| AppError::Internal(format!("failed to materialize {storage_path} locally: {e}")))?;
        Ok((dir, local_path))
    }

    #[tracing::instrument(skip(self, recording, cancel))]
    async fn stage_download(&self, tenant_id: Uuid, recording: &Recording, cancel: &CancellationToken) -> Result<(), AppError> {
        let source = self.sources.get(tenant_id, recording.source_id).await?;
        let adapter = self
            .adapters
            .source(source.source_type.adapter_id())
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let credential_payload = match source.credential_id {
            Some(id) => serde_json::to_value(self.credential_vault.get(tenant_id, id).await?)?,
            None => JsonValue::Object(Default::default()),
        };

        let dest_path = StoragePathBuilder::source_file(tenant_id, recording.id, DEFAULT_SOURCE_EXT);
        let handle = self
            .fsm
            .begin_stage(tenant_id, recording.id, PipelineStage::Downloading, RecordingStatus::Downloading)
            .await?;

        let outcome = stages::with_stage_retries("download", |_attempt| {
            let adapter = adapter.clone();
            let credential_payload = credential_payload.clone();
            let dest_path = dest_path.clone();
            let cancel = cancel.clone();
            async move {
                download::run(
                    self.storage.as_ref(),
                    adapter,
                    &credential_payload,
                    &recording.source_file_path.clone().unwrap_or_default(),
                    &dest_path,
                    Some(recording.size_bytes as u64),
                    no_progress(),
                    cancel,
                )
                .await
            }
        })
        .await;

        match outcome {
            Ok(result) => {
                self.recordings
                    .set_artifact_path(tenant_id, recording.id, castforge_db::db::domain::recording::ArtifactField::SourceFilePath, &result.storage_path)
                    .await?;
                self.fsm.complete_stage(tenant_id, recording.id, handle, RecordingStatus::Downloaded).await?;
                Ok(())
            }
            Err(err) => {
                self.fsm.fail_stage(tenant_id, recording.id, handle, err.to_string()).await?;
                Err(err)
            }
        }
    }

    #[tracing::instrument(skip(self, recording))]
    async fn stage_trim(&self, tenant_id: Uuid, recording: &Recording) -> Result<(), AppError> {
        let config = self.effective_config(recording);
        let enable_processing = config
            .pointer("/processing/enable_processing")
            .and_then(JsonValue::as_bool)
            .unwrap_or(true);
        let silence_settings = SilenceDetectionSettings {
            threshold_db: config.pointer("/processing/silence_threshold_db").and_then(JsonValue::as_f64).unwrap_or(-30.0),
            min_silence_duration_s: config.pointer("/processing/min_silence_duration_s").and_then(JsonValue::as_f64).unwrap_or(1.0),
            padding_before_s: config.pointer("/processing/padding_before_s").and_then(JsonValue::as_f64).unwrap_or(0.5),
            padding_after_s: config.pointer("/processing/padding_after_s").and_then(JsonValue::as_f64).unwrap_or(0.5),
        };

        let source_path = recording
            .source_file_path
            .clone()
            .ok_or_else(|| AppError::Internal("recording has no source_file_path at trim stage".into()))?;
        let (_work_dir, local_source) = self.materialize_local(&source_path).await?;

        let video_dest = StoragePathBuilder::trimmed_video(tenant_id, recording.id, DEFAULT_SOURCE_EXT);
        let audio_dest = StoragePathBuilder::extracted_audio(tenant_id, recording.id);

        let handle = self
            .fsm
            .begin_stage(tenant_id, recording.id, PipelineStage::Processing, RecordingStatus::Processing)
            .await?;

        let result = trim::run(
            &self.ffmpeg,
            self.storage.as_ref(),
            &local_source,
            DEFAULT_SOURCE_EXT,
            recording.duration_seconds,
            enable_processing,
            silence_settings,
            &video_dest,
            &audio_dest,
        )
        .await;

        match result {
            Ok(outcome) => {
                self.recordings
                    .set_artifact_path(
                        tenant_id,
                        recording.id,
                        castforge_db::db::domain::recording::ArtifactField::ProcessedVideoPath,
                        &outcome.video_storage_path,
                    )
                    .await?;
                self.recordings
                    .set_artifact_path(
                        tenant_id,
                        recording.id,
                        castforge_db::db::domain::recording::ArtifactField::ProcessedAudioPath,
                        &outcome.audio_storage_path,
                    )
                    .await?;
                self.fsm.complete_stage(tenant_id, recording.id, handle, RecordingStatus::Processed).await?;
                Ok(())
            }
            Err(err) => {
                self.fsm.fail_stage(tenant_id, recording.id, handle, err.to_string()).await?;
                Err(err)
            }
        }
    }

    /// Covers Transcribe, ExtractTopics, and GenerateSubtitles — the three
    /// sub-steps the Recording FSM folds into one `PipelineStage::Transcribing`
    /// span (spec §4.7: no intermediate `RecordingStatus` between them).
    #[tracing::instrument(skip(self, recording))]
    async fn stage_transcribe(&self, tenant_id: Uuid, recording: &Recording) -> Result<(), AppError> {
        let config = self.effective_config(recording);
        let topic_mode = config
            .pointer("/topics/mode")
            .and_then(JsonValue::as_str)
            .map(TopicMode::parse)
            .unwrap_or(TopicMode::Short);

        let audio_path = recording
            .processed_audio_path
            .clone()
            .ok_or_else(|| AppError::Internal("recording has no processed_audio_path at transcribe stage".into()))?;
        let video_path = recording
            .processed_video_path
            .clone()
            .ok_or_else(|| AppError::Internal("recording has no processed_video_path at transcribe stage".into()))?;

        let handle = self
            .fsm
            .begin_stage(tenant_id, recording.id, PipelineStage::Transcribing, RecordingStatus::Transcribing)
            .await?;

        let result = self.run_transcription_pipeline(tenant_id, recording, &config, topic_mode, &audio_path, &video_path).await;

        match result {
            Ok(()) => {
                self.fsm.complete_stage(tenant_id, recording.id, handle, RecordingStatus::Transcribed).await?;
                Ok(())
            }
            Err(err) => {
                self.fsm.fail_stage(tenant_id, recording.id, handle, err.to_string()).await?;
                Err(err)
            }
        }
    }

    async fn run_transcription_pipeline(
        &self,
        tenant_id: Uuid,
        recording: &Recording,
        config: &JsonValue,
        topic_mode: TopicMode,
        audio_path: &str,
        video_path: &str,
    ) -> Result<(), AppError> {
        let permit_pool = self.transcription_permit(tenant_id).await;
        let _permit = permit_pool
            .acquire_owned()
            .await
            .map_err(|_| AppError::Internal("transcription semaphore closed".into()))?;

        let (_audio_dir, local_audio) = self.materialize_local(audio_path).await?;
        let transcription_adapter = self
            .adapters
            .transcriber(Platform::SpeechService.adapter_id())
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let speech_credential = serde_json::to_value(
            self.credential_vault
                .get_by_platform(tenant_id, Platform::SpeechService, ACCOUNT_KEY_DEFAULT)
                .await?,
        )?;

        let transcript = stages::with_stage_retries("transcribe", |_attempt| {
            let adapter = transcription_adapter.clone();
            let credential = speech_credential.clone();
            let local_audio = local_audio.clone();
            async move { transcribe::run(adapter, &credential, &local_audio).await }
        })
        .await?;

        self.recordings
            .set_transcription_info(tenant_id, recording.id, serde_json::to_value(&transcript)?)
            .await?;

        let (_video_dir, local_video) = self.materialize_local(video_path).await?;
        let silences = self
            .ffmpeg
            .detect_silence(
                &local_video,
                SilenceDetectionSettings {
                    threshold_db: config.pointer("/processing/silence_threshold_db").and_then(JsonValue::as_f64).unwrap_or(-30.0),
                    min_silence_duration_s: config.pointer("/processing/min_silence_duration_s").and_then(JsonValue::as_f64).unwrap_or(1.0),
                    padding_before_s: 0.0,
                    padding_after_s: 0.0,
                },
            )
            .await
            .map_err(|e| AppError::Transient(e.to_string()))?;

        let topic_adapter = self
            .adapters
            .topic_extractor(Platform::TopicService.adapter_id())
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let topic_credential = serde_json::to_value(
            self.credential_vault
                .get_by_platform(tenant_id, Platform::TopicService, ACCOUNT_KEY_DEFAULT)
                .await?,
        )?;

        let topics: Vec<Topic> = stages::with_stage_retries("extract_topics", |_attempt| {
            let adapter = topic_adapter.clone();
            let credential = topic_credential.clone();
            let transcript = transcript.clone();
            let silences = silences.clone();
            async move {
                extract_topics::run(adapter, &credential, &transcript, recording.duration_seconds, topic_mode, &silences).await
            }
        })
        .await?;

        let version = recording.active_topics_version.unwrap_or(0) + 1;
        let topics_path = StoragePathBuilder::topics_version(tenant_id, recording.id, version);
        let topics_bytes = serde_json::to_vec(&topics)?;
        self.storage
            .write(&topics_path, topics_bytes)
            .await
            .map_err(|e| AppError::Internal(format!("failed to persist topics: {e}")))?;
        self.recordings
            .set_topics(tenant_id, recording.id, serde_json::to_value(&topics)?, version)
            .await?;

        let formats: Vec<String> = config
            .pointer("/subtitles/formats")
            .and_then(JsonValue::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        for format_name in formats {
            let Some(format) = generate_subtitles::SubtitleFormat::parse(&format_name) else {
                tracing::warn!(format = %format_name, "unknown subtitle format in config, skipping");
                continue;
            };
            let rendered = generate_subtitles::render(&transcript, format);
            let subtitle_path = StoragePathBuilder::subtitles(tenant_id, recording.id, format.extension());
            self.storage
                .write(&subtitle_path, rendered.into_bytes())
                .await
                .map_err(|e| AppError::Internal(format!("failed to persist subtitles: {e}")))?;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, recording, cancel))]
    async fn stage_upload(&self, tenant_id: Uuid, recording: &Recording, cancel: &CancellationToken) -> Result<(), AppError> {
        if recording.status == RecordingStatus::Transcribed {
            self.fsm
                .begin_stage(tenant_id, recording.id, PipelineStage::Uploading, RecordingStatus::Uploading)
                .await?;
        }

        let targets = self.output_targets.list_by_recording(recording.id).await?;
        let pending: Vec<OutputTarget> = targets
            .into_iter()
            .filter(|t| !t.is_terminal())
            .collect();

        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_UPLOADS_PER_RECORDING));
        let mut tasks = tokio::task::JoinSet::new();

        for target in pending {
            let permit = semaphore.clone().acquire_owned().await.map_err(|_| AppError::Internal("upload semaphore closed".into()))?;
            let this = self.clone();
            let recording = recording.clone();
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let _permit = permit;
                this.upload_one_target(tenant_id, &recording, target).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(join_err) = joined {
                tracing::error!(error = %join_err, "upload task panicked");
            }
        }

        self.output_fsm.settle_recording(tenant_id, recording.id).await?;
        Ok(())
    }

    async fn upload_one_target(&self, tenant_id: Uuid, recording: &Recording, target: OutputTarget) -> Result<(), AppError> {
        let outcome = self.try_upload_target(tenant_id, recording, &target).await;
        match outcome {
            Ok(external) => {
                self.output_fsm
                    .record_success(target.id, serde_json::json!({"external_ref": external.external_ref, "external_url": external.external_url}))
                    .await?;
            }
            Err(err) => {
                tracing::warn!(target_id = %target.id, platform = ?target.target_platform, error = %err, "output target upload failed");
                self.output_fsm.record_failure(&target).await?;
            }
        }
        Ok(())
    }

    async fn try_upload_target(
        &self,
        tenant_id: Uuid,
        recording: &Recording,
        target: &OutputTarget,
    ) -> Result<castforge_adapters::sink::UploadOutcome, AppError> {
        self.output_fsm.begin_upload(target.id).await?;

        let preset = self.output_presets.get(tenant_id, target.preset_id).await?;
        let sink = self
            .adapters
            .sink(target.target_platform.adapter_id())
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let credential_payload = serde_json::to_value(self.credential_vault.get(tenant_id, preset.credential_id).await?)?;

        let video_path = recording
            .processed_video_path
            .clone()
            .ok_or_else(|| AppError::Internal("recording has no processed_video_path at upload stage".into()))?;
        let (_dir, local_video) = self.materialize_local(&video_path).await?;

        let source = self.sources.get(tenant_id, recording.source_id).await?;
        let tenant = self.tenants.get(tenant_id).await?;
        let metadata = self.render_upload_metadata(recording, &source, &tenant, &preset.default_metadata);
        let cancel = CancellationToken::new();

        stages::with_stage_retries("upload", |_attempt| {
            let sink = sink.clone();
            let credential_payload = credential_payload.clone();
            let local_video = local_video.clone();
            let metadata = metadata.clone();
            let cancel = cancel.clone();
            async move { upload::run(sink, &credential_payload, &local_video, &metadata, no_progress(), cancel).await }
        })
        .await
    }

    fn render_upload_metadata(
        &self,
        recording: &Recording,
        source: &castforge_core::models::source::Source,
        tenant: &castforge_core::models::tenant::Tenant,
        default_metadata: &JsonValue,
    ) -> UploadMetadata {
        let config = self.effective_config(recording);
        let title_template = config.pointer("/metadata/title_template").and_then(JsonValue::as_str).unwrap_or("{display_name}");
        let description_template = config.pointer("/metadata/description_template").and_then(JsonValue::as_str).unwrap_or("");
        let locale_is_ru = config.pointer("/metadata/locale").and_then(JsonValue::as_str) == Some("ru");
        let topics_display_format = config
            .pointer("/metadata/topics_display_format")
            .and_then(JsonValue::as_str)
            .and_then(TopicsDisplayFormat::parse)
            .unwrap_or(TopicsDisplayFormat::BulletList);
        let topics_include_timestamps = config.pointer("/metadata/topics_include_timestamps").and_then(JsonValue::as_bool).unwrap_or(false);
        let themes_max_count = config
            .pointer("/metadata/themes_max_count")
            .and_then(JsonValue::as_u64)
            .map(|v| v as usize)
            .unwrap_or(castforge_core::constants::THEMES_DEFAULT_MAX_COUNT);

        let topics: Vec<Topic> = recording
            .topics
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();

        let tags: Vec<String> = default_metadata
            .get("tags")
            .and_then(JsonValue::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        let extra = default_metadata.get("extra").cloned().unwrap_or_else(|| JsonValue::Object(Default::default()));

        let ctx = TemplateContext {
            display_name: recording.display_name.clone(),
            source_name: source.name.clone(),
            duration_seconds: recording.duration_seconds,
            start_time: recording.start_time,
            publish_time: Utc::now(),
            timezone: tenant.tz(),
            locale_is_ru,
            topics,
            topics_display_format,
            topics_include_timestamps,
            themes_max_count,
        };

        upload::render_metadata(title_template, description_template, tags, extra, &ctx)
    }
}
