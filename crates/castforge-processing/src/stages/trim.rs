//! Trim stage (spec §4.7): stream-copy trim of leading/trailing silence,
//! mono 16kHz audio extraction for transcription, and the no-op path when
//! the tenant/template has `enable_processing = false`.

use crate::media::{FfmpegRunner, SilenceDetectionSettings, SilenceSpan};
use castforge_core::error::AppError;
use castforge_storage::Storage;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct TrimResult {
    pub video_storage_path: String,
    pub audio_storage_path: String,
    pub silences: Vec<SilenceSpan>,
    pub start_s: i64,
    pub end_s: i64,
}

/// Computes the trim window by dropping leading/trailing silence beyond the
/// configured padding. Internal silence spans are reported but not cut —
/// they feed the ExtractTopics stage's break insertion instead.
fn compute_trim_window(silences: &[SilenceSpan], duration_s: i64, settings: SilenceDetectionSettings) -> (i64, i64) {
    let mut start = 0i64;
    let mut end = duration_s;

    if let Some(&(span_start, span_end)) = silences.first() {
        if span_start <= 1 {
            start = ((span_end as f64) - settings.padding_after_s).max(0.0) as i64;
        }
    }
    if let Some(&(span_start, span_end)) = silences.last() {
        if span_end >= duration_s - 1 {
            end = ((span_start as f64) + settings.padding_before_s).min(duration_s as f64) as i64;
        }
    }
    if end <= start {
        (0, duration_s)
    } else {
        (start, end)
    }
}

#[allow(clippy::too_many_arguments)]
#[tracing::instrument(skip(ffmpeg, storage))]
pub async fn run(
    ffmpeg: &FfmpegRunner,
    storage: &dyn Storage,
    source_local_path: &Path,
    source_ext: &str,
    duration_s: i64,
    enable_processing: bool,
    silence_settings: SilenceDetectionSettings,
    video_dest: &str,
    audio_dest: &str,
) -> Result<TrimResult, AppError> {
    let work_dir = tempfile::tempdir().map_err(|e| AppError::Internal(format!("failed to create temp dir: {e}")))?;
    let trimmed_video_path: PathBuf = work_dir.path().join(format!("trimmed.{source_ext}"));
    let audio_path: PathBuf = work_dir.path().join("audio.mp3");

    if !enable_processing {
        ffmpeg
            .copy_unmodified(source_local_path, &trimmed_video_path)
            .await
            .map_err(|e| AppError::Transient(e.to_string()))?;
        ffmpeg
            .extract_mono_audio(source_local_path, &audio_path)
            .await
            .map_err(|e| AppError::Transient(e.to_string()))?;

        return finish(storage, &trimmed_video_path, &audio_path, video_dest, audio_dest, Vec::new(), 0, duration_s).await;
    }

    let silences = ffmpeg
        .detect_silence(source_local_path, silence_settings)
        .await
        .map_err(|e| AppError::Transient(e.to_string()))?;

    let (start_s, end_s) = compute_trim_window(&silences, duration_s, silence_settings);

    ffmpeg
        .trim_stream_copy(source_local_path, &trimmed_video_path, start_s, end_s)
        .await
        .map_err(|e| AppError::Transient(e.to_string()))?;
    ffmpeg
        .extract_mono_audio(&trimmed_video_path, &audio_path)
        .await
        .map_err(|e| AppError::Transient(e.to_string()))?;

    finish(storage, &trimmed_video_path, &audio_path, video_dest, audio_dest, silences, start_s, end_s).await
}

#[allow(clippy::too_many_arguments)]
async fn finish(
    storage: &dyn Storage,
    video_local: &Path,
    audio_local: &Path,
    video_dest: &str,
    audio_dest: &str,
    silences: Vec<SilenceSpan>,
    start_s: i64,
    end_s: i64,
) -> Result<TrimResult, AppError> {
    let video_bytes = tokio::fs::read(video_local)
        .await
        .map_err(|e| AppError::Internal(format!("failed to read trimmed video: {e}")))?;
    let audio_bytes = tokio::fs::read(audio_local)
        .await
        .map_err(|e| AppError::Internal(format!("failed to read extracted audio: {e}")))?;

    storage
        .write(video_dest, video_bytes)
        .await
        .map_err(|e| AppError::Internal(format!("failed to persist trimmed video: {e}")))?;
    storage
        .write(audio_dest, audio_bytes)
        .await
        .map_err(|e| AppError::Internal(format!("failed to persist extracted audio: {e}")))?;

    Ok(TrimResult {
        video_storage_path: video_dest.to_string(),
        audio_storage_path: audio_dest.to_string(),
        silences,
        start_s,
        end_s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SilenceDetectionSettings {
        SilenceDetectionSettings {
            threshold_db: -30.0,
            min_silence_duration_s: 1.0,
            padding_before_s: 0.5,
            padding_after_s: 0.5,
        }
    }

    #[test]
    fn drops_leading_and_trailing_silence_only() {
        let silences = vec![(0, 10), (500, 520), (590, 600)];
        let (start, end) = compute_trim_window(&silences, 600, settings());
        assert_eq!(start, 9);
        assert_eq!(end, 590);
    }

    #[test]
    fn no_silence_leaves_full_duration() {
        let (start, end) = compute_trim_window(&[], 120, settings());
        assert_eq!((start, end), (0, 120));
    }
}
