//! Thin `ffmpeg`/`ffprobe` wrapper for the Trim stage (spec §4.7): stream-copy
//! trimming, mono 16kHz audio extraction, and silence detection. Shells out
//! the same way the teacher's `VideoProcessor` probes video — a validated,
//! canonicalized path handed to `tokio::process::Command`.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tokio::process::Command;

fn validate_path(path: &Path) -> Result<()> {
    let s = path.to_string_lossy();
    let dangerous = [';', '|', '&', '$', '`', '\n', '\r'];
    if s.chars().any(|c| dangerous.contains(&c)) {
        return Err(anyhow!("path contains dangerous characters: {}", s));
    }
    if s.contains("..") {
        return Err(anyhow!("path contains directory traversal: {}", s));
    }
    Ok(())
}

/// `(start_s, end_s)` silence span, as reported by `ffmpeg -af silencedetect`.
pub type SilenceSpan = (i64, i64);

#[derive(Debug, Clone)]
pub struct TrimOutcome {
    pub video_path: std::path::PathBuf,
    pub audio_path: std::path::PathBuf,
    pub silences: Vec<SilenceSpan>,
    pub trimmed_duration_seconds: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct SilenceDetectionSettings {
    pub threshold_db: f64,
    pub min_silence_duration_s: f64,
    pub padding_before_s: f64,
    pub padding_after_s: f64,
}

#[derive(Clone)]
pub struct FfmpegRunner {
    ffmpeg_path: String,
}

impl FfmpegRunner {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self { ffmpeg_path: ffmpeg_path.into() }
    }

    /// Detects leading/trailing/internal silence spans without re-encoding
    /// (spec §4.7 Trim: "silence detection drops leading/trailing/internal
    /// silence above the threshold").
    #[tracing::instrument(skip(self, settings), fields(ffmpeg.operation = "silencedetect"))]
    pub async fn detect_silence(&self, source: &Path, settings: SilenceDetectionSettings) -> Result<Vec<SilenceSpan>> {
        validate_path(source)?;

        let filter = format!(
            "silencedetect=noise={}dB:d={}",
            settings.threshold_db, settings.min_silence_duration_s
        );
        let output = Command::new(&self.ffmpeg_path)
            .args(["-i"])
            .arg(source)
            .args(["-af", &filter, "-f", "null", "-"])
            .output()
            .await
            .context("failed to execute ffmpeg silencedetect")?;

        parse_silence_spans(&String::from_utf8_lossy(&output.stderr))
    }

    /// Stream-copies `source` into a trimmed output spanning `[start_s,
    /// end_s)`, with no re-encode (`-c copy`), per spec §4.7.
    #[tracing::instrument(skip(self), fields(ffmpeg.operation = "trim"))]
    pub async fn trim_stream_copy(&self, source: &Path, dest: &Path, start_s: i64, end_s: i64) -> Result<()> {
        validate_path(source)?;
        validate_path(dest)?;

        let status = Command::new(&self.ffmpeg_path)
            .args(["-y", "-ss", &start_s.to_string(), "-to", &end_s.to_string(), "-i"])
            .arg(source)
            .args(["-c", "copy"])
            .arg(dest)
            .status()
            .await
            .context("failed to execute ffmpeg trim")?;

        if !status.success() {
            return Err(anyhow!("ffmpeg trim exited with status {status}"));
        }
        Ok(())
    }

    /// Extracts mono 16kHz audio for transcription (spec §4.7 Trim).
    #[tracing::instrument(skip(self), fields(ffmpeg.operation = "extract_audio"))]
    pub async fn extract_mono_audio(&self, source: &Path, dest: &Path) -> Result<()> {
        validate_path(source)?;
        validate_path(dest)?;

        let status = Command::new(&self.ffmpeg_path)
            .args(["-y", "-i"])
            .arg(source)
            .args(["-ac", "1", "-ar", "16000", "-vn"])
            .arg(dest)
            .status()
            .await
            .context("failed to execute ffmpeg audio extraction")?;

        if !status.success() {
            return Err(anyhow!("ffmpeg audio extraction exited with status {status}"));
        }
        Ok(())
    }

    /// Plain stream copy with no trimming — the `enable_processing=false`
    /// no-op path (spec §4.7 Trim).
    #[tracing::instrument(skip(self), fields(ffmpeg.operation = "copy"))]
    pub async fn copy_unmodified(&self, source: &Path, dest: &Path) -> Result<()> {
        validate_path(source)?;
        validate_path(dest)?;
        tokio::fs::copy(source, dest).await.context("failed to copy source file")?;
        Ok(())
    }
}

fn parse_silence_spans(stderr: &str) -> Result<Vec<SilenceSpan>> {
    let mut spans = Vec::new();
    let mut pending_start: Option<f64> = None;
    for line in stderr.lines() {
        if let Some(rest) = line.split("silence_start: ").nth(1) {
            pending_start = rest.trim().parse::<f64>().ok();
        } else if let Some(rest) = line.split("silence_end: ").nth(1) {
            let end = rest
                .split('|')
                .next()
                .unwrap_or("")
                .trim()
                .parse::<f64>()
                .ok();
            if let (Some(start), Some(end)) = (pending_start.take(), end) {
                spans.push((start as i64, end as i64));
            }
        }
    }
    Ok(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_silence_start_end_pairs() {
        let stderr = "[silencedetect @ 0x0] silence_start: 10.5\n\
                       [silencedetect @ 0x0] silence_end: 15.2 | silence_duration: 4.7\n\
                       [silencedetect @ 0x0] silence_start: 100\n\
                       [silencedetect @ 0x0] silence_end: 120 | silence_duration: 20";
        let spans = parse_silence_spans(stderr).unwrap();
        assert_eq!(spans, vec![(10, 15), (100, 120)]);
    }

    #[test]
    fn rejects_path_traversal() {
        let path = Path::new("../escape.mp4");
        assert!(validate_path(path).is_err());
    }
}
