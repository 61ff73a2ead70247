//! In-memory adapter stand-ins for exercising the pipeline without real
//! external providers — mirrors the teacher's `MockPlugin` test fixture.

use anyhow::Result;
use async_trait::async_trait;
use castforge_core::models::source::RecordingCandidate;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Mutex;

use crate::sink::{SinkAdapter, SinkCapabilities, UploadMetadata, UploadOutcome};
use crate::source::{FetchOutcome, FetchProgress, SourceAdapter};
use crate::transcription::{ExtractedTopic, Transcript, TranscriptSegment, TopicAdapter, TranscriptionAdapter};

#[derive(Debug)]
pub struct MockSourceAdapter {
    id: String,
    pub candidates: Mutex<Vec<RecordingCandidate>>,
}

impl MockSourceAdapter {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            candidates: Mutex::new(Vec::new()),
        }
    }

    pub fn with_candidates(id: impl Into<String>, candidates: Vec<RecordingCandidate>) -> Self {
        Self {
            id: id.into(),
            candidates: Mutex::new(candidates),
        }
    }
}

#[async_trait]
impl SourceAdapter for MockSourceAdapter {
    fn platform_id(&self) -> &str {
        &self.id
    }

    async fn list(
        &self,
        _credential_payload: &serde_json::Value,
        _source_settings: &serde_json::Value,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> Result<Vec<RecordingCandidate>> {
        Ok(self.candidates.lock().unwrap().clone())
    }

    async fn fetch(
        &self,
        _credential_payload: &serde_json::Value,
        _source_key: &str,
        dest_path: &Path,
        progress: FetchProgress,
        _cancel: tokio_util::sync::CancellationToken,
    ) -> Result<FetchOutcome> {
        let payload = b"mock media bytes";
        tokio::fs::write(dest_path, payload).await?;
        progress(payload.len() as u64, Some(payload.len() as u64));
        Ok(FetchOutcome {
            size_bytes: payload.len() as u64,
            content_type: Some("video/mp4".to_string()),
        })
    }
}

#[derive(Debug)]
pub struct MockSinkAdapter {
    id: String,
    pub fail_next: Mutex<bool>,
}

impl MockSinkAdapter {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fail_next: Mutex::new(false),
        }
    }
}

#[async_trait]
impl SinkAdapter for MockSinkAdapter {
    fn platform_id(&self) -> &str {
        &self.id
    }

    fn capabilities(&self) -> SinkCapabilities {
        SinkCapabilities {
            supports_metadata_update: true,
            supports_resumable_upload: false,
        }
    }

    async fn upload(
        &self,
        _credential_payload: &serde_json::Value,
        _media_path: &Path,
        metadata: &UploadMetadata,
        progress: FetchProgress,
        _cancel: tokio_util::sync::CancellationToken,
    ) -> Result<UploadOutcome> {
        if *self.fail_next.lock().unwrap() {
            anyhow::bail!("mock upload failure");
        }
        progress(100, Some(100));
        Ok(UploadOutcome {
            external_ref: format!("mock:{}", metadata.title),
            external_url: Some(format!("https://example.invalid/{}", metadata.title)),
        })
    }

    async fn update_metadata(
        &self,
        _credential_payload: &serde_json::Value,
        _external_ref: &str,
        _metadata: &UploadMetadata,
    ) -> Result<()> {
        Ok(())
    }
}

/// Fixed transcript stand-in so pipeline tests don't depend on a real
/// speech API; mirrors the teacher's `MockPlugin` test fixture.
#[derive(Debug)]
pub struct MockTranscriptionAdapter {
    id: String,
}

impl MockTranscriptionAdapter {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl TranscriptionAdapter for MockTranscriptionAdapter {
    fn platform_id(&self) -> &str {
        &self.id
    }

    async fn transcribe(&self, _credential_payload: &serde_json::Value, _audio_path: &Path) -> Result<Transcript> {
        Ok(Transcript {
            language: Some("en".to_string()),
            segments: vec![
                TranscriptSegment { text: "Welcome to the session.".to_string(), start_s: 0, end_s: 30 },
                TranscriptSegment { text: "Let's discuss the quarterly roadmap.".to_string(), start_s: 30, end_s: 600 },
                TranscriptSegment { text: "Now onto open questions.".to_string(), start_s: 600, end_s: 900 },
            ],
        })
    }
}

#[derive(Debug)]
pub struct MockTopicAdapter {
    id: String,
}

impl MockTopicAdapter {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl TopicAdapter for MockTopicAdapter {
    fn platform_id(&self) -> &str {
        &self.id
    }

    async fn extract_topics(
        &self,
        _credential_payload: &serde_json::Value,
        transcript: &Transcript,
        target_count: usize,
    ) -> Result<Vec<ExtractedTopic>> {
        let span = transcript.segments.last().map(|s| s.end_s).unwrap_or(600) / target_count.max(1) as i64;
        Ok((0..target_count.max(1) as i64)
            .map(|i| ExtractedTopic {
                title: format!("Topic {}", i + 1),
                start_s: i * span,
                end_s: (i + 1) * span,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn mock_source_lists_configured_candidates() {
        let candidate = RecordingCandidate {
            source_key: "abc".to_string(),
            display_name: "Standup".to_string(),
            start_time: Utc::now(),
            duration_seconds: 600,
            size_bytes: 1024,
            raw_payload: json!({}),
        };
        let adapter = MockSourceAdapter::with_candidates("conferencing_cloud", vec![candidate]);
        let listed = adapter
            .list(&json!({}), &json!({}), Utc::now(), Utc::now())
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].source_key, "abc");
    }

    #[tokio::test]
    async fn mock_sink_reports_failure_when_armed() {
        let adapter = MockSinkAdapter::new("hosting_provider_a");
        *adapter.fail_next.lock().unwrap() = true;

        let metadata = UploadMetadata {
            title: "t".to_string(),
            description: String::new(),
            tags: vec![],
            extra: json!({}),
        };
        let result = adapter
            .upload(
                &json!({}),
                Path::new("/tmp/does-not-matter"),
                &metadata,
                std::sync::Arc::new(|_, _| {}),
                tokio_util::sync::CancellationToken::new(),
            )
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn mock_topic_adapter_covers_the_full_transcript_span() {
        let transcript = Transcript {
            language: Some("en".to_string()),
            segments: vec![TranscriptSegment { text: "x".to_string(), start_s: 0, end_s: 1200 }],
        };
        let adapter = MockTopicAdapter::new("topic_service");
        let topics = adapter.extract_topics(&json!({}), &transcript, 4).await.unwrap();
        assert_eq!(topics.len(), 4);
        assert_eq!(topics.last().unwrap().end_s, 1200);
    }
}
