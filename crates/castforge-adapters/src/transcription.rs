//! Speech-to-text and topic-extraction adapters (spec §4.7 `Transcribe` /
//! `ExtractTopics`). Separate traits from `SourceAdapter`/`SinkAdapter`
//! because these platforms (`SpeechService`, `TopicService`) are neither an
//! ingestion endpoint nor a hosting destination.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::Path;

/// One word- or phrase-level segment of a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub text: String,
    pub start_s: i64,
    pub end_s: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub language: Option<String>,
    pub segments: Vec<TranscriptSegment>,
}

#[async_trait]
pub trait TranscriptionAdapter: Send + Sync + Debug {
    fn platform_id(&self) -> &str;

    async fn transcribe(
        &self,
        credential_payload: &serde_json::Value,
        audio_path: &Path,
    ) -> Result<Transcript>;
}

/// A raw `(title, start_s, end_s)` topic, before shape rules are enforced
/// (`castforge_processing::topics::finalize` is where those rules live).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedTopic {
    pub title: String,
    pub start_s: i64,
    pub end_s: i64,
}

#[async_trait]
pub trait TopicAdapter: Send + Sync + Debug {
    fn platform_id(&self) -> &str;

    async fn extract_topics(
        &self,
        credential_payload: &serde_json::Value,
        transcript: &Transcript,
        target_count: usize,
    ) -> Result<Vec<ExtractedTopic>>;
}
