//! ExtractTopics stage (spec §4.7): a topic-service call sized by duration
//! and mode, followed by the fixed shape rules in `crate::topics`.

use crate::template_vars::Topic;
use crate::topics::{finalize, target_topic_count, RawTopic, TopicMode};
use castforge_adapters::transcription::{Transcript, TopicAdapter};
use castforge_core::error::AppError;
use std::sync::Arc;

#[tracing::instrument(skip(adapter, credential_payload, transcript, silences))]
pub async fn run(
    adapter: Arc<dyn TopicAdapter>,
    credential_payload: &serde_json::Value,
    transcript: &Transcript,
    duration_seconds: i64,
    mode: TopicMode,
    silences: &[(i64, i64)],
) -> Result<Vec<Topic>, AppError> {
    let target_count = target_topic_count(duration_seconds, mode);

    let raw = adapter
        .extract_topics(credential_payload, transcript, target_count)
        .await
        .map_err(|e| AppError::Transient(e.to_string()))?;

    let raw: Vec<RawTopic> = raw
        .into_iter()
        .map(|t| RawTopic {
            title: t.title,
            start_s: t.start_s,
            end_s: t.end_s,
        })
        .collect();

    Ok(finalize(raw, silences))
}
