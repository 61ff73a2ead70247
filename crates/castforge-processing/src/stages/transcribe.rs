//! Transcribe stage (spec §4.7): speech-to-text over the extracted audio.
//! Concurrency (at most `MAX_CONCURRENT_TRANSCRIPTIONS_PER_TENANT` in
//! flight per tenant) and the retry budget are the executor's job; this
//! module is the single adapter call.

use castforge_adapters::transcription::{Transcript, TranscriptionAdapter};
use castforge_core::error::AppError;
use std::path::Path;
use std::sync::Arc;

#[tracing::instrument(skip(adapter, credential_payload))]
pub async fn run(
    adapter: Arc<dyn TranscriptionAdapter>,
    credential_payload: &serde_json::Value,
    audio_path: &Path,
) -> Result<Transcript, AppError> {
    adapter
        .transcribe(credential_payload, audio_path)
        .await
        .map_err(|e| AppError::Transient(e.to_string()))
}
