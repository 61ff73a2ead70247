//! Upload stage (spec §4.7): render title/description from the recording's
//! template context and push media + metadata to one output target. Fanout
//! across targets (bounded at `MAX_CONCURRENT_UPLOADS_PER_RECORDING`) is the
//! executor's job; this module drives exactly one target.

use crate::template_vars::{render, TemplateContext};
use castforge_adapters::sink::{SinkAdapter, UploadMetadata, UploadOutcome};
use castforge_adapters::source::FetchProgress;
use castforge_core::error::AppError;
use serde_json::Value as JsonValue;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Renders a target's title/description templates against the recording's
/// context, leaving tags and extra metadata untouched.
pub fn render_metadata(
    title_template: &str,
    description_template: &str,
    tags: Vec<String>,
    extra: JsonValue,
    ctx: &TemplateContext,
) -> UploadMetadata {
    UploadMetadata {
        title: render(title_template, ctx),
        description: render(description_template, ctx),
        tags,
        extra,
    }
}

#[tracing::instrument(skip(sink, credential_payload, metadata, progress, cancel))]
pub async fn run(
    sink: Arc<dyn SinkAdapter>,
    credential_payload: &JsonValue,
    media_path: &Path,
    metadata: &UploadMetadata,
    progress: FetchProgress,
    cancel: CancellationToken,
) -> Result<UploadOutcome, AppError> {
    sink.upload(credential_payload, media_path, metadata, progress, cancel)
        .await
        .map_err(|e| AppError::Transient(e.to_string()))
}

/// Metadata-only republish against an already-uploaded target (spec §4.6
/// `RematchTemplate`/manual metadata edits), used when
/// `capabilities().supports_metadata_update` and no new media needs sending.
#[tracing::instrument(skip(sink, credential_payload, metadata))]
pub async fn update_metadata(
    sink: Arc<dyn SinkAdapter>,
    credential_payload: &JsonValue,
    external_ref: &str,
    metadata: &UploadMetadata,
) -> Result<(), AppError> {
    sink.update_metadata(credential_payload, external_ref, metadata)
        .await
        .map_err(|e| AppError::Transient(e.to_string()))
}
