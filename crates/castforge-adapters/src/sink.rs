//! Sink adapter: `Upload` and `UpdateMetadata` against an external hosting
//! platform (spec §4.10, §4.6 `OutputTarget`).

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::Path;

/// Rendered title/description/tags for one output target, after template
/// substitution (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub extra: serde_json::Value,
}

/// What a successful upload or metadata update returns (spec §4.6
/// `external_ref`, `external_url`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub external_ref: String,
    pub external_url: Option<String>,
}

/// What this platform supports, so the Upload stage knows whether a
/// metadata-only update is possible without re-uploading media.
#[derive(Debug, Clone, Copy)]
pub struct SinkCapabilities {
    pub supports_metadata_update: bool,
    pub supports_resumable_upload: bool,
}

/// A connector to one external hosting platform.
#[async_trait]
pub trait SinkAdapter: Send + Sync + Debug {
    /// Platform id this adapter serves, matching `castforge_core::models::credential::Platform`.
    fn platform_id(&self) -> &str;

    fn capabilities(&self) -> SinkCapabilities;

    /// Upload `media_path` with the given metadata (spec §4.7 `Upload`).
    async fn upload(
        &self,
        credential_payload: &serde_json::Value,
        media_path: &Path,
        metadata: &UploadMetadata,
        progress: crate::source::FetchProgress,
        cancel: tokio_util::sync::CancellationToken,
    ) -> Result<UploadOutcome>;

    /// Update title/description/tags on an already-uploaded target without
    /// re-uploading media, when `capabilities().supports_metadata_update`.
    async fn update_metadata(
        &self,
        credential_payload: &serde_json::Value,
        external_ref: &str,
        metadata: &UploadMetadata,
    ) -> Result<()>;
}
