//! Source adapter: `List` and `Fetch` against an external ingestion endpoint
//! (spec §4.10, §3 `Source`).

use anyhow::Result;
use async_trait::async_trait;
use castforge_core::models::source::RecordingCandidate;
use std::fmt::Debug;
use std::sync::Arc;
use uuid::Uuid;

/// Progress callback invoked during a `Fetch`, in bytes written so far /
/// total bytes (when known). Stage runners translate this into a
/// `ProcessingStage.progress` update (spec §4.7).
pub type FetchProgress = Arc<dyn Fn(u64, Option<u64>) + Send + Sync>;

/// A connector to one external ingestion platform (conferencing cloud,
/// cloud drive, local filesystem). One adapter instance is shared across
/// tenants; per-tenant credentials are passed into each call.
#[async_trait]
pub trait SourceAdapter: Send + Sync + Debug {
    /// Platform id this adapter serves, matching `castforge_core::models::credential::Platform`.
    fn platform_id(&self) -> &str;

    /// List candidate recordings available in `[from, to]`, using the
    /// decrypted credential payload and source settings (spec §4.9 `Sync`).
    async fn list(
        &self,
        credential_payload: &serde_json::Value,
        source_settings: &serde_json::Value,
        from: chrono::DateTime<chrono::Utc>,
        to: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<RecordingCandidate>>;

    /// Download a candidate's media to `dest_path` on local disk, reporting
    /// progress as it streams, and supporting cooperative cancellation via
    /// `cancel` (spec §4.7 `Download`).
    async fn fetch(
        &self,
        credential_payload: &serde_json::Value,
        source_key: &str,
        dest_path: &std::path::Path,
        progress: FetchProgress,
        cancel: tokio_util::sync::CancellationToken,
    ) -> Result<FetchOutcome>;
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub size_bytes: u64,
    pub content_type: Option<String>,
}

/// Opaque handle identifying one fetched item, used when a caller needs to
/// correlate a `list()` result with its later `fetch()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceItemId(pub Uuid);
