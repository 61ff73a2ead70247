//! Download stage (spec §4.7): fetch source media into storage. Idempotent
//! on size — re-entering a stage that already wrote the expected byte count
//! skips the network round-trip entirely, so a resumed pipeline never
//! re-downloads a file it already has.

use castforge_adapters::source::{FetchOutcome, FetchProgress, SourceAdapter};
use castforge_core::error::AppError;
use castforge_storage::Storage;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub storage_path: String,
    pub size_bytes: u64,
    pub content_type: Option<String>,
}

/// Fetches `source_key` via `adapter` and writes it to `dest_path` in
/// `storage`. When `expected_size_bytes` is known (from a prior `list()`
/// candidate) and an object already sits at `dest_path` with that size, the
/// fetch is skipped.
#[tracing::instrument(skip(storage, adapter, credential_payload, progress, cancel))]
pub async fn run(
    storage: &dyn Storage,
    adapter: Arc<dyn SourceAdapter>,
    credential_payload: &serde_json::Value,
    source_key: &str,
    dest_path: &str,
    expected_size_bytes: Option<u64>,
    progress: FetchProgress,
    cancel: CancellationToken,
) -> Result<DownloadResult, AppError> {
    if let Some(expected) = expected_size_bytes {
        if storage.exists(dest_path).await.unwrap_or(false) {
            if let Ok(existing) = storage.size(dest_path).await {
                if existing == expected {
                    return Ok(DownloadResult {
                        storage_path: dest_path.to_string(),
                        size_bytes: existing,
                        content_type: None,
                    });
                }
            }
        }
    }

    let tmp_dir = tempfile::tempdir().map_err(|e| AppError::Internal(format!("failed to create temp dir: {e}")))?;
    let tmp_path = tmp_dir.path().join("source.download");

    let outcome: FetchOutcome = adapter
        .fetch(credential_payload, source_key, &tmp_path, progress, cancel)
        .await
        .map_err(|e| AppError::Transient(e.to_string()))?;

    let bytes = tokio::fs::read(&tmp_path)
        .await
        .map_err(|e| AppError::Internal(format!("failed to read fetched file: {e}")))?;

    storage
        .write(dest_path, bytes)
        .await
        .map_err(|e| AppError::Internal(format!("failed to persist downloaded media: {e}")))?;

    Ok(DownloadResult {
        storage_path: dest_path.to_string(),
        size_bytes: outcome.size_bytes,
        content_type: outcome.content_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use castforge_adapters::mock::MockSourceAdapter;
    use castforge_storage::LocalStorage;
    use serde_json::json;

    #[tokio::test]
    async fn fetches_and_persists_to_storage() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(tmp.path().to_path_buf()).await.unwrap();
        let adapter: Arc<dyn SourceAdapter> = Arc::new(MockSourceAdapter::new("conferencing_cloud"));

        let result = run(
            &storage,
            adapter,
            &json!({}),
            "abc",
            "users/t/recordings/r/source.mp4",
            None,
            Arc::new(|_, _| {}),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(result.size_bytes > 0);
        assert!(storage.exists(&result.storage_path).await.unwrap());
    }

    #[tokio::test]
    async fn matching_size_on_disk_skips_refetch() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(tmp.path().to_path_buf()).await.unwrap();
        let path = "users/t/recordings/r/source.mp4";
        storage.write(path, b"mock media bytes".to_vec()).await.unwrap();
        let adapter: Arc<dyn SourceAdapter> = Arc::new(MockSourceAdapter::new("conferencing_cloud"));

        let result = run(
            &storage,
            adapter,
            &json!({}),
            "abc",
            path,
            Some(b"mock media bytes".len() as u64),
            Arc::new(|_, _| {}),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.content_type, None);
    }
}
