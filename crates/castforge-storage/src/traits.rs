//! Storage abstraction trait.
//!
//! castforge's core depends only on this interface; the physical backend
//! (local disk vs. object storage) is, per spec, an external collaborator.
//! `LocalStorage` exists purely so tests can exercise the Storage Path
//! Builder and pipeline stages without a real object store.

use async_trait::async_trait;
use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("read failed: {0}")]
    ReadFailed(String),

    #[error("delete failed: {0}")]
    DeleteFailed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid storage path: {0}")]
    InvalidPath(String),

    #[error("backend error: {0}")]
    BackendError(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Byte-oriented storage abstraction keyed by a relative path (see the
/// Storage Path Builder, spec §4.11, for the layout convention callers use
/// to build their keys).
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` at `path`, creating parent directories/prefixes as
    /// needed. Overwrites an existing object at the same path.
    async fn write(&self, path: &str, data: Vec<u8>) -> StorageResult<()>;

    /// Read the full contents at `path`.
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Delete a single object. Not an error if the object does not exist.
    async fn delete(&self, path: &str) -> StorageResult<()>;

    /// Recursively delete everything under `prefix` and return the total
    /// bytes removed (drives `TrackStorageRemoved`, spec §4.8/§4.11).
    async fn delete_prefix(&self, prefix: &str) -> StorageResult<u64>;

    /// Whether an object exists at `path`.
    async fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Size in bytes of the object at `path`.
    async fn size(&self, path: &str) -> StorageResult<u64>;

    /// Sum of sizes of every object under `prefix`.
    async fn size_of_prefix(&self, prefix: &str) -> StorageResult<u64>;

    /// Relative paths (one level under `prefix`) of every entry whose last
    /// modification time is older than `max_age_secs`. Drives the temp
    /// directory sweep (spec §4.11: `temp/<tenant_id>/<job_uuid>/...` is
    /// swept after 24 h).
    async fn list_entries_older_than(&self, prefix: &str, max_age_secs: u64) -> StorageResult<Vec<String>>;
}
