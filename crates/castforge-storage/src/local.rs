use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Filesystem-backed storage, used for local development and tests.
///
/// Keys are relative paths under `base_path`; the only validation performed
/// is a path-traversal guard (`..` and absolute paths are rejected) so
/// recording/tenant ids can never be coerced into escaping the root.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;
        Ok(Self { base_path })
    }

    fn resolve(&self, path: &str) -> StorageResult<PathBuf> {
        if path.contains("..") || path.starts_with('/') {
            return Err(StorageError::InvalidPath(format!(
                "path '{}' escapes the storage root",
                path
            )));
        }
        Ok(self.base_path.join(path))
    }
}

async fn dir_size(path: &Path) -> StorageResult<u64> {
    let mut total = 0u64;
    let mut stack = vec![path.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if meta.is_dir() {
                stack.push(entry.path());
            } else {
                total += meta.len();
            }
        }
    }
    Ok(total)
}

#[async_trait]
impl Storage for LocalStorage {
    async fn write(&self, path: &str, data: Vec<u8>) -> StorageResult<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&full, data).await?;
        Ok(())
    }

    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let full = self.resolve(path)?;
        fs::read(&full).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
            _ => StorageError::ReadFailed(e.to_string()),
        })
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        let full = self.resolve(path)?;
        match fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(e.to_string())),
        }
    }

    async fn delete_prefix(&self, prefix: &str) -> StorageResult<u64> {
        let full = self.resolve(prefix)?;
        let bytes = dir_size(&full).await.unwrap_or(0);
        match fs::remove_dir_all(&full).await {
            Ok(()) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(StorageError::DeleteFailed(e.to_string())),
        }
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let full = self.resolve(path)?;
        Ok(fs::try_exists(&full).await.unwrap_or(false))
    }

    async fn size(&self, path: &str) -> StorageResult<u64> {
        let full = self.resolve(path)?;
        let meta = fs::metadata(&full).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
            _ => StorageError::BackendError(e.to_string()),
        })?;
        Ok(meta.len())
    }

    async fn size_of_prefix(&self, prefix: &str) -> StorageResult<u64> {
        let full = self.resolve(prefix)?;
        dir_size(&full).await
    }

    async fn list_entries_older_than(&self, prefix: &str, max_age_secs: u64) -> StorageResult<Vec<String>> {
        let full = self.resolve(prefix)?;
        let mut entries = match fs::read_dir(&full).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let max_age = std::time::Duration::from_secs(max_age_secs);
        let now = std::time::SystemTime::now();
        let mut stale = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            let modified = meta.modified().unwrap_or(now);
            if now.duration_since(modified).unwrap_or_default() >= max_age {
                if let Some(name) = entry.file_name().to_str() {
                    stale.push(format!("{prefix}/{name}"));
                }
            }
        }
        Ok(stale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn storage() -> (LocalStorage, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        (storage, dir)
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let (storage, _dir) = storage().await;
        storage
            .write("users/t1/recordings/r1/video.mp4", b"hello".to_vec())
            .await
            .unwrap();
        let data = storage
            .read("users/t1/recordings/r1/video.mp4")
            .await
            .unwrap();
        assert_eq!(data, b"hello");
    }

    #[tokio::test]
    async fn rejects_path_traversal() {
        let (storage, _dir) = storage().await;
        let err = storage.write("../escape.txt", vec![1]).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn delete_prefix_removes_tree_and_returns_size() {
        let (storage, _dir) = storage().await;
        storage
            .write("users/t1/recordings/r1/video.mp4", vec![0u8; 10])
            .await
            .unwrap();
        storage
            .write("users/t1/recordings/r1/audio.mp3", vec![0u8; 5])
            .await
            .unwrap();
        let removed = storage
            .delete_prefix("users/t1/recordings/r1")
            .await
            .unwrap();
        assert_eq!(removed, 15);
        assert!(!storage
            .exists("users/t1/recordings/r1/video.mp4")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn size_of_missing_prefix_is_zero() {
        let (storage, _dir) = storage().await;
        assert_eq!(storage.size_of_prefix("nope").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_entries_older_than_finds_every_entry_at_zero_age() {
        let (storage, _dir) = storage().await;
        storage.write("temp/t1/job-a/chunk.bin", vec![0u8; 1]).await.unwrap();
        storage.write("temp/t1/job-b/chunk.bin", vec![0u8; 1]).await.unwrap();

        let stale = storage.list_entries_older_than("temp/t1", 0).await.unwrap();
        assert_eq!(stale.len(), 2);
        assert!(stale.contains(&"temp/t1/job-a".to_string()));
        assert!(stale.contains(&"temp/t1/job-b".to_string()));
    }

    #[tokio::test]
    async fn list_entries_older_than_excludes_entries_within_the_window() {
        let (storage, _dir) = storage().await;
        storage.write("temp/t1/job-a/chunk.bin", vec![0u8; 1]).await.unwrap();

        let stale = storage.list_entries_older_than("temp/t1", 3600).await.unwrap();
        assert!(stale.is_empty());
    }

    #[tokio::test]
    async fn list_entries_older_than_missing_prefix_is_empty() {
        let (storage, _dir) = storage().await;
        assert!(storage.list_entries_older_than("temp/nope", 0).await.unwrap().is_empty());
    }
}
