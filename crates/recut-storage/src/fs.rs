//! Filesystem blob store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::BlobStore;

/// Blob store rooted at a local directory. Keys map directly to relative
/// paths; URIs are `file://` URLs ffmpeg and ffprobe open natively.
#[derive(Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create from `RECUT_BLOB_ROOT`, defaulting to `/var/lib/recut/blobs`.
    pub fn from_env() -> Self {
        let root = std::env::var("RECUT_BLOB_ROOT")
            .unwrap_or_else(|_| "/var/lib/recut/blobs".to_string());
        Self::new(root)
    }

    fn resolve(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put_file(&self, key: &str, path: &Path, _content_type: &str) -> StorageResult<String> {
        let dest = self.resolve(key);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Copy then rename within the same directory so readers never see a
        // partially written object.
        let staging = dest.with_extension("part");
        tokio::fs::copy(path, &staging).await?;
        tokio::fs::rename(&staging, &dest).await?;
        debug!(key, src = %path.display(), "Stored blob");
        self.readable_uri(key).await
    }

    async fn fetch_to_file(&self, key: &str, dest: &Path) -> StorageResult<()> {
        let src = self.resolve(key);
        if !src.exists() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(&src, dest).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(tokio::fs::try_exists(self.resolve(key)).await?)
    }

    async fn delete_prefix(&self, prefix: &str) -> StorageResult<()> {
        let dir = self.resolve(prefix);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn readable_uri(&self, key: &str) -> StorageResult<String> {
        Ok(format!("file://{}", self.resolve(key).display()))
    }

    fn local_path(&self, key: &str) -> Option<PathBuf> {
        Some(self.resolve(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_fetch_round_trip() {
        let root = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(root.path());

        let src = root.path().join("input.bin");
        tokio::fs::write(&src, b"payload").await.unwrap();

        let uri = store
            .put_file("derived/m1/audio.wav", &src, "audio/wav")
            .await
            .unwrap();
        assert!(uri.starts_with("file://"));
        assert!(store.exists("derived/m1/audio.wav").await.unwrap());

        let dest = root.path().join("out.bin");
        store
            .fetch_to_file("derived/m1/audio.wav", &dest)
            .await
            .unwrap();
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_delete_prefix_removes_scratch() {
        let root = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(root.path());

        let src = root.path().join("seg.mkv");
        tokio::fs::write(&src, b"x").await.unwrap();
        store
            .put_file("tmp/j1/segments/0000.mkv", &src, "video/x-matroska")
            .await
            .unwrap();

        store.delete_prefix("tmp/j1").await.unwrap();
        assert!(!store.exists("tmp/j1/segments/0000.mkv").await.unwrap());
        // Deleting again is a no-op.
        store.delete_prefix("tmp/j1").await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_missing_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(root.path());
        let dest = root.path().join("out.bin");
        let err = store.fetch_to_file("nope", &dest).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
