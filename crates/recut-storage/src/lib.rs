//! Blob store for originals, intermediates and rendered outputs.
//!
//! Two backends behind one trait: a filesystem store (default; the renderer
//! hands ffmpeg local paths directly) and an S3-compatible store for
//! deployments with remote object storage.

pub mod error;
pub mod fs;
pub mod layout;
pub mod s3;

pub use error::{StorageError, StorageResult};
pub use fs::FsBlobStore;
pub use s3::{S3BlobStore, S3Config};

use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// Durable byte storage keyed by the layout in [`layout`]. Objects are
/// immutable once written; writers always produce the full object or fail.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a local file under `key`. Returns a readable URI.
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> StorageResult<String>;

    /// Fetch the object at `key` into a local file.
    async fn fetch_to_file(&self, key: &str, dest: &Path) -> StorageResult<()>;

    /// Whether an object exists at `key`.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Delete every object under `prefix`. Used for per-job tmp cleanup.
    async fn delete_prefix(&self, prefix: &str) -> StorageResult<()>;

    /// A URI a reader can open for the object at `key`.
    async fn readable_uri(&self, key: &str) -> StorageResult<String>;

    /// Local filesystem path for `key`, when the backend has one. The
    /// renderer uses this to feed ffmpeg without a copy.
    fn local_path(&self, key: &str) -> Option<PathBuf>;
}
