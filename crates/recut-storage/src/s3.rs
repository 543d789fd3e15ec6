//! S3-compatible blob store.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::BlobStore;

/// Configuration for the S3 backend.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// S3 API endpoint URL
    pub endpoint_url: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket name
    pub bucket_name: String,
    /// Region ("auto" for R2-style endpoints)
    pub region: String,
    /// Presigned URL lifetime
    pub presign_ttl: Duration,
}

impl S3Config {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: std::env::var("RECUT_S3_ENDPOINT")
                .map_err(|_| StorageError::config_error("RECUT_S3_ENDPOINT not set"))?,
            access_key_id: std::env::var("RECUT_S3_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("RECUT_S3_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("RECUT_S3_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("RECUT_S3_SECRET_ACCESS_KEY not set"))?,
            bucket_name: std::env::var("RECUT_S3_BUCKET")
                .map_err(|_| StorageError::config_error("RECUT_S3_BUCKET not set"))?,
            region: std::env::var("RECUT_S3_REGION").unwrap_or_else(|_| "auto".to_string()),
            presign_ttl: Duration::from_secs(
                std::env::var("RECUT_S3_PRESIGN_TTL")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
        })
    }
}

/// Blob store over an S3-compatible endpoint.
#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    presign_ttl: Duration,
}

impl S3BlobStore {
    /// Create a new client from configuration.
    pub async fn new(config: S3Config) -> StorageResult<Self> {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "recut",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
            presign_ttl: config.presign_ttl,
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StorageResult<Self> {
        Self::new(S3Config::from_env()?).await
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> StorageResult<String> {
        debug!("Uploading {} to {}", path.display(), key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!("Uploaded {} to {}", path.display(), key);
        self.readable_uri(key).await
    }

    async fn fetch_to_file(&self, key: &str, dest: &Path) -> StorageResult<()> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("NoSuchKey") {
                    StorageError::NotFound(key.to_string())
                } else {
                    StorageError::download_failed(msg)
                }
            })?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(dest).await?;
        let mut body = response.body.into_async_read();
        tokio::io::copy(&mut body, &mut file).await?;
        file.flush().await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.to_string().contains("NotFound") => Ok(false),
            Err(e) => Err(StorageError::download_failed(e.to_string())),
        }
    }

    async fn delete_prefix(&self, prefix: &str) -> StorageResult<()> {
        let listed = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .send()
            .await
            .map_err(|e| StorageError::download_failed(e.to_string()))?;

        for object in listed.contents() {
            if let Some(key) = object.key() {
                self.client
                    .delete_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .send()
                    .await
                    .map_err(|e| StorageError::download_failed(e.to_string()))?;
            }
        }
        Ok(())
    }

    async fn readable_uri(&self, key: &str) -> StorageResult<String> {
        let presign = PresigningConfig::expires_in(self.presign_ttl)
            .map_err(|e| StorageError::config_error(e.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign)
            .await
            .map_err(|e| StorageError::download_failed(e.to_string()))?;
        Ok(request.uri().to_string())
    }

    fn local_path(&self, _key: &str) -> Option<PathBuf> {
        None
    }
}
