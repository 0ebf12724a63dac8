//! Object storage backend selection (S3/MinIO/local filesystem/memory).

use std::path::PathBuf;
use std::sync::Arc;

use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use serde::{Deserialize, Serialize};

use crate::error::{ObjectStoreError, Result};

/// Configuration for the object storage backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectStoreConfig {
    /// In-memory storage (for testing)
    #[default]
    Memory,

    /// Local filesystem storage
    Local {
        /// Path to the storage directory
        path: PathBuf,
    },

    /// S3-compatible storage (AWS S3, MinIO, etc.)
    S3 {
        /// S3 endpoint URL (e.g., "http://localhost:9000" for MinIO)
        endpoint: String,
        access_key: String,
        secret_key: String,
        bucket: String,
        /// Defaults to "us-east-1"
        region: Option<String>,
    },
}

impl ObjectStoreConfig {
    /// Short backend name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ObjectStoreConfig::Memory => "memory",
            ObjectStoreConfig::Local { .. } => "local",
            ObjectStoreConfig::S3 { .. } => "s3",
        }
    }
}

/// Open the backend described by `config`.
///
/// S3 backends are probed with an empty listing so a missing bucket fails
/// at startup rather than on the first write.
pub(crate) async fn open(config: &ObjectStoreConfig) -> Result<Arc<dyn ObjectStore>> {
    let inner: Arc<dyn ObjectStore> = match config {
        ObjectStoreConfig::Memory => Arc::new(InMemory::new()),

        ObjectStoreConfig::Local { path } => {
            tokio::fs::create_dir_all(path).await?;
            Arc::new(
                LocalFileSystem::new_with_prefix(path)
                    .map_err(|e| ObjectStoreError::InvalidConfig(e.to_string()))?,
            )
        }

        ObjectStoreConfig::S3 {
            endpoint,
            access_key,
            secret_key,
            bucket,
            region,
        } => {
            let store: Arc<dyn ObjectStore> = Arc::new(
                AmazonS3Builder::new()
                    .with_endpoint(endpoint)
                    .with_access_key_id(access_key)
                    .with_secret_access_key(secret_key)
                    .with_bucket_name(bucket)
                    .with_region(region.as_deref().unwrap_or("us-east-1"))
                    .with_allow_http(endpoint.starts_with("http://"))
                    .build()
                    .map_err(|e| ObjectStoreError::InvalidConfig(e.to_string()))?,
            );
            probe_bucket(store.as_ref(), bucket).await?;
            store
        }
    };

    tracing::debug!("opened {} object storage", config.kind());
    Ok(inner)
}

async fn probe_bucket(store: &dyn ObjectStore, bucket: &str) -> Result<()> {
    let prefix = ObjectPath::from("");
    let mut stream = store.list(Some(&prefix));
    match stream.try_next().await {
        Ok(_) => Ok(()),
        Err(object_store::Error::NotFound { .. }) => {
            Err(ObjectStoreError::BucketNotFound(bucket.to_string()))
        }
        Err(e) => {
            let msg = e.to_string();
            if msg.contains("NoSuchBucket") || msg.contains("bucket") && msg.contains("not") {
                return Err(ObjectStoreError::BucketNotFound(bucket.to_string()));
            }
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_is_internally_tagged() {
        let config: ObjectStoreConfig =
            serde_json::from_str(r#"{"type":"local","path":"/var/lib/strongbox"}"#).unwrap();
        assert_eq!(
            config,
            ObjectStoreConfig::Local {
                path: PathBuf::from("/var/lib/strongbox")
            }
        );
        assert_eq!(config.kind(), "local");
        assert_eq!(ObjectStoreConfig::default().kind(), "memory");
    }

    #[tokio::test]
    async fn test_local_creates_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("ciphertext");
        open(&ObjectStoreConfig::Local { path: path.clone() })
            .await
            .unwrap();
        assert!(path.is_dir());
    }
}
