//! [`CiphertextStore`] over an object store.
//!
//! Entries live at `buckets/<bucket>/<key>`. Path parts are escaped by
//! `object_store`, so a key can never climb into a neighbouring bucket.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;

use common::store::{CiphertextStore, StoreError};

use crate::error::Result;
use crate::storage::{self, ObjectStoreConfig};

const BUCKETS_ROOT: &str = "buckets";

#[derive(Debug, Clone)]
pub struct ObjectCiphertextStore {
    inner: Arc<dyn ObjectStore>,
}

impl ObjectCiphertextStore {
    pub async fn new(config: ObjectStoreConfig) -> Result<Self> {
        let inner = storage::open(&config).await?;
        Ok(Self { inner })
    }

    /// A fully ephemeral store.
    pub fn memory() -> Self {
        Self {
            inner: Arc::new(object_store::memory::InMemory::new()),
        }
    }

    fn bucket_path(bucket: &str) -> ObjectPath {
        ObjectPath::from_iter([BUCKETS_ROOT, bucket])
    }

    fn entry_path(bucket: &str, key: &str) -> ObjectPath {
        ObjectPath::from_iter([BUCKETS_ROOT, bucket, key])
    }

    async fn exists(&self, path: &ObjectPath) -> std::result::Result<bool, StoreError> {
        match self.inner.head(path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(backend(e)),
        }
    }
}

fn backend(e: object_store::Error) -> StoreError {
    StoreError::Backend(e.into())
}

#[async_trait]
impl CiphertextStore for ObjectCiphertextStore {
    async fn get(&self, bucket: &str, key: &str) -> std::result::Result<Vec<u8>, StoreError> {
        let path = Self::entry_path(bucket, key);
        let result = match self.inner.get(&path).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(StoreError::NotFound(format!("{bucket}/{key}")))
            }
            Err(e) => return Err(backend(e)),
        };
        let bytes = result.bytes().await.map_err(backend)?;
        Ok(bytes.to_vec())
    }

    async fn set(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
    ) -> std::result::Result<(), StoreError> {
        let path = Self::entry_path(bucket, key);
        self.inner
            .put(&path, Bytes::from(data).into())
            .await
            .map_err(backend)?;
        tracing::debug!(bucket, key, "stored ciphertext");
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> std::result::Result<(), StoreError> {
        let path = Self::entry_path(bucket, key);
        // most backends treat deleting a missing object as success
        if !self.exists(&path).await? {
            return Err(StoreError::NotFound(format!("{bucket}/{key}")));
        }
        match self.inner.delete(&path).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(backend(e)),
        }
    }

    async fn purge(&self, bucket: &str) -> std::result::Result<(), StoreError> {
        let prefix = Self::bucket_path(bucket);
        let entries: Vec<_> = self
            .inner
            .list(Some(&prefix))
            .try_collect()
            .await
            .map_err(backend)?;
        if entries.is_empty() {
            return Err(StoreError::NotFound(format!("bucket {bucket}")));
        }

        let count = entries.len();
        for meta in entries {
            match self.inner.delete(&meta.location).await {
                Ok(()) | Err(object_store::Error::NotFound { .. }) => {}
                Err(e) => return Err(backend(e)),
            }
        }
        tracing::debug!(bucket, count, "purged ciphertext bucket");
        Ok(())
    }
}
