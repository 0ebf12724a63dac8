//! Object Storage Backend
//!
//! This crate provides a [`CiphertextStore`](common::store::CiphertextStore)
//! implementation on top of pluggable object storage (S3/MinIO/local
//! filesystem/memory). Every ciphertext bucket maps onto a path prefix, so a
//! single object store bucket holds the sealed values of every user.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use strongbox_object_store::{ObjectCiphertextStore, ObjectStoreConfig};
//!
//! # async fn example() -> Result<(), strongbox_object_store::ObjectStoreError> {
//! let config = ObjectStoreConfig::Local {
//!     path: PathBuf::from("/tmp/strongbox/ciphertext"),
//! };
//! let store = ObjectCiphertextStore::new(config).await?;
//! # Ok(())
//! # }
//! ```

mod cipher_store;
mod error;
mod storage;

pub use cipher_store::ObjectCiphertextStore;
pub use error::{ObjectStoreError, Result};
pub use storage::ObjectStoreConfig;
