//! Storage capabilities consumed by the core.
//!
//! The core never persists anything itself. It drives two capabilities:
//!
//! - a [`MetadataStore`] holding users, secret metadata and share relations
//!   under uniqueness constraints, and
//! - a [`CiphertextStore`] holding opaque bytes in per-owner buckets.
//!
//! Neither offers a transaction spanning both, which is why every multi-step
//! mutation runs inside a [`Compensator`](crate::compensation::Compensator).
//!
//! Both traits report a missing record as [`StoreError::NotFound`] and a
//! uniqueness violation as [`StoreError::AlreadyExists`], distinct from any
//! other backend failure.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::share::{NewShareRecord, ShareRecord};
use crate::types::{NewSecret, NewUser, SecretId, SecretMeta, ShareId, User, UserId};

mod memory;

pub use memory::{MemoryCiphertextStore, MemoryMetadataStore};

/// Reserved slot holding a user's cipher key inside their bucket.
pub const CIPHER_KEY_SLOT: &str = "__cipher_key";

/// Name of the ciphertext bucket owned by `user`.
pub fn user_bucket(user: UserId) -> String {
    format!("user-{user}")
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Relational store of structural records. Never holds plaintext values.
///
/// `restore_*` re-inserts a record previously returned by the store, keeping
/// its id and timestamps. It is how compensation undoes a delete.
#[async_trait]
pub trait MetadataStore: Send + Sync + Debug + 'static {
    /// Fails with `AlreadyExists` when the handle is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
    async fn restore_user(&self, user: &User) -> Result<(), StoreError>;
    async fn user_by_handle(&self, handle: &str) -> Result<User, StoreError>;
    async fn user_by_id(&self, id: UserId) -> Result<User, StoreError>;
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
    /// Overwrites the mutable fields (name, password verifier, `updated_at`).
    async fn update_user(&self, user: &User) -> Result<(), StoreError>;
    async fn delete_user(&self, id: UserId) -> Result<(), StoreError>;

    /// Fails with `AlreadyExists` when the owner already has this key.
    async fn create_secret(&self, secret: NewSecret) -> Result<SecretMeta, StoreError>;
    async fn restore_secret(&self, secret: &SecretMeta) -> Result<(), StoreError>;
    async fn secret(&self, owner: UserId, key: &str) -> Result<SecretMeta, StoreError>;
    async fn list_secrets(&self, owner: UserId) -> Result<Vec<SecretMeta>, StoreError>;
    async fn delete_secret(&self, id: SecretId) -> Result<(), StoreError>;

    /// Fails with `AlreadyExists` when the target already holds a relation
    /// to this secret.
    async fn create_share(&self, share: NewShareRecord) -> Result<ShareRecord, StoreError>;
    async fn restore_share(&self, share: &ShareRecord) -> Result<(), StoreError>;
    async fn shares_for_secret(&self, secret: SecretId) -> Result<Vec<ShareRecord>, StoreError>;
    async fn shares_by_owner(&self, owner: UserId) -> Result<Vec<ShareRecord>, StoreError>;
    async fn shares_for_target(&self, target: UserId) -> Result<Vec<ShareRecord>, StoreError>;
    async fn delete_share(&self, id: ShareId) -> Result<(), StoreError>;
}

/// Bucketed key-value store of opaque bytes.
#[async_trait]
pub trait CiphertextStore: Send + Sync + Debug + 'static {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;
    /// Creates or replaces the entry.
    async fn set(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<(), StoreError>;
    /// Fails with `NotFound` when the entry is absent.
    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError>;
    /// Removes the whole bucket. Fails with `NotFound` when it holds nothing.
    async fn purge(&self, bucket: &str) -> Result<(), StoreError>;
}
