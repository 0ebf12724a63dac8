use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{CiphertextStore, MetadataStore, StoreError};
use crate::share::{NewShareRecord, ShareRecord};
use crate::types::{NewSecret, NewUser, SecretId, SecretMeta, ShareId, User, UserId};

/// In-memory metadata store with the same uniqueness and reference rules as
/// the SQLite adapter.
#[derive(Debug, Clone, Default)]
pub struct MemoryMetadataStore {
    inner: Arc<RwLock<MetadataInner>>,
}

#[derive(Debug, Default)]
struct MetadataInner {
    next_id: i64,
    users: BTreeMap<UserId, User>,
    secrets: BTreeMap<SecretId, SecretMeta>,
    shares: BTreeMap<ShareId, ShareRecord>,
}

impl MetadataInner {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn observe_id(&mut self, id: i64) {
        self.next_id = self.next_id.max(id);
    }

    fn check_user_unique(&self, id: Option<UserId>, handle: &str) -> Result<(), StoreError> {
        if let Some(id) = id {
            if self.users.contains_key(&id) {
                return Err(StoreError::AlreadyExists(format!("user {id}")));
            }
        }
        if self.users.values().any(|u| u.handle == handle) {
            return Err(StoreError::AlreadyExists(format!("user {handle}")));
        }
        Ok(())
    }

    fn check_secret_insert(
        &self,
        id: Option<SecretId>,
        owner: UserId,
        key: &str,
    ) -> Result<(), StoreError> {
        if !self.users.contains_key(&owner) {
            return Err(StoreError::NotFound(format!("user {owner}")));
        }
        if let Some(id) = id {
            if self.secrets.contains_key(&id) {
                return Err(StoreError::AlreadyExists(format!("secret {id}")));
            }
        }
        if self
            .secrets
            .values()
            .any(|s| s.owner_id == owner && s.key == key)
        {
            return Err(StoreError::AlreadyExists(format!("secret {key}")));
        }
        Ok(())
    }

    fn check_share_insert(
        &self,
        id: Option<ShareId>,
        secret: SecretId,
        owner: UserId,
        target: UserId,
    ) -> Result<(), StoreError> {
        if !self.secrets.contains_key(&secret) {
            return Err(StoreError::NotFound(format!("secret {secret}")));
        }
        for user in [owner, target] {
            if !self.users.contains_key(&user) {
                return Err(StoreError::NotFound(format!("user {user}")));
            }
        }
        if let Some(id) = id {
            if self.shares.contains_key(&id) {
                return Err(StoreError::AlreadyExists(format!("share {id}")));
            }
        }
        if self
            .shares
            .values()
            .any(|s| s.secret_id == secret && s.target_id == target)
        {
            return Err(StoreError::AlreadyExists(format!(
                "share of secret {secret} with user {target}"
            )));
        }
        Ok(())
    }
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write();
        inner.check_user_unique(None, &user.handle)?;
        let id = inner.allocate_id();
        let user = User {
            id,
            handle: user.handle,
            name: user.name,
            salt: user.salt,
            password_hash: user.password_hash,
            created_at: user.created_at,
            updated_at: user.created_at,
        };
        inner.users.insert(id, user.clone());
        Ok(user)
    }

    async fn restore_user(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        inner.check_user_unique(Some(user.id), &user.handle)?;
        inner.observe_id(user.id);
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn user_by_handle(&self, handle: &str) -> Result<User, StoreError> {
        self.inner
            .read()
            .users
            .values()
            .find(|u| u.handle == handle)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user {handle}")))
    }

    async fn user_by_id(&self, id: UserId) -> Result<User, StoreError> {
        self.inner
            .read()
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.inner.read().users.values().cloned().collect())
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let stored = inner
            .users
            .get_mut(&user.id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user.id)))?;
        stored.name = user.name.clone();
        stored.salt = user.salt.clone();
        stored.password_hash = user.password_hash.clone();
        stored.updated_at = user.updated_at;
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.secrets.values().any(|s| s.owner_id == id)
            || inner
                .shares
                .values()
                .any(|s| s.owner_id == id || s.target_id == id)
        {
            return Err(StoreError::Backend(anyhow::anyhow!(
                "user {id} is still referenced"
            )));
        }
        inner
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))
    }

    async fn create_secret(&self, secret: NewSecret) -> Result<SecretMeta, StoreError> {
        let mut inner = self.inner.write();
        inner.check_secret_insert(None, secret.owner_id, &secret.key)?;
        let id = inner.allocate_id();
        let meta = SecretMeta {
            id,
            owner_id: secret.owner_id,
            key: secret.key,
            created_at: secret.created_at,
        };
        inner.secrets.insert(id, meta.clone());
        Ok(meta)
    }

    async fn restore_secret(&self, secret: &SecretMeta) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        inner.check_secret_insert(Some(secret.id), secret.owner_id, &secret.key)?;
        inner.observe_id(secret.id);
        inner.secrets.insert(secret.id, secret.clone());
        Ok(())
    }

    async fn secret(&self, owner: UserId, key: &str) -> Result<SecretMeta, StoreError> {
        self.inner
            .read()
            .secrets
            .values()
            .find(|s| s.owner_id == owner && s.key == key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("secret {key}")))
    }

    async fn list_secrets(&self, owner: UserId) -> Result<Vec<SecretMeta>, StoreError> {
        Ok(self
            .inner
            .read()
            .secrets
            .values()
            .filter(|s| s.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn delete_secret(&self, id: SecretId) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.shares.values().any(|s| s.secret_id == id) {
            return Err(StoreError::Backend(anyhow::anyhow!(
                "secret {id} is still shared"
            )));
        }
        inner
            .secrets
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("secret {id}")))
    }

    async fn create_share(&self, share: NewShareRecord) -> Result<ShareRecord, StoreError> {
        let mut inner = self.inner.write();
        inner.check_share_insert(None, share.secret_id, share.owner_id, share.target_id)?;
        let id = inner.allocate_id();
        let record = ShareRecord {
            id,
            secret_id: share.secret_id,
            owner_id: share.owner_id,
            target_id: share.target_id,
            created_at: share.created_at,
            relation: share.relation,
        };
        inner.shares.insert(id, record.clone());
        Ok(record)
    }

    async fn restore_share(&self, share: &ShareRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        inner.check_share_insert(
            Some(share.id),
            share.secret_id,
            share.owner_id,
            share.target_id,
        )?;
        inner.observe_id(share.id);
        inner.shares.insert(share.id, share.clone());
        Ok(())
    }

    async fn shares_for_secret(&self, secret: SecretId) -> Result<Vec<ShareRecord>, StoreError> {
        Ok(self
            .inner
            .read()
            .shares
            .values()
            .filter(|s| s.secret_id == secret)
            .cloned()
            .collect())
    }

    async fn shares_by_owner(&self, owner: UserId) -> Result<Vec<ShareRecord>, StoreError> {
        Ok(self
            .inner
            .read()
            .shares
            .values()
            .filter(|s| s.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn shares_for_target(&self, target: UserId) -> Result<Vec<ShareRecord>, StoreError> {
        Ok(self
            .inner
            .read()
            .shares
            .values()
            .filter(|s| s.target_id == target)
            .cloned()
            .collect())
    }

    async fn delete_share(&self, id: ShareId) -> Result<(), StoreError> {
        self.inner
            .write()
            .shares
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("share {id}")))
    }
}

/// In-memory ciphertext store: bucket -> key -> bytes.
#[derive(Debug, Clone, Default)]
pub struct MemoryCiphertextStore {
    buckets: Arc<RwLock<HashMap<String, HashMap<String, Vec<u8>>>>>,
}

impl MemoryCiphertextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in `bucket`.
    pub fn len(&self, bucket: &str) -> usize {
        self.buckets.read().get(bucket).map_or(0, HashMap::len)
    }
}

#[async_trait]
impl CiphertextStore for MemoryCiphertextStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        self.buckets
            .read()
            .get(bucket)
            .and_then(|entries| entries.get(key))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("{bucket}/{key}")))
    }

    async fn set(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<(), StoreError> {
        self.buckets
            .write()
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), data);
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        let mut buckets = self.buckets.write();
        let entries = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NotFound(format!("bucket {bucket}")))?;
        entries
            .remove(key)
            .ok_or_else(|| StoreError::NotFound(format!("{bucket}/{key}")))?;
        if entries.is_empty() {
            buckets.remove(bucket);
        }
        Ok(())
    }

    async fn purge(&self, bucket: &str) -> Result<(), StoreError> {
        self.buckets
            .write()
            .remove(bucket)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("bucket {bucket}")))
    }
}
