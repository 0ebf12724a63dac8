use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::context::CancelHandle;
use crate::share::{NewShareRecord, ShareRecord};
use crate::store::{CiphertextStore, MetadataStore, StoreError};
use crate::types::{NewSecret, NewUser, SecretId, SecretMeta, ShareId, User, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataOp {
    CreateUser,
    RestoreUser,
    UserByHandle,
    UserById,
    ListUsers,
    UpdateUser,
    DeleteUser,
    CreateSecret,
    RestoreSecret,
    Secret,
    ListSecrets,
    DeleteSecret,
    CreateShare,
    RestoreShare,
    SharesForSecret,
    SharesByOwner,
    SharesForTarget,
    DeleteShare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CiphertextOp {
    Get,
    Set,
    Delete,
    Purge,
}

/// Per-operation call counters, armed failures and armed cancellations.
#[derive(Debug)]
struct Faults<Op> {
    inner: Mutex<FaultsInner<Op>>,
}

#[derive(Debug)]
struct FaultsInner<Op> {
    calls: HashMap<Op, usize>,
    /// Calls left before the armed failure fires
    countdown: HashMap<Op, usize>,
    always: Vec<Op>,
    /// Calls left before the handle is tripped, counted on completion
    cancels: HashMap<Op, (usize, CancelHandle)>,
}

impl<Op: Copy + Eq + Hash + Debug> Faults<Op> {
    fn new() -> Self {
        Self {
            inner: Mutex::new(FaultsInner {
                calls: HashMap::new(),
                countdown: HashMap::new(),
                always: Vec::new(),
                cancels: HashMap::new(),
            }),
        }
    }

    fn fail_nth(&self, op: Op, n: usize) {
        self.inner.lock().countdown.insert(op, n.max(1));
    }

    fn fail_always(&self, op: Op) {
        self.inner.lock().always.push(op);
    }

    fn cancel_after_nth(&self, op: Op, n: usize, handle: CancelHandle) {
        self.inner.lock().cancels.insert(op, (n.max(1), handle));
    }

    fn heal(&self) {
        let mut inner = self.inner.lock();
        inner.countdown.clear();
        inner.always.clear();
        inner.cancels.clear();
    }

    fn calls(&self, op: Op) -> usize {
        self.inner.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Count a call to `op` and decide whether it fails.
    fn enter(&self, op: Op) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        *inner.calls.entry(op).or_default() += 1;

        let mut fire = inner.always.contains(&op);
        if let Some(left) = inner.countdown.get_mut(&op) {
            *left -= 1;
            if *left == 0 {
                inner.countdown.remove(&op);
                fire = true;
            }
        }

        if fire {
            tracing::debug!("injecting failure into {:?}", op);
            return Err(StoreError::Backend(anyhow::anyhow!(
                "injected failure in {op:?}"
            )));
        }
        Ok(())
    }

    /// Trip the armed cancel handle once its countdown for `op` runs out.
    fn exit(&self, op: Op) {
        let mut inner = self.inner.lock();
        let Some((left, _)) = inner.cancels.get_mut(&op) else {
            return;
        };
        *left -= 1;
        if *left == 0 {
            if let Some((_, handle)) = inner.cancels.remove(&op) {
                tracing::debug!("cancelling after {:?}", op);
                handle.cancel();
            }
        }
    }

    async fn run<T>(
        &self,
        op: Op,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        self.enter(op)?;
        let result = call.await;
        self.exit(op);
        result
    }
}

/// Wraps a metadata store and fails chosen calls with a backend error.
///
/// A failed call never reaches the wrapped store.
#[derive(Debug, Clone)]
pub struct FaultyMetadataStore {
    inner: Arc<dyn MetadataStore>,
    faults: Arc<Faults<MetadataOp>>,
}

impl FaultyMetadataStore {
    pub fn new(inner: Arc<dyn MetadataStore>) -> Self {
        Self {
            inner,
            faults: Arc::new(Faults::new()),
        }
    }

    /// Fail the `n`th call of `op` made from now on (1-based).
    pub fn fail_nth(&self, op: MetadataOp, n: usize) {
        self.faults.fail_nth(op, n);
    }

    /// Cancel `handle` once the `n`th call of `op` made from now on has
    /// reached the wrapped store (1-based). The call itself still succeeds.
    pub fn cancel_after_nth(&self, op: MetadataOp, n: usize, handle: CancelHandle) {
        self.faults.cancel_after_nth(op, n, handle);
    }

    pub fn fail_always(&self, op: MetadataOp) {
        self.faults.fail_always(op);
    }

    pub fn heal(&self) {
        self.faults.heal();
    }

    /// Calls made to `op` so far, failed ones included.
    pub fn calls(&self, op: MetadataOp) -> usize {
        self.faults.calls(op)
    }
}

#[async_trait]
impl MetadataStore for FaultyMetadataStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.faults.run(MetadataOp::CreateUser, self.inner.create_user(user)).await
    }

    async fn restore_user(&self, user: &User) -> Result<(), StoreError> {
        self.faults.run(MetadataOp::RestoreUser, self.inner.restore_user(user)).await
    }

    async fn user_by_handle(&self, handle: &str) -> Result<User, StoreError> {
        self.faults.run(MetadataOp::UserByHandle, self.inner.user_by_handle(handle)).await
    }

    async fn user_by_id(&self, id: UserId) -> Result<User, StoreError> {
        self.faults.run(MetadataOp::UserById, self.inner.user_by_id(id)).await
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        self.faults.run(MetadataOp::ListUsers, self.inner.list_users()).await
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        self.faults.run(MetadataOp::UpdateUser, self.inner.update_user(user)).await
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StoreError> {
        self.faults.run(MetadataOp::DeleteUser, self.inner.delete_user(id)).await
    }

    async fn create_secret(&self, secret: NewSecret) -> Result<SecretMeta, StoreError> {
        self.faults.run(MetadataOp::CreateSecret, self.inner.create_secret(secret)).await
    }

    async fn restore_secret(&self, secret: &SecretMeta) -> Result<(), StoreError> {
        self.faults.run(MetadataOp::RestoreSecret, self.inner.restore_secret(secret)).await
    }

    async fn secret(&self, owner: UserId, key: &str) -> Result<SecretMeta, StoreError> {
        self.faults.run(MetadataOp::Secret, self.inner.secret(owner, key)).await
    }

    async fn list_secrets(&self, owner: UserId) -> Result<Vec<SecretMeta>, StoreError> {
        self.faults.run(MetadataOp::ListSecrets, self.inner.list_secrets(owner)).await
    }

    async fn delete_secret(&self, id: SecretId) -> Result<(), StoreError> {
        self.faults.run(MetadataOp::DeleteSecret, self.inner.delete_secret(id)).await
    }

    async fn create_share(&self, share: NewShareRecord) -> Result<ShareRecord, StoreError> {
        self.faults.run(MetadataOp::CreateShare, self.inner.create_share(share)).await
    }

    async fn restore_share(&self, share: &ShareRecord) -> Result<(), StoreError> {
        self.faults.run(MetadataOp::RestoreShare, self.inner.restore_share(share)).await
    }

    async fn shares_for_secret(&self, secret: SecretId) -> Result<Vec<ShareRecord>, StoreError> {
        self.faults.run(MetadataOp::SharesForSecret, self.inner.shares_for_secret(secret)).await
    }

    async fn shares_by_owner(&self, owner: UserId) -> Result<Vec<ShareRecord>, StoreError> {
        self.faults.run(MetadataOp::SharesByOwner, self.inner.shares_by_owner(owner)).await
    }

    async fn shares_for_target(&self, target: UserId) -> Result<Vec<ShareRecord>, StoreError> {
        self.faults.run(MetadataOp::SharesForTarget, self.inner.shares_for_target(target)).await
    }

    async fn delete_share(&self, id: ShareId) -> Result<(), StoreError> {
        self.faults.run(MetadataOp::DeleteShare, self.inner.delete_share(id)).await
    }
}

/// Wraps a ciphertext store and fails chosen calls with a backend error, or
/// cancels a context once a chosen call has gone through.
#[derive(Debug, Clone)]
pub struct FaultyCiphertextStore {
    inner: Arc<dyn CiphertextStore>,
    faults: Arc<Faults<CiphertextOp>>,
}

impl FaultyCiphertextStore {
    pub fn new(inner: Arc<dyn CiphertextStore>) -> Self {
        Self {
            inner,
            faults: Arc::new(Faults::new()),
        }
    }

    /// Fail the `n`th call of `op` made from now on (1-based).
    pub fn fail_nth(&self, op: CiphertextOp, n: usize) {
        self.faults.fail_nth(op, n);
    }

    /// Cancel `handle` once the `n`th call of `op` made from now on has
    /// reached the wrapped store (1-based). The call itself still succeeds.
    pub fn cancel_after_nth(&self, op: CiphertextOp, n: usize, handle: CancelHandle) {
        self.faults.cancel_after_nth(op, n, handle);
    }

    pub fn fail_always(&self, op: CiphertextOp) {
        self.faults.fail_always(op);
    }

    pub fn heal(&self) {
        self.faults.heal();
    }

    pub fn calls(&self, op: CiphertextOp) -> usize {
        self.faults.calls(op)
    }
}

#[async_trait]
impl CiphertextStore for FaultyCiphertextStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        self.faults.run(CiphertextOp::Get, self.inner.get(bucket, key)).await
    }

    async fn set(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<(), StoreError> {
        self.faults.run(CiphertextOp::Set, self.inner.set(bucket, key, data)).await
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.faults.run(CiphertextOp::Delete, self.inner.delete(bucket, key)).await
    }

    async fn purge(&self, bucket: &str) -> Result<(), StoreError> {
        self.faults.run(CiphertextOp::Purge, self.inner.purge(bucket)).await
    }
}
