//! Test harness for driving the vault in-process
//!
//! Everything here runs against the in-memory stores. The fault-injecting
//! wrappers fail a chosen call of a chosen operation so tests can land a
//! failure at an exact step of a lifecycle and check what the unwind left
//! behind.
//!
//! # Example
//!
//! ```rust,ignore
//! use common::testkit::{CiphertextOp, TestVault};
//!
//! #[tokio::test]
//! async fn test_overwrite_rolls_back() {
//!     let tv = TestVault::new();
//!     let alice = tv.user("alice").await;
//!     tv.create_secret(&tv.ctx(), &alice, "db-pass", "v1").await.unwrap();
//!
//!     tv.ciphertext.fail_nth(CiphertextOp::Set, 1);
//!     assert!(tv.create_secret(&tv.ctx(), &alice, "db-pass", "v2").await.is_err());
//!     assert_eq!(tv.read_secret(&tv.ctx(), &alice, "db-pass").await.unwrap().value, "v1");
//! }
//! ```

mod clock;
mod faulty;

use std::ops::Deref;
use std::sync::Arc;

pub use clock::ManualClock;
pub use faulty::{CiphertextOp, FaultyCiphertextStore, FaultyMetadataStore, MetadataOp};

use crate::context::Context;
use crate::crypto::{Crypto, PasswordCost};
use crate::gate::Caller;
use crate::store::{MemoryCiphertextStore, MemoryMetadataStore};
use crate::vault::Vault;

/// A vault over memory stores, a manual clock and cheap password hashing.
///
/// Derefs to [`Vault`].
pub struct TestVault {
    pub vault: Vault,
    pub clock: Arc<ManualClock>,
    pub metadata: FaultyMetadataStore,
    pub ciphertext: FaultyCiphertextStore,
    pub memory_metadata: MemoryMetadataStore,
    pub memory_ciphertext: MemoryCiphertextStore,
}

impl Default for TestVault {
    fn default() -> Self {
        Self::new()
    }
}

impl TestVault {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::default());
        let memory_metadata = MemoryMetadataStore::new();
        let memory_ciphertext = MemoryCiphertextStore::new();
        let metadata = FaultyMetadataStore::new(Arc::new(memory_metadata.clone()));
        let ciphertext = FaultyCiphertextStore::new(Arc::new(memory_ciphertext.clone()));

        let crypto = Arc::new(Crypto::new(PasswordCost::insecure_fast()));
        let signing_key = crypto.new_signing_key();
        let vault = Vault::new(
            Arc::new(metadata.clone()),
            Arc::new(ciphertext.clone()),
            crypto,
            &signing_key,
            clock.clone(),
        );

        Self {
            vault,
            clock,
            metadata,
            ciphertext,
            memory_metadata,
            memory_ciphertext,
        }
    }

    pub fn ctx(&self) -> Context {
        Context::background()
    }

    /// The password every [`TestVault::user`] registers with.
    pub fn password_for(handle: &str) -> String {
        format!("{handle}-password")
    }

    /// Register `handle`, log in, and return the bound caller.
    ///
    /// # Panics
    ///
    /// Panics if registration or login fails.
    pub async fn user(&self, handle: &str) -> Caller {
        let ctx = self.ctx();
        let password = Self::password_for(handle);
        self.vault
            .register(&ctx, handle, &handle.to_uppercase(), &password)
            .await
            .expect("register test user");
        let session = self
            .vault
            .login(&ctx, handle, &password)
            .await
            .expect("log in test user");
        self.vault
            .authenticate(&session.token)
            .expect("authenticate test user")
    }
}

impl Deref for TestVault {
    type Target = Vault;

    fn deref(&self) -> &Vault {
        &self.vault
    }
}
