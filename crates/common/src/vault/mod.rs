//! # Vault
//!
//! The lifecycle manager. Every operation a transport exposes is a method on
//! [`Vault`], which drives the two store capabilities, the crypto provider and
//! the token authority.
//!
//! Mutations touching more than one record run inside a
//! [`Compensator`](crate::compensation::Compensator) scope; the
//! [`Context`](crate::context::Context) is checked before every forward store
//! call and a tripped context unwinds like any other failure.
//!
//! Plaintext values and cipher keys live only for the duration of one call.

use std::sync::Arc;

use time::OffsetDateTime;

use crate::clock::{self, Clock};
use crate::context::Context;
use crate::crypto::{CipherKey, Crypto, CryptoError, SigningKey};
use crate::error::{Result, VaultError};
use crate::gate::{Caller, Gate};
use crate::share::{resolver, ShareRecord};
use crate::store::{user_bucket, CiphertextStore, MetadataStore, StoreError, CIPHER_KEY_SLOT};
use crate::token::TokenAuthority;
use crate::types::UserId;

mod secrets;
mod shares;
mod users;

#[derive(Debug, Clone)]
pub struct Vault {
    metadata: Arc<dyn MetadataStore>,
    ciphertext: Arc<dyn CiphertextStore>,
    crypto: Arc<Crypto>,
    tokens: Arc<TokenAuthority>,
    gate: Gate,
    clock: Arc<dyn Clock>,
}

impl Vault {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        ciphertext: Arc<dyn CiphertextStore>,
        crypto: Arc<Crypto>,
        signing_key: &SigningKey,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let tokens = Arc::new(TokenAuthority::new(signing_key, clock.clone()));
        Self {
            metadata,
            ciphertext,
            crypto,
            gate: Gate::new(tokens.clone()),
            tokens,
            clock,
        }
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// Shorthand for [`Gate::authenticate`].
    pub fn authenticate(&self, token: &str) -> Result<Caller> {
        self.gate.authenticate(token)
    }

    fn now(&self) -> OffsetDateTime {
        clock::truncate(self.clock.now())
    }

    /// Load `owner`'s cipher key from the reserved slot of their bucket.
    async fn user_key(&self, ctx: &Context, owner: UserId) -> Result<CipherKey> {
        ctx.check()?;
        let bytes = self
            .ciphertext
            .get(&user_bucket(owner), CIPHER_KEY_SLOT)
            .await
            .map_err(VaultError::store_with("loading cipher key"))?;
        Ok(CipherKey::from_slice(&bytes)?)
    }

    fn open(&self, key: &CipherKey, sealed: &[u8]) -> Result<String> {
        let plaintext = self.crypto.decrypt(key, sealed)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidPlaintext.into())
    }

    /// Decrypt `owner`'s secret `key`.
    async fn open_secret(&self, ctx: &Context, owner: UserId, key: &str) -> Result<String> {
        let cipher_key = self.user_key(ctx, owner).await?;
        ctx.check()?;
        let sealed = self
            .ciphertext
            .get(&user_bucket(owner), key)
            .await
            .map_err(VaultError::store_with("loading ciphertext"))?;
        self.open(&cipher_key, &sealed)
    }

    /// Delete every expired record and return the live ones.
    ///
    /// Runs on every read path that touches share relations, before anything
    /// is returned to a caller.
    async fn reap(&self, ctx: &Context, records: Vec<ShareRecord>) -> Result<Vec<ShareRecord>> {
        let (live, expired) = resolver::reap_expired(records, self.now());
        for record in expired {
            ctx.check()?;
            match self.metadata.delete_share(record.id).await {
                Ok(()) | Err(StoreError::NotFound(_)) => {}
                Err(e) => return Err(VaultError::store("reaping expired share", e)),
            }
            tracing::info!(
                "reaped expired share of {}:{} with {}",
                record.relation.owner,
                record.relation.key,
                record.relation.target
            );
        }
        Ok(live)
    }
}

type StoreResult = std::result::Result<(), StoreError>;

/// Treat an absent record as already removed.
fn ignore_missing(result: StoreResult) -> StoreResult {
    match result {
        Err(StoreError::NotFound(_)) => Ok(()),
        other => other,
    }
}

/// Treat a record that is still in place as already restored.
fn ignore_present(result: StoreResult) -> StoreResult {
    match result {
        Err(StoreError::AlreadyExists(_)) => Ok(()),
        other => other,
    }
}
