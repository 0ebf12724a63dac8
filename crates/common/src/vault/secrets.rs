use crate::compensation::Compensator;
use crate::context::Context;
use crate::error::{Result, VaultError};
use crate::gate::Caller;
use crate::store::{user_bucket, StoreError};
use crate::types::{NewSecret, Secret, SecretMeta, User};
use crate::validation;

use super::{ignore_missing, ignore_present, Vault};

/// Split `owner:key` when it names somebody else's secret.
///
/// The prefix must be a well-formed handle other than the caller's own;
/// anything else is read as one of the caller's own keys.
pub(crate) fn shared_reference<'a>(caller: &str, key: &'a str) -> Option<(&'a str, &'a str)> {
    let (owner, inner) = key.split_once(':')?;
    (validation::is_handle(owner) && owner != caller).then_some((owner, inner))
}

impl Vault {
    /// Create `key`, or atomically replace it if it already exists.
    ///
    /// Replacing drops every share of the previous value.
    pub async fn create_secret(
        &self,
        ctx: &Context,
        caller: &Caller,
        key: &str,
        value: &str,
    ) -> Result<Secret> {
        validation::key(key)?;
        validation::value(value)?;
        if let Some((owner, _)) = shared_reference(caller.handle(), key) {
            return Err(VaultError::InvalidInput(format!(
                "{key} would read as a secret shared by {owner}"
            )));
        }

        ctx.check()?;
        let owner = self
            .metadata
            .user_by_id(caller.id())
            .await
            .map_err(VaultError::store_with("loading owner"))?;

        let mut scope = Compensator::new("create secret");
        let result = self.create_secret_in(ctx, &mut scope, &owner, key, value).await;
        let meta = scope.finish(result).await?;

        tracing::debug!("{} stored secret {}", owner.handle, key);
        Ok(Secret {
            key: meta.key,
            value: value.to_string(),
            created_at: Some(meta.created_at),
        })
    }

    async fn create_secret_in(
        &self,
        ctx: &Context,
        scope: &mut Compensator,
        owner: &User,
        key: &str,
        value: &str,
    ) -> Result<SecretMeta> {
        ctx.check()?;
        match self.metadata.secret(owner.id, key).await {
            Ok(prior) => {
                tracing::debug!("{} overwriting secret {}", owner.handle, key);
                self.remove_secret_in(ctx, scope, &prior).await?;
            }
            Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(VaultError::store("loading secret", e)),
        }

        let cipher_key = self.user_key(ctx, owner.id).await?;
        let sealed = self.crypto.encrypt(&cipher_key, value.as_bytes())?;
        drop(cipher_key);

        let bucket = user_bucket(owner.id);
        ctx.check()?;
        let ciphertext = self.ciphertext.clone();
        let (inv_bucket, inv_key) = (bucket.clone(), key.to_string());
        scope
            .step(
                format!("delete ciphertext {key}"),
                move || async move {
                    ignore_missing(ciphertext.delete(&inv_bucket, &inv_key).await)
                        .map_err(VaultError::store_with("deleting new ciphertext"))
                },
                async {
                    self.ciphertext
                        .set(&bucket, key, sealed)
                        .await
                        .map_err(VaultError::store_with("writing ciphertext"))
                },
            )
            .await?;

        ctx.check()?;
        let metadata = self.metadata.clone();
        let (owner_id, inv_key) = (owner.id, key.to_string());
        scope
            .step(
                format!("delete secret metadata {key}"),
                move || async move {
                    let deleted = match metadata.secret(owner_id, &inv_key).await {
                        Ok(meta) => ignore_missing(metadata.delete_secret(meta.id).await),
                        Err(StoreError::NotFound(_)) => Ok(()),
                        Err(e) => Err(e),
                    };
                    deleted.map_err(VaultError::store_with("deleting new secret metadata"))
                },
                async {
                    self.metadata
                        .create_secret(NewSecret {
                            owner_id: owner.id,
                            key: key.to_string(),
                            created_at: self.now(),
                        })
                        .await
                        .map_err(VaultError::store_with("creating secret metadata"))
                },
            )
            .await
    }

    /// Remove one secret: its share relations, its ciphertext, then its
    /// metadata. Each step registers the inverse that puts it back.
    ///
    /// A missing ciphertext entry counts as already deleted.
    pub(super) async fn remove_secret_in(
        &self,
        ctx: &Context,
        scope: &mut Compensator,
        meta: &SecretMeta,
    ) -> Result<()> {
        ctx.check()?;
        let shares = self
            .metadata
            .shares_for_secret(meta.id)
            .await
            .map_err(VaultError::store_with("loading shares"))?;
        for share in shares {
            self.remove_share_in(ctx, scope, share).await?;
        }

        let bucket = user_bucket(meta.owner_id);
        ctx.check()?;
        let sealed = match self.ciphertext.get(&bucket, &meta.key).await {
            Ok(sealed) => Some(sealed),
            Err(StoreError::NotFound(_)) => None,
            Err(e) => return Err(VaultError::store("loading ciphertext", e)),
        };
        if let Some(sealed) = sealed {
            ctx.check()?;
            let ciphertext = self.ciphertext.clone();
            let (inv_bucket, inv_key) = (bucket.clone(), meta.key.clone());
            let removed = scope
                .step(
                    format!("restore ciphertext {}", meta.key),
                    move || async move {
                        ciphertext
                            .set(&inv_bucket, &inv_key, sealed)
                            .await
                            .map_err(VaultError::store_with("restoring ciphertext"))
                    },
                    async {
                        self.ciphertext
                            .delete(&bucket, &meta.key)
                            .await
                            .map_err(VaultError::store_with("deleting ciphertext"))
                    },
                )
                .await;
            match removed {
                Err(e) if e.is_not_found() => {}
                other => other?,
            }
        }

        ctx.check()?;
        let metadata = self.metadata.clone();
        let restored = meta.clone();
        scope
            .step(
                format!("restore secret metadata {}", meta.key),
                move || async move {
                    ignore_present(metadata.restore_secret(&restored).await)
                        .map_err(VaultError::store_with("restoring secret metadata"))
                },
                async {
                    self.metadata
                        .delete_secret(meta.id)
                        .await
                        .map_err(VaultError::store_with("deleting secret metadata"))
                },
            )
            .await
    }

    /// Read one of the caller's secrets, or `owner:key` shared with them.
    pub async fn read_secret(&self, ctx: &Context, caller: &Caller, key: &str) -> Result<Secret> {
        if let Some((owner, inner)) = shared_reference(caller.handle(), key) {
            return self.read_shared(ctx, caller, owner, inner).await;
        }
        validation::key(key)?;

        ctx.check()?;
        let meta = self
            .metadata
            .secret(caller.id(), key)
            .await
            .map_err(VaultError::store_with("loading secret"))?;
        let value = self.open_secret(ctx, meta.owner_id, &meta.key).await?;

        Ok(Secret {
            key: meta.key,
            value,
            created_at: Some(meta.created_at),
        })
    }

    async fn read_shared(
        &self,
        ctx: &Context,
        caller: &Caller,
        owner: &str,
        key: &str,
    ) -> Result<Secret> {
        validation::key(key)?;
        let reference = format!("{owner}:{key}");
        let not_shared = || VaultError::NotShared(reference.clone());

        ctx.check()?;
        let owner = match self.metadata.user_by_handle(owner).await {
            Ok(owner) => owner,
            Err(StoreError::NotFound(_)) => return Err(not_shared()),
            Err(e) => return Err(VaultError::store("loading owner", e)),
        };
        ctx.check()?;
        let meta = match self.metadata.secret(owner.id, key).await {
            Ok(meta) => meta,
            Err(StoreError::NotFound(_)) => return Err(not_shared()),
            Err(e) => return Err(VaultError::store("loading secret", e)),
        };

        ctx.check()?;
        let records = self
            .metadata
            .shares_for_secret(meta.id)
            .await
            .map_err(VaultError::store_with("loading shares"))?;
        let live = self.reap(ctx, records).await?;
        if !live.iter().any(|r| r.target_id == caller.id()) {
            return Err(not_shared());
        }

        let value = self.open_secret(ctx, owner.id, key).await?;
        Ok(Secret {
            key: reference,
            value,
            created_at: None,
        })
    }

    /// Every secret the caller owns, followed by every live secret shared
    /// with them. Shares whose secret has gone missing are skipped.
    pub async fn list_secrets(&self, ctx: &Context, caller: &Caller) -> Result<Vec<Secret>> {
        ctx.check()?;
        let metas = self
            .metadata
            .list_secrets(caller.id())
            .await
            .map_err(VaultError::store_with("listing secrets"))?;

        let mut secrets = Vec::with_capacity(metas.len());
        if !metas.is_empty() {
            let cipher_key = self.user_key(ctx, caller.id()).await?;
            let bucket = user_bucket(caller.id());
            for meta in metas {
                ctx.check()?;
                let sealed = self
                    .ciphertext
                    .get(&bucket, &meta.key)
                    .await
                    .map_err(VaultError::store_with("loading ciphertext"))?;
                secrets.push(Secret {
                    value: self.open(&cipher_key, &sealed)?,
                    key: meta.key,
                    created_at: Some(meta.created_at),
                });
            }
        }

        ctx.check()?;
        let records = self
            .metadata
            .shares_for_target(caller.id())
            .await
            .map_err(VaultError::store_with("loading received shares"))?;
        for record in self.reap(ctx, records).await? {
            let relation = &record.relation;
            match self.open_secret(ctx, record.owner_id, &relation.key).await {
                Ok(value) => secrets.push(Secret {
                    key: format!("{}:{}", relation.owner, relation.key),
                    value,
                    created_at: None,
                }),
                Err(e) if e.is_not_found() => {
                    tracing::debug!(
                        "skipping share of {}:{}, secret is gone",
                        relation.owner,
                        relation.key
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(secrets)
    }

    /// Delete one of the caller's secrets together with its shares.
    pub async fn delete_secret(&self, ctx: &Context, caller: &Caller, key: &str) -> Result<()> {
        validation::key(key)?;

        ctx.check()?;
        let meta = self
            .metadata
            .secret(caller.id(), key)
            .await
            .map_err(VaultError::store_with("loading secret"))?;

        let mut scope = Compensator::new("delete secret");
        let result = self.remove_secret_in(ctx, &mut scope, &meta).await;
        scope.finish(result).await?;

        tracing::debug!("{} deleted secret {}", caller.handle(), key);
        Ok(())
    }
}
