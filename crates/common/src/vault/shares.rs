use std::collections::HashSet;

use crate::compensation::Compensator;
use crate::context::Context;
use crate::error::{Result, VaultError};
use crate::gate::Caller;
use crate::share::{resolver, Expiry, NewShareRecord, Share, ShareRecord, ShareRequest};
use crate::store::StoreError;
use crate::types::{SecretMeta, User};
use crate::validation;

use super::{ignore_missing, ignore_present, Vault};

impl Vault {
    /// Share one of the caller's secrets with every requested target.
    ///
    /// Fails with `AlreadyExists` when any target still holds a live share of
    /// the secret; nothing is created in that case.
    pub async fn create_share(
        &self,
        ctx: &Context,
        caller: &Caller,
        request: ShareRequest,
    ) -> Result<Share> {
        validation::key(&request.key)?;
        validation::share_targets(caller.handle(), &request.targets)?;
        if let Expiry::For(duration) = request.expiry {
            validation::duration(duration)?;
        }

        let meta = self.own_secret(ctx, caller, &request.key).await?;

        let mut targets = Vec::with_capacity(request.targets.len());
        for handle in &request.targets {
            ctx.check()?;
            let user = self
                .metadata
                .user_by_handle(handle)
                .await
                .map_err(VaultError::store_with("loading share target"))?;
            targets.push(user);
        }

        let live = self.live_shares_of(ctx, &meta).await?;
        let requested: HashSet<&str> = request.targets.iter().map(String::as_str).collect();
        if let Some(existing) = live
            .iter()
            .find(|r| requested.contains(r.relation.target.as_str()))
        {
            return Err(VaultError::AlreadyExists(format!(
                "{} is already shared with {}",
                meta.key, existing.relation.target
            )));
        }

        let now = self.now();
        let share = request.into_share(caller.handle(), now)?;

        let mut scope = Compensator::new("create share");
        let result = self
            .create_relations_in(ctx, &mut scope, &meta, &share, &targets)
            .await;
        scope.finish(result).await?;

        tracing::info!(
            "{} shared {} with {} user(s)",
            share.owner,
            share.key,
            share.targets.len()
        );
        Ok(share)
    }

    async fn create_relations_in(
        &self,
        ctx: &Context,
        scope: &mut Compensator,
        meta: &SecretMeta,
        share: &Share,
        targets: &[User],
    ) -> Result<()> {
        let created_at = self.now();
        for (relation, target) in resolver::split(share).into_iter().zip(targets) {
            ctx.check()?;
            let metadata = self.metadata.clone();
            let (secret_id, target_id) = (meta.id, target.id);
            scope
                .step(
                    format!("delete share of {} with {}", meta.key, relation.target),
                    move || async move {
                        let records = metadata
                            .shares_for_secret(secret_id)
                            .await
                            .map_err(VaultError::store_with("loading shares"))?;
                        match records.into_iter().find(|r| r.target_id == target_id) {
                            Some(record) => ignore_missing(metadata.delete_share(record.id).await)
                                .map_err(VaultError::store_with("deleting new share")),
                            None => Ok(()),
                        }
                    },
                    async {
                        self.metadata
                            .create_share(NewShareRecord {
                                secret_id: meta.id,
                                owner_id: meta.owner_id,
                                target_id: target.id,
                                created_at,
                                relation,
                            })
                            .await
                            .map_err(VaultError::store_with("creating share"))
                    },
                )
                .await?;
        }
        Ok(())
    }

    /// Delete one share relation, registering its restore.
    ///
    /// A relation that is already gone is skipped.
    pub(super) async fn remove_share_in(
        &self,
        ctx: &Context,
        scope: &mut Compensator,
        record: ShareRecord,
    ) -> Result<()> {
        ctx.check()?;
        let id = record.id;
        let label = format!(
            "restore share of {} with {}",
            record.relation.key, record.relation.target
        );
        let metadata = self.metadata.clone();
        let removed = scope
            .step(
                label,
                move || async move {
                    ignore_present(metadata.restore_share(&record).await)
                        .map_err(VaultError::store_with("restoring share"))
                },
                async {
                    self.metadata
                        .delete_share(id)
                        .await
                        .map_err(VaultError::store_with("deleting share"))
                },
            )
            .await;
        match removed {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }

    /// The caller's live shares of `key`, grouped.
    pub async fn get_share(&self, ctx: &Context, caller: &Caller, key: &str) -> Result<Vec<Share>> {
        validation::key(key)?;
        let meta = self.own_secret(ctx, caller, key).await?;
        let live = self.live_shares_of(ctx, &meta).await?;
        Ok(resolver::merge(&live))
    }

    /// Every live share the caller owns, grouped.
    pub async fn list_shares(&self, ctx: &Context, caller: &Caller) -> Result<Vec<Share>> {
        ctx.check()?;
        let records = self
            .metadata
            .shares_by_owner(caller.id())
            .await
            .map_err(VaultError::store_with("loading shares"))?;
        let live = self.reap(ctx, records).await?;
        Ok(resolver::merge(&live))
    }

    /// Every live share naming the caller as a target. Each lists only the
    /// caller among its targets.
    pub async fn list_received(&self, ctx: &Context, caller: &Caller) -> Result<Vec<Share>> {
        ctx.check()?;
        let records = self
            .metadata
            .shares_for_target(caller.id())
            .await
            .map_err(VaultError::store_with("loading received shares"))?;
        let live = self.reap(ctx, records).await?;
        Ok(resolver::merge(&live))
    }

    /// Revoke `target`'s access to `key`.
    pub async fn delete_share_target(
        &self,
        ctx: &Context,
        caller: &Caller,
        key: &str,
        target: &str,
    ) -> Result<()> {
        validation::key(key)?;
        validation::handle(target)?;

        let meta = self.own_secret(ctx, caller, key).await?;
        let live = self.live_shares_of(ctx, &meta).await?;
        let record = live
            .into_iter()
            .find(|r| r.relation.target == target)
            .ok_or_else(|| VaultError::NotFound(format!("share of {key} with {target}")))?;

        ctx.check()?;
        self.metadata
            .delete_share(record.id)
            .await
            .map_err(VaultError::store_with("deleting share"))?;

        tracing::info!("{} revoked {} from {}", caller.handle(), key, target);
        Ok(())
    }

    /// Revoke every target's access to `key`.
    pub async fn purge_share(&self, ctx: &Context, caller: &Caller, key: &str) -> Result<()> {
        validation::key(key)?;

        let meta = self.own_secret(ctx, caller, key).await?;
        let live = self.live_shares_of(ctx, &meta).await?;
        if live.is_empty() {
            return Err(VaultError::NotFound(format!("shares of {key}")));
        }

        let count = live.len();
        let mut scope = Compensator::new("purge share");
        let mut result = Ok(());
        for record in live {
            result = self.remove_share_in(ctx, &mut scope, record).await;
            if result.is_err() {
                break;
            }
        }
        scope.finish(result).await?;

        tracing::info!("{} purged {} share(s) of {}", caller.handle(), count, key);
        Ok(())
    }

    async fn own_secret(&self, ctx: &Context, caller: &Caller, key: &str) -> Result<SecretMeta> {
        ctx.check()?;
        self.metadata
            .secret(caller.id(), key)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => VaultError::NotFound(format!("secret {key}")),
                e => VaultError::store("loading secret", e),
            })
    }

    async fn live_shares_of(&self, ctx: &Context, meta: &SecretMeta) -> Result<Vec<ShareRecord>> {
        ctx.check()?;
        let records = self
            .metadata
            .shares_for_secret(meta.id)
            .await
            .map_err(VaultError::store_with("loading shares"))?;
        self.reap(ctx, records).await
    }
}
