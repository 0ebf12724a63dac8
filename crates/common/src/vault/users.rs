use crate::compensation::Compensator;
use crate::context::Context;
use crate::crypto::PasswordHash;
use crate::error::{Result, VaultError};
use crate::gate::{Caller, Session};
use crate::store::{user_bucket, StoreError, CIPHER_KEY_SLOT};
use crate::types::{Identity, NewUser, Profile, User};
use crate::validation;

use super::{ignore_missing, ignore_present, Vault};

fn bad_credentials() -> VaultError {
    VaultError::Unauthorized("invalid handle or password".into())
}

impl Vault {
    /// Create a user together with their cipher key.
    pub async fn register(
        &self,
        ctx: &Context,
        handle: &str,
        name: &str,
        password: &str,
    ) -> Result<Profile> {
        validation::handle(handle)?;
        validation::name(name)?;
        validation::password(password)?;

        let (salt, hash) = self.crypto.new_password_verifier(password)?;

        let new_user = NewUser {
            handle: handle.to_string(),
            name: name.to_string(),
            salt: salt.to_vec(),
            password_hash: hash.bytes().to_vec(),
            created_at: self.now(),
        };

        let mut scope = Compensator::new("register user");
        let result = self.register_in(ctx, &mut scope, new_user).await;
        let user = scope.finish(result).await?;

        tracing::info!("registered user {}", user.handle);
        Ok(user.profile())
    }

    async fn register_in(
        &self,
        ctx: &Context,
        scope: &mut Compensator,
        new_user: NewUser,
    ) -> Result<User> {
        ctx.check()?;
        let metadata = self.metadata.clone();
        let handle = new_user.handle.clone();
        let inv_handle = handle.clone();
        let user = scope
            .step(
                format!("delete new user {handle}"),
                move || async move {
                    let deleted = match metadata.user_by_handle(&inv_handle).await {
                        Ok(user) => ignore_missing(metadata.delete_user(user.id).await),
                        Err(StoreError::NotFound(_)) => Ok(()),
                        Err(e) => Err(e),
                    };
                    deleted.map_err(VaultError::store_with("deleting new user"))
                },
                async {
                    self.metadata
                        .create_user(new_user)
                        .await
                        .map_err(VaultError::store_with("creating user"))
                },
            )
            .await?;

        let cipher_key = self.crypto.new_user_key();
        let bucket = user_bucket(user.id);
        ctx.check()?;
        let ciphertext = self.ciphertext.clone();
        let inv_bucket = bucket.clone();
        scope
            .step(
                format!("purge cipher key of {handle}"),
                move || async move {
                    ignore_missing(ciphertext.purge(&inv_bucket).await)
                        .map_err(VaultError::store_with("purging new bucket"))
                },
                async {
                    self.ciphertext
                        .set(&bucket, CIPHER_KEY_SLOT, cipher_key.bytes().to_vec())
                        .await
                        .map_err(VaultError::store_with("storing cipher key"))
                },
            )
            .await?;

        Ok(user)
    }

    /// Check credentials and issue a session.
    ///
    /// An unknown handle and a wrong password fail the same way.
    pub async fn login(&self, ctx: &Context, handle: &str, password: &str) -> Result<Session> {
        ctx.check()?;
        let user = match self.metadata.user_by_handle(handle).await {
            Ok(user) => user,
            Err(StoreError::NotFound(_)) => return Err(bad_credentials()),
            Err(e) => return Err(VaultError::store("loading user", e)),
        };

        let hash = PasswordHash::from_slice(&user.password_hash)?;
        if !self.crypto.verify_password(password, &user.salt, &hash) {
            tracing::debug!("rejected login for {}", handle);
            return Err(bad_credentials());
        }

        tracing::debug!("{} logged in", handle);
        self.issue_session(user.identity())
    }

    /// Tokens are stateless: the client discards its copy.
    pub fn logout(&self, caller: &Caller) {
        tracing::debug!("{} logged out", caller.handle());
    }

    /// Replace the caller's password after checking the current one.
    pub async fn change_password(
        &self,
        ctx: &Context,
        caller: &Caller,
        current: &str,
        new: &str,
    ) -> Result<Profile> {
        validation::password(new)?;

        let mut user = self.load_caller(ctx, caller).await?;
        let hash = PasswordHash::from_slice(&user.password_hash)?;
        if !self.crypto.verify_password(current, &user.salt, &hash) {
            return Err(VaultError::Unauthorized("current password does not match".into()));
        }

        let (salt, hash) = self.crypto.new_password_verifier(new)?;
        user.salt = salt.to_vec();
        user.password_hash = hash.bytes().to_vec();
        user.updated_at = self.now();

        ctx.check()?;
        self.metadata
            .update_user(&user)
            .await
            .map_err(VaultError::store_with("updating password"))?;

        tracing::info!("{} changed their password", user.handle);
        Ok(user.profile())
    }

    /// Verify `token`, reload its user, and issue a fresh session.
    pub async fn refresh(&self, ctx: &Context, token: &str) -> Result<Session> {
        let caller = self.authenticate(token)?;
        let user = match self.load_caller(ctx, &caller).await {
            Err(e) if e.is_not_found() => {
                return Err(VaultError::Unauthorized("user no longer exists".into()))
            }
            other => other?,
        };
        self.issue_session(user.identity())
    }

    pub fn validate(&self, token: &str) -> Result<Identity> {
        Ok(self.authenticate(token)?.identity().clone())
    }

    pub async fn get_user(&self, ctx: &Context, _caller: &Caller, handle: &str) -> Result<Profile> {
        validation::handle(handle)?;
        ctx.check()?;
        let user = self
            .metadata
            .user_by_handle(handle)
            .await
            .map_err(VaultError::store_with("loading user"))?;
        Ok(user.profile())
    }

    pub async fn list_users(&self, ctx: &Context, _caller: &Caller) -> Result<Vec<Profile>> {
        ctx.check()?;
        let users = self
            .metadata
            .list_users()
            .await
            .map_err(VaultError::store_with("listing users"))?;
        Ok(users.iter().map(User::profile).collect())
    }

    /// Change the caller's display name.
    pub async fn update_user(
        &self,
        ctx: &Context,
        caller: &Caller,
        handle: &str,
        name: &str,
    ) -> Result<Profile> {
        caller.ensure_self(handle)?;
        validation::name(name)?;

        let mut user = self.load_caller(ctx, caller).await?;
        user.name = name.to_string();
        user.updated_at = self.now();

        ctx.check()?;
        self.metadata
            .update_user(&user)
            .await
            .map_err(VaultError::store_with("updating user"))?;
        Ok(user.profile())
    }

    /// Delete the caller and everything they own.
    ///
    /// Inbound shares go first, then every owned secret with its shares, then
    /// the cipher key, and the user record last. All of it is one
    /// compensation scope.
    pub async fn delete_user(&self, ctx: &Context, caller: &Caller, handle: &str) -> Result<()> {
        caller.ensure_self(handle)?;
        let user = self.load_caller(ctx, caller).await?;

        let mut scope = Compensator::new("delete user");
        let result = self.delete_user_in(ctx, &mut scope, &user).await;
        scope.finish(result).await?;

        tracing::info!("deleted user {}", user.handle);
        Ok(())
    }

    async fn delete_user_in(
        &self,
        ctx: &Context,
        scope: &mut Compensator,
        user: &User,
    ) -> Result<()> {
        ctx.check()?;
        let inbound = self
            .metadata
            .shares_for_target(user.id)
            .await
            .map_err(VaultError::store_with("loading received shares"))?;
        for record in inbound {
            self.remove_share_in(ctx, scope, record).await?;
        }

        ctx.check()?;
        let secrets = self
            .metadata
            .list_secrets(user.id)
            .await
            .map_err(VaultError::store_with("listing secrets"))?;
        for meta in &secrets {
            self.remove_secret_in(ctx, scope, meta).await?;
        }

        let bucket = user_bucket(user.id);
        ctx.check()?;
        let cipher_key = match self.ciphertext.get(&bucket, CIPHER_KEY_SLOT).await {
            Ok(bytes) => Some(bytes),
            Err(StoreError::NotFound(_)) => None,
            Err(e) => return Err(VaultError::store("loading cipher key", e)),
        };
        if let Some(bytes) = cipher_key {
            ctx.check()?;
            let ciphertext = self.ciphertext.clone();
            let inv_bucket = bucket.clone();
            let purged = scope
                .step(
                    format!("restore cipher key of {}", user.handle),
                    move || async move {
                        ciphertext
                            .set(&inv_bucket, CIPHER_KEY_SLOT, bytes)
                            .await
                            .map_err(VaultError::store_with("restoring cipher key"))
                    },
                    async {
                        self.ciphertext
                            .purge(&bucket)
                            .await
                            .map_err(VaultError::store_with("purging bucket"))
                    },
                )
                .await;
            match purged {
                Err(e) if e.is_not_found() => {}
                other => other?,
            }
        }

        ctx.check()?;
        let metadata = self.metadata.clone();
        let restored = user.clone();
        scope
            .step(
                format!("restore user {}", user.handle),
                move || async move {
                    ignore_present(metadata.restore_user(&restored).await)
                        .map_err(VaultError::store_with("restoring user"))
                },
                async {
                    self.metadata
                        .delete_user(user.id)
                        .await
                        .map_err(VaultError::store_with("deleting user"))
                },
            )
            .await
    }

    async fn load_caller(&self, ctx: &Context, caller: &Caller) -> Result<User> {
        ctx.check()?;
        self.metadata
            .user_by_id(caller.id())
            .await
            .map_err(VaultError::store_with("loading user"))
    }

    fn issue_session(&self, identity: Identity) -> Result<Session> {
        let (token, expires_at) = self.tokens.issue(&identity)?;
        Ok(Session {
            token,
            expires_at,
            identity,
        })
    }
}
