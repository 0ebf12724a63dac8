//! [`MetadataStore`] on SQLite.
//!
//! Timestamps are stored as unix seconds. Share rows only hold ids; the
//! handles and key making up a [`Relation`] are joined in on every read.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use time::OffsetDateTime;

use common::share::{NewShareRecord, Relation, ShareRecord};
use common::store::{MetadataStore, StoreError};
use common::types::{NewSecret, NewUser, SecretId, SecretMeta, ShareId, User, UserId};

use super::Database;

const SHARE_SELECT: &str = r#"
    SELECT
        s.id, s.secret_id, s.owner_id, s.target_id, s.until, s.created_at,
        sec.key AS key,
        o.handle AS owner_handle,
        t.handle AS target_handle
    FROM shares s
    JOIN secrets sec ON sec.id = s.secret_id
    JOIN users o ON o.id = s.owner_id
    JOIN users t ON t.id = s.target_id
"#;

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.into())
}

/// Uniqueness violations become `AlreadyExists` and dangling references
/// become `NotFound`.
fn insert_error(what: String) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::AlreadyExists(what),
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            StoreError::NotFound(format!("reference of {what}"))
        }
        _ => backend(e),
    }
}

fn to_unix(at: OffsetDateTime) -> i64 {
    at.unix_timestamp()
}

fn from_unix(secs: i64) -> Result<OffsetDateTime, StoreError> {
    OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|e| StoreError::Backend(anyhow::anyhow!("invalid timestamp {secs}: {e}")))
}

fn user_from_row(row: &SqliteRow) -> Result<User, StoreError> {
    Ok(User {
        id: row.try_get("id").map_err(backend)?,
        handle: row.try_get("handle").map_err(backend)?,
        name: row.try_get("name").map_err(backend)?,
        salt: row.try_get("salt").map_err(backend)?,
        password_hash: row.try_get("password_hash").map_err(backend)?,
        created_at: from_unix(row.try_get("created_at").map_err(backend)?)?,
        updated_at: from_unix(row.try_get("updated_at").map_err(backend)?)?,
    })
}

fn secret_from_row(row: &SqliteRow) -> Result<SecretMeta, StoreError> {
    Ok(SecretMeta {
        id: row.try_get("id").map_err(backend)?,
        owner_id: row.try_get("owner_id").map_err(backend)?,
        key: row.try_get("key").map_err(backend)?,
        created_at: from_unix(row.try_get("created_at").map_err(backend)?)?,
    })
}

fn share_from_row(row: &SqliteRow) -> Result<ShareRecord, StoreError> {
    let until: Option<i64> = row.try_get("until").map_err(backend)?;
    Ok(ShareRecord {
        id: row.try_get("id").map_err(backend)?,
        secret_id: row.try_get("secret_id").map_err(backend)?,
        owner_id: row.try_get("owner_id").map_err(backend)?,
        target_id: row.try_get("target_id").map_err(backend)?,
        created_at: from_unix(row.try_get("created_at").map_err(backend)?)?,
        relation: Relation {
            owner: row.try_get("owner_handle").map_err(backend)?,
            key: row.try_get("key").map_err(backend)?,
            target: row.try_get("target_handle").map_err(backend)?,
            until: until.map(from_unix).transpose()?,
        },
    })
}

impl Database {
    async fn fetch_shares(&self, filter: &str, id: i64) -> Result<Vec<ShareRecord>, StoreError> {
        let query = format!("{SHARE_SELECT} WHERE {filter} = ? ORDER BY s.id");
        let rows = sqlx::query(&query)
            .bind(id)
            .fetch_all(&**self)
            .await
            .map_err(backend)?;
        rows.iter().map(share_from_row).collect()
    }

    async fn insert_share(
        &self,
        id: Option<ShareId>,
        share: &NewShareRecord,
    ) -> Result<ShareId, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO shares (id, secret_id, owner_id, target_id, until, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(share.secret_id)
        .bind(share.owner_id)
        .bind(share.target_id)
        .bind(share.relation.until.map(to_unix))
        .bind(to_unix(share.created_at))
        .execute(&**self)
        .await
        .map_err(insert_error(format!(
            "share of {}:{} with {}",
            share.relation.owner, share.relation.key, share.relation.target
        )))?;
        Ok(result.last_insert_rowid())
    }

    async fn delete_row(&self, query: &str, id: i64, what: String) -> Result<(), StoreError> {
        let result = sqlx::query(query)
            .bind(id)
            .execute(&**self)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(what));
        }
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for Database {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (handle, name, salt, password_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.handle)
        .bind(&user.name)
        .bind(&user.salt)
        .bind(&user.password_hash)
        .bind(to_unix(user.created_at))
        .bind(to_unix(user.created_at))
        .execute(&**self)
        .await
        .map_err(insert_error(format!("user {}", user.handle)))?;

        Ok(User {
            id: result.last_insert_rowid(),
            handle: user.handle,
            name: user.name,
            salt: user.salt,
            password_hash: user.password_hash,
            created_at: user.created_at,
            updated_at: user.created_at,
        })
    }

    async fn restore_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, handle, name, salt, password_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id)
        .bind(&user.handle)
        .bind(&user.name)
        .bind(&user.salt)
        .bind(&user.password_hash)
        .bind(to_unix(user.created_at))
        .bind(to_unix(user.updated_at))
        .execute(&**self)
        .await
        .map_err(insert_error(format!("user {}", user.handle)))?;
        Ok(())
    }

    async fn user_by_handle(&self, handle: &str) -> Result<User, StoreError> {
        let row = sqlx::query("SELECT * FROM users WHERE handle = ?")
            .bind(handle)
            .fetch_optional(&**self)
            .await
            .map_err(backend)?
            .ok_or_else(|| StoreError::NotFound(format!("user {handle}")))?;
        user_from_row(&row)
    }

    async fn user_by_id(&self, id: UserId) -> Result<User, StoreError> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&**self)
            .await
            .map_err(backend)?
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        user_from_row(&row)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY id")
            .fetch_all(&**self)
            .await
            .map_err(backend)?;
        rows.iter().map(user_from_row).collect()
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = ?, salt = ?, password_hash = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.name)
        .bind(&user.salt)
        .bind(&user.password_hash)
        .bind(to_unix(user.updated_at))
        .bind(user.id)
        .execute(&**self)
        .await
        .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {}", user.id)));
        }
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StoreError> {
        self.delete_row("DELETE FROM users WHERE id = ?", id, format!("user {id}"))
            .await
    }

    async fn create_secret(&self, secret: NewSecret) -> Result<SecretMeta, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO secrets (owner_id, key, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(secret.owner_id)
        .bind(&secret.key)
        .bind(to_unix(secret.created_at))
        .execute(&**self)
        .await
        .map_err(insert_error(format!("secret {}", secret.key)))?;

        Ok(SecretMeta {
            id: result.last_insert_rowid(),
            owner_id: secret.owner_id,
            key: secret.key,
            created_at: secret.created_at,
        })
    }

    async fn restore_secret(&self, secret: &SecretMeta) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO secrets (id, owner_id, key, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(secret.id)
        .bind(secret.owner_id)
        .bind(&secret.key)
        .bind(to_unix(secret.created_at))
        .execute(&**self)
        .await
        .map_err(insert_error(format!("secret {}", secret.key)))?;
        Ok(())
    }

    async fn secret(&self, owner: UserId, key: &str) -> Result<SecretMeta, StoreError> {
        let row = sqlx::query("SELECT * FROM secrets WHERE owner_id = ? AND key = ?")
            .bind(owner)
            .bind(key)
            .fetch_optional(&**self)
            .await
            .map_err(backend)?
            .ok_or_else(|| StoreError::NotFound(format!("secret {key}")))?;
        secret_from_row(&row)
    }

    async fn list_secrets(&self, owner: UserId) -> Result<Vec<SecretMeta>, StoreError> {
        let rows = sqlx::query("SELECT * FROM secrets WHERE owner_id = ? ORDER BY id")
            .bind(owner)
            .fetch_all(&**self)
            .await
            .map_err(backend)?;
        rows.iter().map(secret_from_row).collect()
    }

    async fn delete_secret(&self, id: SecretId) -> Result<(), StoreError> {
        self.delete_row(
            "DELETE FROM secrets WHERE id = ?",
            id,
            format!("secret {id}"),
        )
        .await
    }

    async fn create_share(&self, share: NewShareRecord) -> Result<ShareRecord, StoreError> {
        let id = self.insert_share(None, &share).await?;
        Ok(ShareRecord {
            id,
            secret_id: share.secret_id,
            owner_id: share.owner_id,
            target_id: share.target_id,
            created_at: share.created_at,
            relation: share.relation,
        })
    }

    async fn restore_share(&self, share: &ShareRecord) -> Result<(), StoreError> {
        let new = NewShareRecord {
            secret_id: share.secret_id,
            owner_id: share.owner_id,
            target_id: share.target_id,
            created_at: share.created_at,
            relation: share.relation.clone(),
        };
        self.insert_share(Some(share.id), &new).await?;
        Ok(())
    }

    async fn shares_for_secret(&self, secret: SecretId) -> Result<Vec<ShareRecord>, StoreError> {
        self.fetch_shares("s.secret_id", secret).await
    }

    async fn shares_by_owner(&self, owner: UserId) -> Result<Vec<ShareRecord>, StoreError> {
        self.fetch_shares("s.owner_id", owner).await
    }

    async fn shares_for_target(&self, target: UserId) -> Result<Vec<ShareRecord>, StoreError> {
        self.fetch_shares("s.target_id", target).await
    }

    async fn delete_share(&self, id: ShareId) -> Result<(), StoreError> {
        self.delete_row("DELETE FROM shares WHERE id = ?", id, format!("share {id}"))
            .await
    }
}
