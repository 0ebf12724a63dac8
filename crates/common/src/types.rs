//! Records held by the metadata store and the views handed to callers.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub type UserId = i64;
pub type SecretId = i64;
pub type ShareId = i64;

/// A user record. Carries the password verifier, so it never leaves the core
/// as-is; hand out [`Profile`] or [`Identity`] instead.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    /// Immutable once set.
    pub handle: String,
    pub name: String,
    pub salt: Vec<u8>,
    pub password_hash: Vec<u8>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("handle", &self.handle)
            .field("name", &self.name)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            handle: self.handle.clone(),
            name: self.name.clone(),
        }
    }

    pub fn profile(&self) -> Profile {
        Profile {
            id: self.id,
            handle: self.handle.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Input for creating a user; the store assigns the id.
#[derive(Clone)]
pub struct NewUser {
    pub handle: String,
    pub name: String,
    pub salt: Vec<u8>,
    pub password_hash: Vec<u8>,
    pub created_at: OffsetDateTime,
}

/// The stable attributes of a user embedded in a session token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub handle: String,
    pub name: String,
}

/// Public view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub handle: String,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Metadata of a secret. The value itself lives, sealed, in the ciphertext store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretMeta {
    pub id: SecretId,
    pub owner_id: UserId,
    pub key: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewSecret {
    pub owner_id: UserId,
    pub key: String,
    pub created_at: OffsetDateTime,
}

/// A decrypted secret. Only materialized for the duration of one call.
///
/// For a secret read through a share the key is `owner:key` and the creation
/// time is cleared: it is a derived view, not the owner's record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub key: String,
    pub value: String,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub created_at: Option<OffsetDateTime>,
}
