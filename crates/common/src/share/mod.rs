//! # Shares
//!
//! A share grants read-only access to one secret to one or more target users
//! until an optional deadline.
//!
//! Shares exist in two shapes:
//!
//! - A **logical share** ([`Share`]): owner, secret key, deadline and a set of
//!   targets. This is what callers create and list.
//! - A **relation** ([`Relation`]): one (owner, key, target, deadline) row per
//!   target. This is what the metadata store holds, as a [`ShareRecord`].
//!
//! The [`resolver`] converts between the two and decides what has expired.
//!
//! ## Expiry
//!
//! Expired relations are never served. There is no background sweep: the
//! first read path that encounters an expired relation deletes it before
//! answering.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::error::{Result, VaultError};
use crate::types::{SecretId, ShareId, UserId};

pub mod resolver;

/// Lifetime of a share created without an explicit expiry.
pub const DEFAULT_SHARE_TTL: Duration = Duration::days(30);

/// One share relation: a single target's access to one secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relation {
    /// Handle of the secret's owner
    pub owner: String,
    /// The owner's secret key
    pub key: String,
    /// Handle of the user granted access
    pub target: String,
    /// `None` means open-ended
    pub until: Option<OffsetDateTime>,
}

impl Relation {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        matches!(self.until, Some(until) if until <= now)
    }
}

impl AsRef<Relation> for Relation {
    fn as_ref(&self) -> &Relation {
        self
    }
}

/// A relation as stored in the metadata store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareRecord {
    pub id: ShareId,
    pub secret_id: SecretId,
    pub owner_id: UserId,
    pub target_id: UserId,
    pub created_at: OffsetDateTime,
    pub relation: Relation,
}

impl AsRef<Relation> for ShareRecord {
    fn as_ref(&self) -> &Relation {
        &self.relation
    }
}

/// Input for storing a relation; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewShareRecord {
    pub secret_id: SecretId,
    pub owner_id: UserId,
    pub target_id: UserId,
    pub created_at: OffsetDateTime,
    pub relation: Relation,
}

/// A logical share: every target sharing the same owner, key and deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub owner: String,
    pub key: String,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub until: Option<OffsetDateTime>,
    pub targets: Vec<String>,
}

/// When a new share stops being readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expiry {
    /// [`DEFAULT_SHARE_TTL`] from the moment the owner creates the share
    #[default]
    Default,
    /// A relative lifetime from creation
    For(Duration),
    /// An absolute deadline. A deadline in the past is accepted; the relation
    /// is reaped by the first read that sees it.
    Until(OffsetDateTime),
    /// Open-ended
    Never,
}

impl Expiry {
    /// The absolute deadline at `now`, or `InvalidInput` when it falls
    /// outside the representable calendar.
    pub fn resolve(&self, now: OffsetDateTime) -> Result<Option<OffsetDateTime>> {
        let offset = |duration: Duration| {
            now.checked_add(duration)
                .map(Some)
                .ok_or_else(|| VaultError::InvalidInput("share expiry is out of range".into()))
        };
        match self {
            Expiry::Default => offset(DEFAULT_SHARE_TTL),
            Expiry::For(duration) => offset(*duration),
            Expiry::Until(at) => Ok(Some(*at)),
            Expiry::Never => Ok(None),
        }
    }
}

/// A request to share one of the caller's secrets.
#[derive(Debug, Clone)]
pub struct ShareRequest {
    pub key: String,
    pub targets: Vec<String>,
    pub expiry: Expiry,
}

impl ShareRequest {
    pub fn new(key: impl Into<String>, targets: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            key: key.into(),
            targets: targets.into_iter().map(Into::into).collect(),
            expiry: Expiry::Default,
        }
    }

    pub fn expiring(mut self, expiry: Expiry) -> Self {
        self.expiry = expiry;
        self
    }

    /// The logical share this request describes for `owner` at `now`.
    pub fn into_share(self, owner: &str, now: OffsetDateTime) -> Result<Share> {
        let until = self.expiry.resolve(now)?.map(crate::clock::truncate);
        Ok(Share {
            owner: owner.to_string(),
            key: self.key,
            until,
            targets: self.targets,
        })
    }
}
