//! Error taxonomy shared by every core component.
//!
//! Each lifecycle step returns the most specific [`VaultError`] kind it can.
//! The compensation coordinator never replaces a cause, it only wraps it
//! together with the inverse actions that failed while unwinding.

use std::fmt;

use crate::crypto::CryptoError;
use crate::store::StoreError;
use crate::token::TokenError;

/// Errors surfaced by the orchestration core.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Malformed identifier or payload. Never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Missing user, secret or share.
    #[error("not found: {0}")]
    NotFound(String),

    /// Uniqueness violation on create.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Missing, invalid or expired token, or bad credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Valid identity without ownership of the target.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Read of a share the caller is not a live target of.
    #[error("not shared: {0}")]
    NotShared(String),

    /// Underlying store failure.
    #[error("store error while {context}: {source}")]
    Store {
        context: String,
        #[source]
        source: StoreError,
    },

    /// Key material or ciphertext could not be used.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The operation's context was cancelled or ran past its deadline.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// An inverse action failed while unwinding. Consistency between the
    /// stores is no longer guaranteed and needs an operator.
    #[error("compensation failed after {cause}: {failures}")]
    CompensationFailed {
        cause: Box<VaultError>,
        failures: InverseFailures,
    },
}

impl VaultError {
    /// Maps a capability error to the most specific kind, with context.
    pub fn store(context: impl Into<String>, source: StoreError) -> Self {
        let context = context.into();
        match source {
            StoreError::NotFound(what) => VaultError::NotFound(format!("{context}: {what}")),
            StoreError::AlreadyExists(what) => {
                VaultError::AlreadyExists(format!("{context}: {what}"))
            }
            source @ StoreError::Backend(_) => VaultError::Store { context, source },
        }
    }

    /// Closure form of [`VaultError::store`] for use with `map_err`.
    pub fn store_with(context: impl Into<String>) -> impl FnOnce(StoreError) -> Self {
        let context = context.into();
        move |source| Self::store(context, source)
    }

    /// True when the failing step is known not to have mutated anything.
    pub fn is_definite_no_op(&self) -> bool {
        matches!(
            self,
            VaultError::InvalidInput(_)
                | VaultError::NotFound(_)
                | VaultError::AlreadyExists(_)
                | VaultError::Cancelled(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, VaultError::NotFound(_))
    }

    /// Short machine-readable name of the kind.
    pub fn kind(&self) -> &'static str {
        match self {
            VaultError::InvalidInput(_) => "invalid_input",
            VaultError::NotFound(_) => "not_found",
            VaultError::AlreadyExists(_) => "already_exists",
            VaultError::Unauthorized(_) => "unauthorized",
            VaultError::Forbidden(_) => "forbidden",
            VaultError::NotShared(_) => "not_shared",
            VaultError::Store { .. } => "store_error",
            VaultError::Crypto(_) => "crypto_error",
            VaultError::Cancelled(_) => "cancelled",
            VaultError::CompensationFailed { .. } => "compensation_failed",
        }
    }
}

impl From<TokenError> for VaultError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(msg) => VaultError::Crypto(CryptoError::KeyMaterial(msg)),
            other => VaultError::Unauthorized(other.to_string()),
        }
    }
}

/// Diagnostics of the inverse actions that failed during one unwind.
#[derive(Debug, Default)]
pub struct InverseFailures(pub Vec<(String, VaultError)>);

impl InverseFailures {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(label, _)| label.as_str())
    }
}

impl fmt::Display for InverseFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} inverse action(s) failed", self.0.len())?;
        for (label, err) in &self.0 {
            write!(f, "; [{label}] {err}")?;
        }
        Ok(())
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
