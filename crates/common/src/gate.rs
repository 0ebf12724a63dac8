//! Access control: turns a bearer token into a bound [`Caller`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{Result, VaultError};
use crate::token::TokenAuthority;
use crate::types::{Identity, UserId};

/// A verified identity bound to one request.
///
/// Only the [`Gate`] can produce one, so holding a `Caller` proves the token
/// was checked. Every vault operation except registration and login needs one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    identity: Identity,
}

impl Caller {
    pub fn id(&self) -> UserId {
        self.identity.id
    }

    pub fn handle(&self) -> &str {
        &self.identity.handle
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Only `handle` itself may mutate the user `handle`.
    pub fn ensure_self(&self, handle: &str) -> Result<()> {
        if self.identity.handle != handle {
            return Err(VaultError::Forbidden(format!(
                "{} may not modify {}",
                self.identity.handle, handle
            )));
        }
        Ok(())
    }
}

/// Result of a successful login or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub identity: Identity,
}

#[derive(Debug, Clone)]
pub struct Gate {
    tokens: Arc<TokenAuthority>,
}

impl Gate {
    pub fn new(tokens: Arc<TokenAuthority>) -> Self {
        Self { tokens }
    }

    pub fn authenticate(&self, token: &str) -> Result<Caller> {
        if token.is_empty() {
            return Err(VaultError::Unauthorized("missing token".into()));
        }
        let identity = self.tokens.verify(token)?;
        Ok(Caller { identity })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Crypto, PasswordCost};
    use crate::testkit::ManualClock;

    #[test]
    fn test_authenticate_binds_identity() {
        let crypto = Crypto::new(PasswordCost::insecure_fast());
        let tokens = Arc::new(TokenAuthority::new(
            &crypto.new_signing_key(),
            Arc::new(ManualClock::default()),
        ));
        let gate = Gate::new(tokens.clone());

        let alice = Identity {
            id: 1,
            handle: "alice".into(),
            name: "Alice".into(),
        };
        let (token, _) = tokens.issue(&alice).unwrap();
        let caller = gate.authenticate(&token).unwrap();

        assert_eq!(caller.identity(), &alice);
        assert!(caller.ensure_self("alice").is_ok());
        assert!(matches!(
            caller.ensure_self("bob"),
            Err(VaultError::Forbidden(_))
        ));
        assert!(matches!(
            gate.authenticate(""),
            Err(VaultError::Unauthorized(_))
        ));
    }
}
