//! Signed, time-boxed identity tokens.
//!
//! Tokens are HS256 JWTs over the process-held [`SigningKey`]. Expiry is
//! checked here against the injected [`Clock`] rather than by the JWT library,
//! so tests can move time explicitly. A refresh is a fresh [`TokenAuthority::issue`]
//! after [`TokenAuthority::verify`] succeeded; there is no refresh-token chain.

use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::clock::Clock;
use crate::crypto::SigningKey;
use crate::types::Identity;

/// Lifetime of an issued token.
pub const TOKEN_TTL: Duration = Duration::hours(1);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token")]
    Invalid,
    #[error("token expired")]
    Expired,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    handle: String,
    name: String,
    iat: i64,
    exp: i64,
}

/// Issues and verifies tokens. The signing key is read-only once loaded.
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl TokenAuthority {
    pub fn new(key: &SigningKey, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(key.bytes()),
            decoding: DecodingKey::from_secret(key.bytes()),
            clock,
        }
    }

    /// Sign `identity` with an expiry one hour from now.
    pub fn issue(&self, identity: &Identity) -> Result<(String, OffsetDateTime), TokenError> {
        let now = crate::clock::truncate(self.clock.now());
        let expires_at = now + TOKEN_TTL;
        let claims = Claims {
            sub: identity.id.to_string(),
            handle: identity.handle.clone(),
            name: identity.name.clone(),
            iat: now.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok((token, expires_at))
    }

    /// Check signature and expiry, then return the embedded identity.
    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| {
                tracing::debug!("token rejected: {}", e);
                TokenError::Invalid
            })?
            .claims;

        if self.clock.now().unix_timestamp() > claims.exp {
            return Err(TokenError::Expired);
        }

        let id = claims.sub.parse().map_err(|_| TokenError::Invalid)?;
        Ok(Identity {
            id,
            handle: claims.handle,
            name: claims.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Crypto, PasswordCost};
    use crate::testkit::ManualClock;

    fn identity() -> Identity {
        Identity {
            id: 7,
            handle: "alice".into(),
            name: "Alice".into(),
        }
    }

    fn authority(clock: Arc<ManualClock>) -> TokenAuthority {
        let crypto = Crypto::new(PasswordCost::insecure_fast());
        TokenAuthority::new(&crypto.new_signing_key(), clock)
    }

    #[test]
    fn test_issue_then_verify() {
        let clock = Arc::new(ManualClock::default());
        let tokens = authority(clock.clone());

        let (token, expires_at) = tokens.issue(&identity()).unwrap();
        assert_eq!(expires_at, crate::clock::truncate(clock.now()) + TOKEN_TTL);
        assert_eq!(tokens.verify(&token).unwrap(), identity());
    }

    #[test]
    fn test_expiry_is_exclusive_of_the_last_second() {
        let clock = Arc::new(ManualClock::default());
        let tokens = authority(clock.clone());
        let (token, _) = tokens.issue(&identity()).unwrap();

        clock.advance(TOKEN_TTL);
        assert!(tokens.verify(&token).is_ok());

        clock.advance(Duration::seconds(1));
        assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_foreign_key_is_rejected() {
        let clock = Arc::new(ManualClock::default());
        let ours = authority(clock.clone());
        let theirs = authority(clock);

        let (token, _) = theirs.issue(&identity()).unwrap();
        assert_eq!(ours.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let clock = Arc::new(ManualClock::default());
        let tokens = authority(clock);
        let (token, _) = tokens.issue(&identity()).unwrap();

        let (other, _) = tokens
            .issue(&Identity {
                id: 8,
                handle: "mallory".into(),
                name: "Mallory".into(),
            })
            .unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged = other.split('.').nth(1).unwrap();
        let tampered = format!("{}.{}.{}", parts[0], forged, parts[2]);

        assert_eq!(tokens.verify(&tampered), Err(TokenError::Invalid));
        assert_eq!(tokens.verify("not-a-token"), Err(TokenError::Invalid));
    }
}
