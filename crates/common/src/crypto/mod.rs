//! Cryptographic primitives for Strongbox
//!
//! This module is the only place key material is created or used:
//!
//! - **Randomness**: one process-wide generator, seeded once from the OS and
//!   guarded by a mutex ([`Crypto`])
//! - **Envelope encryption**: every user owns a 256-bit [`CipherKey`]; secret
//!   values are sealed with ChaCha20-Poly1305 under that key
//! - **Password verifiers**: Argon2id over a 128-byte random salt
//! - **Token signing material**: a 256-byte [`SigningKey`] held by the token
//!   authority for the lifetime of the process
//!
//! # Ciphertext Format
//!
//! ```text
//! [ nonce: 12 bytes ][ ciphertext || poly1305 tag: len(plaintext) + 16 bytes ]
//! ```
//!
//! A fresh nonce is drawn from the shared generator for every call. The format
//! is an implementation detail, not a compatibility contract.

mod cipher_key;
mod password;
mod provider;
mod signing_key;

pub use cipher_key::{CipherKey, CIPHER_KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use password::{PasswordCost, PasswordHash, PASSWORD_HASH_SIZE};
pub use provider::{Crypto, Salt, SALT_SIZE};
pub use signing_key::{SigningKey, SIGNING_KEY_SIZE};

/// Errors that can occur while using key material
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// Ciphertext is truncated, was tampered with, or belongs to another key
    #[error("invalid ciphertext")]
    InvalidCiphertext,
    /// Decrypted bytes are not a valid secret value
    #[error("decrypted value is not valid UTF-8")]
    InvalidPlaintext,
    /// Stored key material has the wrong shape
    #[error("invalid key material: {0}")]
    KeyMaterial(String),
    /// Password hashing could not run with the configured cost
    #[error("password hashing failed: {0}")]
    PasswordHashing(String),
}
