//! Password verifiers using Argon2id

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use super::CryptoError;

/// Size of the stored password hash in bytes
pub const PASSWORD_HASH_SIZE: usize = 32;

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordCost {
    /// Memory in KiB
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl PasswordCost {
    /// The cheapest parameters Argon2 accepts. Only for tests.
    pub fn insecure_fast() -> Self {
        Self {
            memory_kib: Params::MIN_M_COST,
            iterations: Params::MIN_T_COST,
            parallelism: Params::MIN_P_COST,
        }
    }

    fn hasher(&self) -> Result<Argon2<'static>, CryptoError> {
        let params = Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(PASSWORD_HASH_SIZE),
        )
        .map_err(|e| CryptoError::PasswordHashing(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// The hash half of a password verifier; the salt is stored next to it
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash([u8; PASSWORD_HASH_SIZE]);

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

impl PasswordHash {
    pub fn derive(password: &str, salt: &[u8], cost: &PasswordCost) -> Result<Self, CryptoError> {
        let mut out = [0u8; PASSWORD_HASH_SIZE];
        cost.hasher()?
            .hash_password_into(password.as_bytes(), salt, &mut out)
            .map_err(|e| CryptoError::PasswordHashing(e.to_string()))?;
        Ok(Self(out))
    }

    pub fn from_slice(data: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; PASSWORD_HASH_SIZE] = data.try_into().map_err(|_| {
            CryptoError::KeyMaterial(format!(
                "invalid password hash size, expected {}, got {}",
                PASSWORD_HASH_SIZE,
                data.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// Constant-time comparison against a freshly derived hash
    pub fn verify(&self, password: &str, salt: &[u8], cost: &PasswordCost) -> bool {
        match Self::derive(password, salt, cost) {
            Ok(candidate) => bool::from(self.0.ct_eq(&candidate.0)),
            Err(_) => false,
        }
    }
}
