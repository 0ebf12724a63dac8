use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use super::cipher_key::{CipherKey, CIPHER_KEY_SIZE, NONCE_SIZE};
use super::password::{PasswordCost, PasswordHash};
use super::signing_key::{SigningKey, SIGNING_KEY_SIZE};
use super::CryptoError;

/// Size of a password salt in bytes
pub const SALT_SIZE: usize = 128;

/// Random salt stored next to a password hash
pub type Salt = [u8; SALT_SIZE];

/// The crypto provider
///
/// Owns the single random generator every piece of key material and every
/// nonce is drawn from. The generator is seeded once from the OS when the
/// provider is built and is not safe for unsynchronized use, so every draw
/// takes the lock for the duration of one fill.
///
/// Share one instance per process behind an `Arc`.
pub struct Crypto {
    rng: Mutex<StdRng>,
    password_cost: PasswordCost,
}

impl std::fmt::Debug for Crypto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crypto")
            .field("password_cost", &self.password_cost)
            .finish_non_exhaustive()
    }
}

impl Default for Crypto {
    fn default() -> Self {
        Self::new(PasswordCost::default())
    }
}

impl Crypto {
    pub fn new(password_cost: PasswordCost) -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
            password_cost,
        }
    }

    /// A provider with a fixed seed. Output is reproducible; never use outside tests.
    pub fn seeded(seed: u64, password_cost: PasswordCost) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            password_cost,
        }
    }

    pub fn password_cost(&self) -> &PasswordCost {
        &self.password_cost
    }

    fn fill(&self, buf: &mut [u8]) {
        self.rng.lock().fill_bytes(buf);
    }

    pub fn new_salt(&self) -> Salt {
        let mut salt = [0u8; SALT_SIZE];
        self.fill(&mut salt);
        salt
    }

    pub fn new_user_key(&self) -> CipherKey {
        let mut bytes = [0u8; CIPHER_KEY_SIZE];
        self.fill(&mut bytes);
        CipherKey::from(bytes)
    }

    pub fn new_signing_key(&self) -> SigningKey {
        let mut bytes = [0u8; SIGNING_KEY_SIZE];
        self.fill(&mut bytes);
        SigningKey::from(bytes)
    }

    /// Seal `plaintext` under `key` with a fresh nonce
    pub fn encrypt(&self, key: &CipherKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce = [0u8; NONCE_SIZE];
        self.fill(&mut nonce);
        key.seal(nonce, plaintext)
    }

    /// Open ciphertext produced by [`Crypto::encrypt`]
    ///
    /// # Errors
    ///
    /// [`CryptoError::InvalidCiphertext`] when the input is shorter than a
    /// nonce or fails authentication.
    pub fn decrypt(&self, key: &CipherKey, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        key.open(ciphertext)
    }

    /// Build a password verifier with a fresh salt
    pub fn new_password_verifier(&self, password: &str) -> Result<(Salt, PasswordHash), CryptoError> {
        let salt = self.new_salt();
        let hash = PasswordHash::derive(password, &salt, &self.password_cost)?;
        Ok((salt, hash))
    }

    pub fn verify_password(&self, password: &str, salt: &[u8], hash: &PasswordHash) -> bool {
        hash.verify(password, salt, &self.password_cost)
    }
}
