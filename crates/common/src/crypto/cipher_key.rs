//! Per-user envelope key using ChaCha20-Poly1305

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::CryptoError;

/// Size of ChaCha20-Poly1305 nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of the Poly1305 authentication tag in bytes
pub const TAG_SIZE: usize = 16;
/// Size of a user's cipher key in bytes (256 bits)
pub const CIPHER_KEY_SIZE: usize = 32;

/// A 256-bit symmetric key owned by exactly one user
///
/// Generated once at registration and stored, raw, in the reserved slot of the
/// user's ciphertext bucket. It never leaves the core: callers only ever see
/// plaintext produced by [`Crypto::decrypt`](super::Crypto::decrypt).
///
/// The key bytes are wiped when the value is dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct CipherKey([u8; CIPHER_KEY_SIZE]);

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CipherKey(..)")
    }
}

impl From<[u8; CIPHER_KEY_SIZE]> for CipherKey {
    fn from(bytes: [u8; CIPHER_KEY_SIZE]) -> Self {
        CipherKey(bytes)
    }
}

impl CipherKey {
    /// Load a key from the bytes held in the ciphertext store
    ///
    /// # Errors
    ///
    /// Returns an error if the slice length is not exactly `CIPHER_KEY_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, CryptoError> {
        if data.len() != CIPHER_KEY_SIZE {
            return Err(CryptoError::KeyMaterial(format!(
                "invalid cipher key size, expected {}, got {}",
                CIPHER_KEY_SIZE,
                data.len()
            )));
        }
        let mut buff = [0; CIPHER_KEY_SIZE];
        buff.copy_from_slice(data);
        Ok(buff.into())
    }

    /// Get a reference to the key bytes
    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Seal `data` under this key with the given nonce
    ///
    /// The output format is: `nonce (12 bytes) || ciphertext || auth_tag (16 bytes)`.
    /// Nonces must never repeat for one key; [`Crypto`](super::Crypto) draws a
    /// fresh one from the shared generator for every call.
    pub(crate) fn seal(
        &self,
        nonce_bytes: [u8; NONCE_SIZE],
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let key = Key::from_slice(self.bytes());
        let cipher = ChaCha20Poly1305::new(key);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, data)
            .map_err(|_| CryptoError::KeyMaterial("encrypt error".into()))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(nonce.as_ref());
        out.extend_from_slice(ciphertext.as_ref());

        Ok(out)
    }

    /// Open data produced by [`CipherKey::seal`]
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidCiphertext`] if:
    /// - Data is too short to contain a nonce
    /// - Authentication tag verification fails (data was tampered with or wrong key)
    pub fn open(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if data.len() < NONCE_SIZE {
            return Err(CryptoError::InvalidCiphertext);
        }

        let key = Key::from_slice(self.bytes());
        let nonce = Nonce::from_slice(&data[..NONCE_SIZE]);
        let cipher = ChaCha20Poly1305::new(key);
        cipher
            .decrypt(nonce, &data[NONCE_SIZE..])
            .map_err(|_| CryptoError::InvalidCiphertext)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_seal_open() {
        let key = CipherKey::from([7u8; CIPHER_KEY_SIZE]);
        let data = b"hello world, this is a test message for encryption";

        let sealed = key.seal([1u8; NONCE_SIZE], data).unwrap();
        assert_eq!(sealed.len(), NONCE_SIZE + data.len() + TAG_SIZE);
        assert_eq!(&sealed[..NONCE_SIZE], &[1u8; NONCE_SIZE]);

        let opened = key.open(&sealed).unwrap();
        assert_eq!(data.as_slice(), opened.as_slice());
    }

    #[test]
    fn test_key_size_validation() {
        let too_short = [1u8; 16];
        let too_long = [1u8; 64];

        assert!(CipherKey::from_slice(&too_short).is_err());
        assert!(CipherKey::from_slice(&too_long).is_err());

        let just_right = [1u8; CIPHER_KEY_SIZE];
        assert!(CipherKey::from_slice(&just_right).is_ok());
    }

    #[test]
    fn test_tampered_or_truncated_ciphertext() {
        let key = CipherKey::from([3u8; CIPHER_KEY_SIZE]);
        let mut sealed = key.seal([9u8; NONCE_SIZE], b"integrity").unwrap();

        sealed[NONCE_SIZE + 2] ^= 0xFF;
        assert_eq!(key.open(&sealed), Err(CryptoError::InvalidCiphertext));

        assert_eq!(
            key.open(&[0u8; NONCE_SIZE - 1]),
            Err(CryptoError::InvalidCiphertext)
        );
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let key = CipherKey::from([3u8; CIPHER_KEY_SIZE]);
        let other = CipherKey::from([4u8; CIPHER_KEY_SIZE]);
        let sealed = key.seal([0u8; NONCE_SIZE], b"for key three").unwrap();

        assert_eq!(other.open(&sealed), Err(CryptoError::InvalidCiphertext));
    }

    #[test]
    fn test_debug_does_not_leak() {
        let key = CipherKey::from([0xAB; CIPHER_KEY_SIZE]);
        assert_eq!(format!("{:?}", key), "CipherKey(..)");
    }
}
