use zeroize::{Zeroize, ZeroizeOnDrop};

use super::CryptoError;

/// Size of the token signing key in bytes
pub const SIGNING_KEY_SIZE: usize = 256;

const PEM_TAG: &str = "STRONGBOX SIGNING KEY";

/// The token authority's MAC key
///
/// Loaded once at startup and only read afterwards, so it can be shared
/// between request tasks without locking.
///
/// # Examples
///
/// ```ignore
/// let key = crypto.new_signing_key();
///
/// // Persist to PEM format
/// std::fs::write("signing_key.pem", key.to_pem())?;
///
/// // Load from PEM
/// let pem = std::fs::read_to_string("signing_key.pem")?;
/// let recovered = SigningKey::from_pem(&pem)?;
/// ```
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningKey([u8; SIGNING_KEY_SIZE]);

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(..)")
    }
}

impl From<[u8; SIGNING_KEY_SIZE]> for SigningKey {
    fn from(bytes: [u8; SIGNING_KEY_SIZE]) -> Self {
        SigningKey(bytes)
    }
}

impl SigningKey {
    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Encode the key in PEM format for storage in the state directory
    pub fn to_pem(&self) -> String {
        let pem = pem::Pem::new(PEM_TAG, self.bytes().to_vec());
        pem::encode(&pem)
    }

    /// Parse a key from PEM format
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The PEM string is malformed
    /// - The PEM tag is not `STRONGBOX SIGNING KEY`
    /// - The key size is incorrect
    pub fn from_pem(pem_str: &str) -> Result<Self, CryptoError> {
        let pem = pem::parse(pem_str)
            .map_err(|e| CryptoError::KeyMaterial(format!("failed to parse PEM: {}", e)))?;

        if pem.tag() != PEM_TAG {
            return Err(CryptoError::KeyMaterial(format!(
                "invalid PEM tag, expected {}",
                PEM_TAG
            )));
        }

        let contents = pem.contents();
        if contents.len() != SIGNING_KEY_SIZE {
            return Err(CryptoError::KeyMaterial(format!(
                "invalid signing key size in PEM, expected {}, got {}",
                SIGNING_KEY_SIZE,
                contents.len()
            )));
        }

        let mut bytes = [0u8; SIGNING_KEY_SIZE];
        bytes.copy_from_slice(contents);
        Ok(Self::from(bytes))
    }
}
