//! Session key material and derivation.
//!
//! The session key is PBKDF2-HMAC-SHA1 over the decoded account password,
//! salted with the server-issued challenge nonce.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use sha1::Sha1;
use zeroize::Zeroize;

use super::error::CryptoError;
use super::{PBKDF2_ROUNDS, SESSION_KEY_SIZE};
use crate::error::Result;

/// Key material (secret bytes)
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    /// The raw key bytes
    bytes: Vec<u8>,
}

impl KeyMaterial {
    /// Create new key material from bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Get the key length
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the key is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<&[u8]> for KeyMaterial {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Don't leak key material in debug output
        write!(f, "KeyMaterial([REDACTED, {} bytes])", self.bytes.len())
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

/// Derive the 20-byte session key from a base64 account password and a
/// challenge nonce.
pub fn derive_session_key(password: &str, nonce: &[u8]) -> Result<KeyMaterial> {
    let mut secret = BASE64.decode(password.trim())?;
    if secret.is_empty() {
        return Err(CryptoError::InvalidKey("empty password".to_string()).into());
    }

    let mut key = vec![0u8; SESSION_KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha1>(&secret, nonce, PBKDF2_ROUNDS, &mut key);
    secret.zeroize();

    Ok(KeyMaterial::new(key))
}
