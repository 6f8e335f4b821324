//! Keyed stream cipher with truncated HMAC-SHA1 tags.
//!
//! One `KeyStream` per direction. Every `encode`/`decode` call consumes
//! keystream, so the peer must process frames in exactly the same order.

use hmac::{Hmac, Mac};
use sha1::Sha1;

use super::error::CryptoError;
use super::keyring::KeyMaterial;
use super::rc4::Rc4;
use super::{RC4_DROP, TAG_SIZE};

type HmacSha1 = Hmac<Sha1>;

/// RC4 keystream plus HMAC-SHA1 authenticator for one direction.
#[derive(Debug)]
pub struct KeyStream {
    rc4: Rc4,
    key: KeyMaterial,
    verify_tags: bool,
}

impl KeyStream {
    /// Seed a fresh keystream from the session key.
    pub fn new(key: &KeyMaterial) -> Self {
        Self {
            rc4: Rc4::new(key.as_bytes(), RC4_DROP),
            key: key.clone(),
            verify_tags: false,
        }
    }

    /// Reject frames whose tag does not match on `decode`.
    ///
    /// Off by default: the server's tags are accepted unchecked.
    pub fn with_tag_verification(mut self, enabled: bool) -> Self {
        self.verify_tags = enabled;
        self
    }

    /// Whether `decode` verifies tags.
    pub fn verifies_tags(&self) -> bool {
        self.verify_tags
    }

    /// First `TAG_SIZE` bytes of HMAC-SHA1 over `data`.
    pub fn compute_tag(&self, data: &[u8]) -> [u8; TAG_SIZE] {
        let mut mac =
            HmacSha1::new_from_slice(self.key.as_bytes()).expect("HMAC accepts any key size");
        mac.update(data);

        let digest = mac.finalize().into_bytes();
        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&digest[..TAG_SIZE]);
        tag
    }

    /// Encipher `data` and attach its tag.
    ///
    /// With `append_tag` the result is `ciphertext || tag`; otherwise
    /// `tag || ciphertext`, the layout of frame payloads and auth blobs.
    pub fn encode(&mut self, data: &[u8], append_tag: bool) -> Vec<u8> {
        let ciphertext = self.rc4.cipher(data);
        let tag = self.compute_tag(&ciphertext);

        let mut out = Vec::with_capacity(ciphertext.len() + TAG_SIZE);
        if append_tag {
            out.extend_from_slice(&ciphertext);
            out.extend_from_slice(&tag);
        } else {
            out.extend_from_slice(&tag);
            out.extend_from_slice(&ciphertext);
        }
        out
    }

    /// Decipher a `tag || ciphertext` span.
    pub fn decode(&mut self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if data.len() < TAG_SIZE {
            return Err(CryptoError::DataTooShort(data.len()));
        }
        let (tag, ciphertext) = data.split_at(TAG_SIZE);

        if self.verify_tags {
            let expected = self.compute_tag(ciphertext);
            if !constant_time_eq(&expected, tag) {
                return Err(CryptoError::TagMismatch);
            }
        }

        Ok(self.rc4.cipher(ciphertext))
    }
}

/// Constant-time comparison to prevent timing attacks
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
