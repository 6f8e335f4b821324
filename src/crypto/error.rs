//! Cryptographic error type.

use thiserror::Error;

/// Errors from the stream cipher and key derivation.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key material was empty.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Ciphertext shorter than the authentication tag.
    #[error("Data too short for authentication tag: {0} bytes")]
    DataTooShort(usize),

    /// Tag did not match the ciphertext (only when verification is enabled).
    #[error("Authentication tag mismatch")]
    TagMismatch,

    /// Key derivation failed.
    #[error("Key derivation failed: {0}")]
    Derivation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_keeps_source() {
        use std::error::Error;

        let err: crate::error::FunXmppError = CryptoError::DataTooShort(2).into();
        let source = err.source();
        assert!(source.is_some());
        assert!(source.unwrap().to_string().contains("2 bytes"));
    }
}
