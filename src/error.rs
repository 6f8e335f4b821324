//! FunXMPP error types.
//!
//! # Error Classification
//!
//! Errors fall into three groups, and callers are expected to treat them
//! differently:
//!
//! - **Recoverable**: [`FunXmppError::IncompleteFrame`] only. The reader keeps
//!   the partial frame buffered; feed it more bytes and try again.
//! - **Protocol desync**: the binary format has no resynchronization marker, so
//!   a bad token, a missing key or a truncated payload ends the session.
//! - **Collaborator / lifecycle**: connection failures, authentication
//!   failures, phone lookup and registration errors. These are reported to
//!   the application and never retried automatically.
//!
//! The `Crypto` variant preserves the full error chain via `#[source]`.

use thiserror::Error;

use crate::crypto::CryptoError;

/// FunXMPP errors.
#[derive(Error, Debug)]
pub enum FunXmppError {
    /// Not enough bytes buffered to decode the next frame.
    #[error("Incomplete frame: need {needed} bytes, {available} buffered")]
    IncompleteFrame {
        /// Bytes the frame occupies (header plus declared payload).
        needed: usize,
        /// Bytes currently buffered.
        available: usize,
    },

    /// An encrypted frame arrived before the inbound key was set.
    #[error("Encountered encrypted frame, missing key")]
    MissingKey,

    /// A token byte that is not valid in its position.
    #[error("Invalid token {0}")]
    InvalidToken(u16),

    /// Dictionary index past the end of the table.
    #[error("Token index {index} out of range (dictionary has {len} entries)")]
    OutOfRange {
        /// Requested index.
        index: usize,
        /// Dictionary length.
        len: usize,
    },

    /// A read ran past the end of the frame payload.
    #[error("Unexpected end of frame payload")]
    UnexpectedEof,

    /// A tag name or attribute was not valid UTF-8.
    #[error("Invalid UTF-8 in protocol string")]
    InvalidUtf8,

    /// Serialized payload does not fit in the 16-bit frame size.
    #[error("Frame payload too large: {0} bytes")]
    FrameTooLarge(usize),

    /// Node construction rule violated.
    #[error("Invalid node: {0}")]
    InvalidNode(String),

    /// Socket could not be opened.
    #[error("Connect failure: {0}")]
    ConnectFailure(String),

    /// Operation requires an open socket.
    #[error("Not connected")]
    NotConnected,

    /// Server answered the login with a `failure` stanza.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Login did not complete inside the retry window.
    #[error("Login timed out after {attempts} polls")]
    LoginTimeout {
        /// Number of inbound polls performed.
        attempts: u32,
    },

    /// Protocol-level error.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Phone number did not match any known country.
    #[error("Phone number not recognized: {0}")]
    NotRecognized(String),

    /// Registration API returned an unusable answer.
    #[error("Registration error: {0}")]
    Registration(String),

    /// HTTP transport error.
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Cryptographic operation failed.
    ///
    /// This variant preserves the full error chain via `#[source]`.
    #[error("Crypto error: {0}")]
    Crypto(#[source] CryptoError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FunXmppError {
    /// True when the caller should buffer more bytes and retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FunXmppError::IncompleteFrame { .. })
    }

    /// True for errors that leave the byte stream unusable.
    pub fn is_protocol_desync(&self) -> bool {
        match self {
            FunXmppError::MissingKey
            | FunXmppError::InvalidToken(_)
            | FunXmppError::OutOfRange { .. }
            | FunXmppError::UnexpectedEof
            | FunXmppError::InvalidUtf8 => true,
            FunXmppError::Crypto(CryptoError::TagMismatch) => true,
            _ => false,
        }
    }
}

/// Result type alias for FunXMPP operations
pub type Result<T> = std::result::Result<T, FunXmppError>;

impl From<CryptoError> for FunXmppError {
    fn from(err: CryptoError) -> Self {
        FunXmppError::Crypto(err)
    }
}

#[cfg(feature = "registration")]
impl From<reqwest::Error> for FunXmppError {
    fn from(err: reqwest::Error) -> Self {
        FunXmppError::Network(err.to_string())
    }
}

impl From<toml::de::Error> for FunXmppError {
    fn from(err: toml::de::Error) -> Self {
        FunXmppError::Config(err.to_string())
    }
}

impl From<base64::DecodeError> for FunXmppError {
    fn from(err: base64::DecodeError) -> Self {
        FunXmppError::Config(format!("Password is not valid base64: {err}"))
    }
}
