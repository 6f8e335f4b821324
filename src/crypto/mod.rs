//! Stream cipher layer for FunXMPP frames.
//!
//! After the login handshake every frame payload is enciphered with an RC4
//! keystream and carries a truncated HMAC-SHA1 tag:
//!
//! ```text
//! password (base64) ──decode──┐
//!                             ├─[PBKDF2-HMAC-SHA1, 16 rounds]─► 20-byte session key
//! challenge nonce ────────────┘                                   │
//!                                              ┌──────────────────┴─────────────────┐
//!                                              ▼                                    ▼
//!                                   KeyStream (inbound)                 KeyStream (outbound)
//!                                   RC4 drop-256 + HMAC                 RC4 drop-256 + HMAC
//! ```
//!
//! Both directions are seeded from the same key but each owns its own RC4
//! state, so keystream consumption in one direction never affects the other.
//!
//! # Wire Format
//!
//! ```text
//! frame payload (outbound and inbound):  <tag:4><ciphertext>
//! auth and response blobs:               <tag:4><ciphertext>
//! ```
//!
//! [`KeyStream::encode`] can also append the tag (`<ciphertext><tag:4>`);
//! the session never sends that layout.
//!
//! The tag is the first four bytes of HMAC-SHA1(session key, ciphertext).

mod error;
mod keyring;
mod keystream;
mod rc4;

pub use error::CryptoError;
pub use keyring::{derive_session_key, KeyMaterial};
pub use keystream::KeyStream;
pub use rc4::Rc4;

/// Truncated HMAC tag length.
pub const TAG_SIZE: usize = 4;

/// Keystream bytes discarded after the RC4 key schedule.
pub const RC4_DROP: usize = 256;

/// PBKDF2 iteration count used for the session key.
pub const PBKDF2_ROUNDS: u32 = 16;

/// Session key length in bytes.
pub const SESSION_KEY_SIZE: usize = 20;
