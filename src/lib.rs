//! # FunXMPP - binary XMPP client engine
//!
//! Client side of the FunXMPP chat protocol: XMPP stanzas compressed into a
//! token-dictionary binary tree format, framed with a 3-byte header and, once
//! logged in, enciphered with an RC4 stream keyed from the account password
//! and a server challenge.
//!
//! ## Protocol Overview
//!
//! ```text
//! Client                                         Server
//!    |                                              |
//!    |--- "WA" 1 2 + <start to=.. resource=..> ---->|
//!    |--- <stream:features> ----------------------->|
//!    |--- <auth mechanism="WAUTH-1" user=..> ------>|
//!    |<-- <challenge> nonce ------------------------|
//!    |--- <response> RC4(phone nonce time) -------->|
//!    |<== <success> (encrypted) ====================|
//!    |=== <presence type="available"> =============>|
//! ```
//!
//! When a nonce from a previous session is cached, the auth stanza carries
//! the enciphered blob directly and the challenge round trip is skipped.
//!
//! ### Frame format
//!
//! | Bytes | Field                                      |
//! |-------|--------------------------------------------|
//! | 1     | flags, `0x80` when the payload is encrypted |
//! | 2     | payload size, big endian                   |
//! | n     | tree payload                               |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use funxmpp::{Config, Session};
//!
//! let mut session = Session::new(Config::default(), "34600111222", "nick")?;
//! session.on("received.node.*", |event| println!("{}", event.name()));
//! session.connect()?;
//! session.login("base64-password")?;
//! loop {
//!     session.poll_messages()?;
//!     for node in session.take_messages() {
//!         println!("{node}");
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`codec`]: token dictionary, tree reader and writer
//! - [`crypto`]: RC4-drop-256 key stream with HMAC-SHA1 tags
//! - [`node`]: protocol tree and typed stanza views
//! - [`protocol`]: login state machine, events and actions
//! - [`transport`]: TCP and in-memory byte transports
//! - [`phone`]: phone number dissection
//! - [`registration`]: HTTP account registration (feature `registration`)
//! - [`config`]: configuration management
//! - [`error`]: error types and result aliases

pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod node;
pub mod phone;
pub mod protocol;
#[cfg(feature = "registration")]
pub mod registration;
pub mod transport;

// Re-exports for convenience
pub use codec::{Dictionary, NodeReader, NodeWriter};
pub use config::Config;
pub use crypto::{derive_session_key, KeyMaterial, KeyStream};
pub use error::{FunXmppError, Result};
pub use node::{Node, Stanza};
pub use phone::{LocalizationService, Phone};
pub use protocol::{Event, Session, SessionState};
#[cfg(feature = "registration")]
pub use registration::{Identity, RegistrationClient};
pub use transport::{MemoryTransport, TcpTransport, Transport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
