//! FunXMPP login handshake and session management.
//!
//! ## Message Flow
//!
//! ```text
//! Client                                   Server
//!    |                                       |
//!    |-- "WA" 1 2 + start(to, resource) ---->|  plaintext
//!    |-- stream:features ------------------->|
//!    |-- auth (empty | blob) --------------->|  blob = tag || RC4(phone nonce t ua mcc)
//!    |                                       |
//!    |<------------------------- challenge --|  only without a cached nonce
//!    |-- response -------------------------->|  reader keyed here
//!    |                                       |
//!    |<--------------------------- success --|  writer keyed here, nonce saved
//!    |== presence ==========================>|
//!    |<========================== messages ==|
//! ```
//!
//! ## State Machine
//!
//! | State               | Description                         | Valid Transitions              |
//! |---------------------|-------------------------------------|--------------------------------|
//! | `Disconnected`      | No socket                           | → Connected                    |
//! | `Connected`         | Socket open, not authenticated      | → AwaitingChallenge, Authenticating |
//! | `AwaitingChallenge` | Empty auth sent                     | → Authenticating               |
//! | `Authenticating`    | Blob or response sent               | → LoggedIn, Connected (failure)|
//! | `LoggedIn`          | Steady state                        | → Disconnected                 |
//!
//! Any state drops to `Disconnected` on EOF, a protocol desync or
//! [`Session::disconnect`].

mod actions;
mod challenge;
mod events;
mod session;

pub use actions::{Action, ClearDirty, MessageReceived, Presence, Receipt};
pub use challenge::{ChallengeStore, FileChallengeStore, MemoryChallengeStore};
pub use events::{Event, EventRegistry, Listener, ListenerId};
pub use session::{Session, SessionState, SessionStats};

/// SASL namespace on `auth` and `response`.
pub const SASL_NS: &str = "urn:ietf:params:xml:ns:xmpp-sasl";

/// Authentication mechanism name.
pub const AUTH_MECHANISM: &str = "WAUTH-1";

/// Mobile network code appended to the auth blob.
pub const MNC: &str = "001";

/// Reason reported with the close event when the peer hangs up.
pub const CLOSE_REASON_EOF: &str = "socket EOF, closing socket...";
