//! FunXMPP binary tree codec.
//!
//! Every protocol message is a [`Node`](crate::node::Node) tree serialized as
//! nested lists of tokens. Known strings are replaced by their index in the
//! token [`Dictionary`]; everything else is written as a length-prefixed byte
//! string.
//!
//! # Frame
//!
//! ```text
//! [flags:u8][size:u16 BE][payload:size bytes]
//! ```
//!
//! Bit `0x8` of the flag nibble marks an encrypted payload (`tag || ct`).
//!
//! # Tokens
//!
//! | Token        | Meaning                                   |
//! |--------------|-------------------------------------------|
//! | `0x00`       | empty list / empty string                 |
//! | `0x01`       | start-of-stream tag                       |
//! | `0x02`       | end-of-stream tag                         |
//! | `0x05-0xF4`  | dictionary index                          |
//! | `0xF8 n`     | list of `n` (u8)                          |
//! | `0xF9 n n`   | list of `n` (u16)                         |
//! | `0xFA u s`   | JID: user string, server string           |
//! | `0xFC n ..`  | byte string, u8 length                    |
//! | `0xFD n n n ..` | byte string, u24 length                |
//! | `0xFE i`     | dictionary index `i + 0xF5`               |

mod cursor;
mod dictionary;
mod reader;
mod writer;

pub use cursor::ByteCursor;
pub use dictionary::{Dictionary, DICTIONARY_LEN};
pub use reader::{NodeReader, START_TAG};
pub use writer::NodeWriter;

/// Empty list marker; also the empty string.
pub const LIST_EMPTY: u8 = 0x00;
/// Start-of-stream tag token.
pub const STREAM_START: u8 = 0x01;
/// End-of-stream tag token.
pub const STREAM_END: u8 = 0x02;
/// List with an 8-bit count.
pub const LIST_8: u8 = 0xF8;
/// List with a 16-bit count.
pub const LIST_16: u8 = 0xF9;
/// JID pair.
pub const JID_PAIR: u8 = 0xFA;
/// Byte string with an 8-bit length.
pub const BINARY_8: u8 = 0xFC;
/// Byte string with a 24-bit length.
pub const BINARY_24: u8 = 0xFD;
/// Escape for dictionary indices at or above [`ESCAPE_BASE`].
pub const TOKEN_ESCAPE: u8 = 0xFE;
/// First dictionary index that needs [`TOKEN_ESCAPE`].
pub const ESCAPE_BASE: u16 = 0xF5;

/// Frame header length.
pub const HEADER_SIZE: usize = 3;
/// Encrypted bit within the flag nibble.
pub const ENCRYPTED_FLAG: u8 = 0x8;
/// Header byte 0 of an encrypted frame.
pub const ENCRYPTED_FLAG_BYTE: u8 = ENCRYPTED_FLAG << 4;
/// Largest payload the 16-bit size field can describe.
pub const MAX_FRAME_PAYLOAD: usize = 0xFFFF;
/// Protocol version preamble sent before the start-of-stream frame.
pub const STREAM_PREAMBLE: [u8; 4] = [b'W', b'A', 1, 2];
