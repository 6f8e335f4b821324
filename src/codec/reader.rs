//! Binary tree reader.
//!
//! Reassembles frames from arbitrary socket chunks and parses each complete
//! frame into a [`Node`].
//!
//! ```text
//! byte 0        bytes 1-2        bytes 3..
//! +--------+    +------------+   +----------------------------+
//! | flags  |    | size (BE)  |   | payload (tag || ct if enc) |
//! +--------+    +------------+   +----------------------------+
//! ```

use bytes::{Buf, BytesMut};

use super::cursor::ByteCursor;
use super::dictionary::Dictionary;
use super::{
    BINARY_24, BINARY_8, ENCRYPTED_FLAG, ESCAPE_BASE, HEADER_SIZE, JID_PAIR, LIST_16, LIST_8,
    LIST_EMPTY, STREAM_END, STREAM_START, TOKEN_ESCAPE,
};
use crate::crypto::KeyStream;
use crate::error::{FunXmppError, Result};
use crate::node::Node;

/// Tag given to start-of-stream attribute lists.
pub const START_TAG: &str = "start";

/// Inbound frame reader. Owns the partial-frame buffer and the inbound cipher.
#[derive(Debug, Default)]
pub struct NodeReader {
    buffer: BytesMut,
    key: Option<KeyStream>,
}

impl NodeReader {
    /// Unkeyed reader with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decrypt encrypted frames with `key` from now on.
    pub fn set_key(&mut self, key: KeyStream) {
        self.key = Some(key);
    }

    /// Drop the inbound cipher.
    pub fn reset_key(&mut self) {
        self.key = None;
    }

    /// Whether an inbound cipher is set.
    pub fn is_keyed(&self) -> bool {
        self.key.is_some()
    }

    /// Bytes waiting to be parsed.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Discard buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Append `input` (if any) to the buffer and parse the next complete frame.
    ///
    /// Returns `Ok(None)` for an empty buffer or an empty/null frame. A
    /// partial frame fails with [`FunXmppError::IncompleteFrame`] and stays
    /// buffered for the next call.
    pub fn next_tree(&mut self, input: Option<&[u8]>) -> Result<Option<Node>> {
        if let Some(bytes) = input {
            self.buffer.extend_from_slice(bytes);
        }

        let available = self.buffer.len();
        if available == 0 {
            return Ok(None);
        }
        if available < HEADER_SIZE {
            return Err(FunXmppError::IncompleteFrame {
                needed: HEADER_SIZE,
                available,
            });
        }

        let flags = (self.buffer[0] & 0xF0) >> 4;
        let size = u16::from_be_bytes([self.buffer[1], self.buffer[2]]) as usize;
        let needed = HEADER_SIZE + size;
        if available < needed {
            return Err(FunXmppError::IncompleteFrame { needed, available });
        }

        let encrypted = flags & ENCRYPTED_FLAG != 0;
        if encrypted && self.key.is_none() {
            return Err(FunXmppError::MissingKey);
        }

        // Consume the header as a single 24-bit read, then the payload.
        let _header = self.buffer.get_uint(HEADER_SIZE);
        let frame = self.buffer.split_to(size);
        if size == 0 {
            return Ok(None);
        }

        let payload = match self.key.as_mut() {
            Some(key) if encrypted => key.decode(&frame)?,
            _ => frame.to_vec(),
        };

        tracing::trace!(size, encrypted, "frame");
        let mut cursor = ByteCursor::new(&payload);
        read_node(&mut cursor)
    }
}

fn read_list_size(cursor: &mut ByteCursor<'_>, token: u8) -> Result<usize> {
    match token {
        LIST_EMPTY => Ok(0),
        LIST_8 => Ok(cursor.read_u8()? as usize),
        LIST_16 => Ok(cursor.read_u16()? as usize),
        other => Err(FunXmppError::InvalidToken(other as u16)),
    }
}

fn is_list_start(token: u8) -> bool {
    matches!(token, LIST_EMPTY | LIST_8 | LIST_16)
}

fn read_node(cursor: &mut ByteCursor<'_>) -> Result<Option<Node>> {
    let token = cursor.read_u8()?;
    let size = read_list_size(cursor, token)?;
    if size == 0 {
        return Ok(None);
    }

    let tag = cursor.read_u8()?;
    if tag == STREAM_END {
        return Ok(None);
    }
    if tag == STREAM_START {
        let attributes = read_attributes(cursor, size)?;
        return Node::from_parts(START_TAG, attributes, None, Vec::new()).map(Some);
    }

    let name = read_string(cursor, tag)?;
    let attributes = read_attributes(cursor, size)?;
    if size % 2 == 1 {
        return Node::from_parts(name, attributes, None, Vec::new()).map(Some);
    }

    let next = cursor.read_u8()?;
    if is_list_start(next) {
        let count = read_list_size(cursor, next)?;
        let children = read_list(cursor, count)?;
        Node::from_parts(name, attributes, None, children).map(Some)
    } else {
        let data = read_raw(cursor, next)?;
        Node::from_parts(name, attributes, Some(data), Vec::new()).map(Some)
    }
}

fn read_list(cursor: &mut ByteCursor<'_>, count: usize) -> Result<Vec<Node>> {
    let mut children = Vec::with_capacity(count.min(cursor.remaining()));
    for _ in 0..count {
        if let Some(child) = read_node(cursor)? {
            children.push(child);
        }
    }
    Ok(children)
}

fn read_attributes(cursor: &mut ByteCursor<'_>, size: usize) -> Result<Vec<(String, String)>> {
    let count = (size + size % 2 - 2) / 2;
    let mut attributes = Vec::with_capacity(count.min(cursor.remaining()));
    for _ in 0..count {
        let key_token = cursor.read_u8()?;
        let key = read_string(cursor, key_token)?;
        let value_token = cursor.read_u8()?;
        let value = read_string(cursor, value_token)?;
        attributes.push((key, value));
    }
    Ok(attributes)
}

fn read_string(cursor: &mut ByteCursor<'_>, token: u8) -> Result<String> {
    String::from_utf8(read_raw(cursor, token)?).map_err(|_| FunXmppError::InvalidUtf8)
}

fn read_raw(cursor: &mut ByteCursor<'_>, token: u8) -> Result<Vec<u8>> {
    let dict = Dictionary::shared();
    match token {
        0 => Ok(Vec::new()),
        5..=0xF4 => Ok(dict.lookup(token as usize)?.as_bytes().to_vec()),
        TOKEN_ESCAPE => {
            let index = cursor.read_u8()? as u16 + ESCAPE_BASE;
            Ok(dict.lookup(index as usize)?.as_bytes().to_vec())
        }
        BINARY_8 => {
            let len = cursor.read_u8()? as usize;
            Ok(cursor.read_bytes(len)?.to_vec())
        }
        BINARY_24 => {
            let len = cursor.read_u24()? as usize;
            Ok(cursor.read_bytes(len)?.to_vec())
        }
        JID_PAIR => {
            let user_token = cursor.read_u8()?;
            let user = read_raw(cursor, user_token)?;
            let server_token = cursor.read_u8()?;
            let server = read_raw(cursor, server_token)?;
            Ok(match (user.is_empty(), server.is_empty()) {
                (false, false) => [user, b"@".to_vec(), server].concat(),
                (_, false) => server,
                _ => Vec::new(),
            })
        }
        other => Err(FunXmppError::InvalidToken(other as u16)),
    }
}
