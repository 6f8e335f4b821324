//! Binary tree writer.
//!
//! Serializes one [`Node`] into a framed, optionally encrypted byte sequence.
//! Strings are compressed through the token dictionary where possible.

use super::dictionary::Dictionary;
use super::{
    BINARY_24, BINARY_8, ENCRYPTED_FLAG_BYTE, ESCAPE_BASE, HEADER_SIZE, JID_PAIR, LIST_16,
    LIST_8, LIST_EMPTY, MAX_FRAME_PAYLOAD, STREAM_PREAMBLE, STREAM_START, TOKEN_ESCAPE,
};
use crate::crypto::{KeyStream, TAG_SIZE};
use crate::error::{FunXmppError, Result};
use crate::node::Node;

/// Largest raw string length the 24-bit length marker can carry.
const MAX_BINARY_LEN: usize = 0x00FF_FFFF;

/// Outbound frame writer. Holds the outbound cipher once keyed.
#[derive(Debug, Default)]
pub struct NodeWriter {
    key: Option<KeyStream>,
}

impl NodeWriter {
    /// Unkeyed writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encrypt every following frame with `key`.
    pub fn set_key(&mut self, key: KeyStream) {
        self.key = Some(key);
    }

    /// Drop the outbound cipher.
    pub fn reset_key(&mut self) {
        self.key = None;
    }

    /// Whether frames are being encrypted.
    pub fn is_keyed(&self) -> bool {
        self.key.is_some()
    }

    /// Protocol preamble followed by the start-of-stream frame. Never encrypted.
    pub fn start_stream(&mut self, domain: &str, resource: &str) -> Result<Vec<u8>> {
        let mut payload = Vec::new();
        write_list_start(&mut payload, 1 + 2 * 2)?;
        payload.push(STREAM_START);
        write_string(&mut payload, "to")?;
        write_string(&mut payload, domain)?;
        write_string(&mut payload, "resource")?;
        write_string(&mut payload, resource)?;

        let mut out = Vec::with_capacity(STREAM_PREAMBLE.len() + HEADER_SIZE + payload.len());
        out.extend_from_slice(&STREAM_PREAMBLE);
        push_frame(&mut out, 0, &payload)?;
        Ok(out)
    }

    /// Serialize one node (or a null frame) into a complete wire frame.
    pub fn write_frame(&mut self, node: Option<&Node>) -> Result<Vec<u8>> {
        let mut payload = Vec::new();
        match node {
            Some(node) => write_node(&mut payload, node)?,
            None => payload.push(LIST_EMPTY),
        }

        let (flags, payload) = match self.key.as_mut() {
            Some(key) => {
                // refuse before encoding so the key stream does not advance
                let sealed = payload.len() + TAG_SIZE;
                if sealed > MAX_FRAME_PAYLOAD {
                    return Err(FunXmppError::FrameTooLarge(sealed));
                }
                (ENCRYPTED_FLAG_BYTE, key.encode(&payload, false))
            }
            None => (0, payload),
        };

        let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
        push_frame(&mut out, flags, &payload)?;
        Ok(out)
    }
}

fn push_frame(out: &mut Vec<u8>, flags: u8, payload: &[u8]) -> Result<()> {
    if payload.len() > MAX_FRAME_PAYLOAD {
        return Err(FunXmppError::FrameTooLarge(payload.len()));
    }
    out.push(flags);
    out.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    out.extend_from_slice(payload);
    Ok(())
}

fn write_node(out: &mut Vec<u8>, node: &Node) -> Result<()> {
    let has_data = node.data().is_some();
    let has_children = !node.children().is_empty();
    let len = 1 + 2 * node.attributes().len() + usize::from(has_data) + usize::from(has_children);

    write_list_start(out, len)?;
    write_string(out, node.name())?;
    for (key, value) in node.attributes() {
        write_string(out, key)?;
        write_string(out, value)?;
    }
    if let Some(data) = node.data() {
        write_bytes(out, data)?;
    }
    if has_children {
        write_list_start(out, node.children().len())?;
        for child in node.children() {
            write_node(out, child)?;
        }
    }
    Ok(())
}

fn write_list_start(out: &mut Vec<u8>, len: usize) -> Result<()> {
    match len {
        0 => out.push(LIST_EMPTY),
        1..=0xFF => {
            out.push(LIST_8);
            out.push(len as u8);
        }
        0x100..=0xFFFF => {
            out.push(LIST_16);
            out.extend_from_slice(&(len as u16).to_be_bytes());
        }
        _ => return Err(FunXmppError::FrameTooLarge(len)),
    }
    Ok(())
}

fn write_token(out: &mut Vec<u8>, index: u16) {
    if index < ESCAPE_BASE {
        out.push(index as u8);
    } else {
        out.push(TOKEN_ESCAPE);
        out.push((index - ESCAPE_BASE) as u8);
    }
}

fn write_string(out: &mut Vec<u8>, s: &str) -> Result<()> {
    if let Some(index) = Dictionary::shared().reverse_lookup(s) {
        write_token(out, index);
        return Ok(());
    }

    if let Some((user, server)) = s.split_once('@') {
        if !user.is_empty() && !server.is_empty() {
            out.push(JID_PAIR);
            write_string(out, user)?;
            return write_string(out, server);
        }
    }

    write_bytes(out, s.as_bytes())
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    let len = bytes.len();
    if len < 0x100 {
        out.push(BINARY_8);
        out.push(len as u8);
    } else if len <= MAX_BINARY_LEN {
        out.push(BINARY_24);
        out.extend_from_slice(&(len as u32).to_be_bytes()[1..]);
    } else {
        return Err(FunXmppError::FrameTooLarge(len));
    }
    out.extend_from_slice(bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyMaterial;

    #[test]
    fn test_null_frame() {
        let mut w = NodeWriter::new();
        assert_eq!(w.write_frame(None).unwrap(), vec![0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_start_stream_bytes() {
        let mut w = NodeWriter::new();
        let out = w.start_stream("s.whatsapp.net", "Android-2.11.134-443").unwrap();

        assert_eq!(&out[..4], b"WA\x01\x02");
        // header: unencrypted, payload length
        assert_eq!(out[4], 0x00);
        let size = u16::from_be_bytes([out[5], out[6]]) as usize;
        assert_eq!(size, out.len() - 7);

        let payload = &out[7..];
        assert_eq!(&payload[..3], &[LIST_8, 5, STREAM_START]);
        // "to" token, "s.whatsapp.net" token, "resource" token
        assert_eq!(&payload[3..6], &[200, 171, 165]);
        assert_eq!(payload[6], BINARY_8);
        assert_eq!(payload[7] as usize, "Android-2.11.134-443".len());
        assert_eq!(&payload[8..], b"Android-2.11.134-443");
    }

    #[test]
    fn test_token_beats_raw_string() {
        let mut tokenized = Vec::new();
        write_string(&mut tokenized, "presence").unwrap();
        assert_eq!(tokenized, vec![144]);

        let mut raw = Vec::new();
        write_bytes(&mut raw, b"presence").unwrap();
        assert!(tokenized.len() < raw.len());
    }

    #[test]
    fn test_escaped_token() {
        let mut out = Vec::new();
        write_string(&mut out, "XXX").unwrap();
        assert_eq!(out, vec![TOKEN_ESCAPE, 248 - 0xF5]);
    }

    #[test]
    fn test_jid_encoding() {
        let mut out = Vec::new();
        write_string(&mut out, "34600000000@s.whatsapp.net").unwrap();
        let mut expected = vec![JID_PAIR, BINARY_8, 11];
        expected.extend_from_slice(b"34600000000");
        expected.push(171);
        assert_eq!(out, expected);

        // Missing user part falls back to a raw string
        let mut out = Vec::new();
        write_string(&mut out, "@s.whatsapp.net").unwrap();
        assert_eq!(out[0], BINARY_8);
    }

    #[test]
    fn test_long_data_uses_24bit_length() {
        let mut out = Vec::new();
        write_bytes(&mut out, &[7u8; 300]).unwrap();
        assert_eq!(&out[..4], &[BINARY_24, 0x00, 0x01, 0x2C]);
        assert_eq!(out.len(), 4 + 300);
    }

    #[test]
    fn test_node_layout() {
        let node = Node::new("iq")
            .unwrap()
            .with_attribute("type", "get")
            .with_child(Node::new("ping").unwrap());
        let mut out = Vec::new();
        write_node(&mut out, &node).unwrap();
        // list(4) iq type get list(1) list(1) ping
        assert_eq!(out, vec![LIST_8, 4, 85, 203, 67, LIST_8, 1, LIST_8, 1, 139]);
    }

    #[test]
    fn test_wide_child_list() {
        let mut node = Node::new("list").unwrap();
        for _ in 0..300 {
            node.add_child(Node::new("item").unwrap());
        }
        let mut out = Vec::new();
        write_node(&mut out, &node).unwrap();
        assert_eq!(&out[..5], &[LIST_8, 2, 102, LIST_16, 0x01]);
        assert_eq!(out[5], 0x2C);
    }

    #[test]
    fn test_encrypted_frame_sets_flag() {
        let mut w = NodeWriter::new();
        w.set_key(KeyStream::new(&KeyMaterial::new(b"key".to_vec())));
        let node = Node::new("presence").unwrap();
        let out = w.write_frame(Some(&node)).unwrap();
        assert_eq!(out[0], ENCRYPTED_FLAG_BYTE);
        // plaintext is 3 bytes, plus the 4-byte tag
        assert_eq!(u16::from_be_bytes([out[1], out[2]]), 7);
        assert!(w.is_keyed());
        w.reset_key();
        assert!(!w.is_keyed());
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let node = Node::new("media").unwrap().with_data(vec![0u8; 70_000]);
        let mut w = NodeWriter::new();
        assert!(matches!(
            w.write_frame(Some(&node)),
            Err(FunXmppError::FrameTooLarge(_))
        ));
    }

    #[test]
    fn test_oversized_keyed_frame_keeps_stream_in_step() {
        use crate::codec::NodeReader;

        let key = KeyMaterial::new(b"0123456789abcdefghij".to_vec());
        let mut w = NodeWriter::new();
        w.set_key(KeyStream::new(&key));
        let mut r = NodeReader::new();
        r.set_key(KeyStream::new(&key));

        // fits unencrypted, too large once the tag is added
        let big = Node::new("media").unwrap().with_data(vec![0u8; 0xFFF7]);
        assert_eq!(
            NodeWriter::new().write_frame(Some(&big)).unwrap().len() - HEADER_SIZE,
            0xFFFE
        );
        assert!(matches!(
            w.write_frame(Some(&big)),
            Err(FunXmppError::FrameTooLarge(0x10002))
        ));

        let presence = Node::new("presence").unwrap().with_attribute("type", "available");
        let frame = w.write_frame(Some(&presence)).unwrap();
        assert_eq!(r.next_tree(Some(&frame)).unwrap(), Some(presence));
    }
}
