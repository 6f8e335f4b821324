//! Token dictionary (FunXMPP string compression).
//!
//! A fixed, ordered table of protocol strings. Strings found in the table are
//! written as their index instead of their bytes. The table never changes
//! after load; the reverse map is built once and shared read-only for the
//! lifetime of the process.

use std::collections::HashMap;

use crate::error::{FunXmppError, Result};

/// Number of entries in the token table.
pub const DICTIONARY_LEN: usize = 249;

/// The token table. Empty entries are placeholders and never encoded.
static TOKENS: [&str; DICTIONARY_LEN] = [
    // 0x00 - 0x04: reserved (no-string, stream start, stream end, ...)
    "", "", "", "", "",
    // 0x05
    "account", "ack", "action", "active", "add", "after", "ib", "all", "allow", "apple",
    // 0x0F
    "audio", "auth", "author", "available", "bad-protocol", "bad-request", "before",
    "Bell.caf", "body", "Boing.caf",
    // 0x19
    "cancel", "category", "challenge", "chat", "clean", "code", "composing", "config",
    "conflict", "contacts",
    // 0x23
    "count", "create", "creation", "default", "delay", "delete", "delivered", "deny",
    "digest", "DIGEST-MD5-1",
    // 0x2D
    "DIGEST-MD5-2", "dirty", "elapsed", "broadcast", "enable", "encoding", "duplicate",
    "error", "event", "expiration",
    // 0x37
    "expired", "fail", "failure", "false", "favorites", "feature", "features", "field",
    "first", "free",
    // 0x41
    "from", "g.us", "get", "Glass.caf", "google", "group", "groups", "g_notify", "g_sound",
    "Harp.caf",
    // 0x4B
    "http://etherx.jabber.org/streams", "http://jabber.org/protocol/chatstates", "id",
    "image", "img", "inactive", "index", "internal-server-error", "invalid-mechanism", "ip",
    // 0x55
    "iq", "item", "item-not-found", "user-not-found", "jabber:iq:last",
    "jabber:iq:privacy", "jabber:x:delay", "jabber:x:event", "jid", "jid-malformed",
    // 0x5F
    "kind", "last", "latitude", "lc", "leave", "leave-all", "lg", "list", "location",
    "longitude",
    // 0x69
    "max", "max_groups", "max_participants", "max_subject", "mechanism", "media",
    "message", "message_acks", "method", "microsoft",
    // 0x73
    "missing", "modify", "mute", "name", "nokia", "none", "not-acceptable", "not-allowed",
    "not-authorized", "notification",
    // 0x7D
    "notify", "off", "offline", "order", "owner", "owning", "paid", "participant",
    "participants", "participating",
    // 0x87
    "password", "paused", "picture", "pin", "ping", "platform", "pop_mean_time",
    "pop_plus_minus", "port", "presence",
    // 0x91
    "preview", "probe", "proceed", "prop", "props", "p_o", "p_t", "query", "raw", "reason",
    // 0x9B
    "receipt", "receipt_acks", "received", "registration", "relay",
    "remote-server-timeout", "remove", "Replaced by new connection", "request", "required",
    // 0xA5
    "resource", "resource-constraint", "response", "result", "retry", "rim",
    "s.whatsapp.net", "s.us", "seconds", "server",
    // 0xAF
    "server-error", "service-unavailable", "set", "show", "sid", "silent", "sound",
    "stamp", "unsubscribe", "stat",
    // 0xB9
    "status", "stream:error", "stream:features", "subject", "subscribe", "success",
    "sync", "system-shutdown", "s_o", "s_t",
    // 0xC3
    "t", "text", "timeout", "TimePassing.caf", "timestamp", "to", "Tri-tone.caf", "true",
    "type", "unavailable",
    // 0xCD
    "uri", "url", "urn:ietf:params:xml:ns:xmpp-sasl",
    "urn:ietf:params:xml:ns:xmpp-stanzas", "urn:ietf:params:xml:ns:xmpp-streams",
    "urn:xmpp:delay", "urn:xmpp:ping", "urn:xmpp:receipts", "urn:xmpp:whatsapp",
    "urn:xmpp:whatsapp:account",
    // 0xD7
    "urn:xmpp:whatsapp:dirty", "urn:xmpp:whatsapp:mms", "urn:xmpp:whatsapp:push", "user",
    "username", "value", "vcard", "version", "video", "w",
    // 0xE1
    "w:g", "w:p", "w:p:r", "w:profile:picture", "wait", "x", "xml-not-well-formed",
    "xmlns", "xmlns:stream", "Xylophone.caf",
    // 0xEB
    "1", "WAUTH-1",
    // 0xED - 0xF7: unused
    "", "", "", "", "", "", "", "", "", "", "",
    // 0xF8
    "XXX",
];

lazy_static::lazy_static! {
    /// Shared dictionary instance.
    static ref SHARED: Dictionary = Dictionary::build();
}

/// Index-addressable token table with a precomputed reverse map.
#[derive(Debug)]
pub struct Dictionary {
    tokens: &'static [&'static str],
    reverse: HashMap<&'static str, u16>,
}

impl Dictionary {
    fn build() -> Self {
        let reverse = TOKENS
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_empty())
            .map(|(i, s)| (*s, i as u16))
            .collect();

        Self {
            tokens: &TOKENS,
            reverse,
        }
    }

    /// The process-wide dictionary.
    pub fn shared() -> &'static Dictionary {
        &SHARED
    }

    /// Number of entries, placeholders included.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Always false; the table is fixed.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// String for a token index.
    pub fn lookup(&self, index: usize) -> Result<&'static str> {
        self.tokens
            .get(index)
            .copied()
            .ok_or(FunXmppError::OutOfRange {
                index,
                len: self.tokens.len(),
            })
    }

    /// Token index for a string, if it is a known constant.
    pub fn reverse_lookup(&self, s: &str) -> Option<u16> {
        self.reverse.get(s).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dictionary_len() {
        assert_eq!(Dictionary::shared().len(), 249);
    }

    #[test]
    fn test_lookup_bounds() {
        let dict = Dictionary::shared();
        assert_eq!(dict.lookup(0).unwrap(), "");
        assert!(matches!(
            dict.lookup(249),
            Err(FunXmppError::OutOfRange { index: 249, len: 249 })
        ));
    }

    #[test]
    fn test_well_known_tokens() {
        let dict = Dictionary::shared();
        assert_eq!(dict.lookup(5).unwrap(), "account");
        assert_eq!(dict.reverse_lookup("auth"), Some(16));
        assert_eq!(dict.reverse_lookup("challenge"), Some(27));
        assert_eq!(dict.reverse_lookup("s.whatsapp.net"), Some(171));
        assert_eq!(dict.reverse_lookup("stream:features"), Some(187));
        assert_eq!(dict.reverse_lookup("success"), Some(190));
        assert_eq!(dict.reverse_lookup("xmlns"), Some(232));
        assert_eq!(dict.reverse_lookup("WAUTH-1"), Some(236));
        assert_eq!(dict.reverse_lookup("XXX"), Some(248));
    }

    #[test]
    fn test_placeholders_not_reversible() {
        let dict = Dictionary::shared();
        assert_eq!(dict.reverse_lookup(""), None);
        assert_eq!(dict.reverse_lookup("not-a-token"), None);
    }

    #[test]
    fn test_reverse_map_consistent() {
        // Every reverse entry must point back at its own string
        let dict = Dictionary::shared();
        for (s, idx) in &dict.reverse {
            assert_eq!(dict.lookup(*idx as usize).unwrap(), *s);
        }
    }
}
