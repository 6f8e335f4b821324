//! Message tree node, the universal protocol value.
//!
//! Every frame on the wire carries zero or one `Node`. A node has a tag name
//! (fixed once set), ordered attributes, optional binary data and an ordered
//! list of children.
//!
//! ```text
//! <auth xmlns="urn:ietf:params:xml:ns:xmpp-sasl" mechanism="WAUTH-1" user="34600000000">
//!   ...data...
//! </auth>
//! ```

mod stanza;

pub use stanza::{Stanza, SuccessInfo};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FunXmppError, Result};

/// Data longer than this is summarized instead of printed by `Display`.
const DISPLAY_DATA_LIMIT: usize = 1024;

/// A protocol tree node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    name: String,
    /// Ordered key/value pairs. Lookups are by key.
    #[serde(default)]
    attributes: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<Node>,
}

impl Node {
    /// Create a node with a tag name.
    ///
    /// An empty name is rejected.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(FunXmppError::InvalidNode("node name is empty".to_string()));
        }
        Ok(Self {
            name,
            ..Self::default()
        })
    }

    /// Create a node from all of its parts.
    pub fn from_parts(
        name: impl Into<String>,
        attributes: Vec<(String, String)>,
        data: Option<Vec<u8>>,
        children: Vec<Node>,
    ) -> Result<Self> {
        let mut node = Self::new(name)?;
        node.attributes = attributes;
        node.data = data;
        node.children = children;
        Ok(node)
    }

    /// Builder: add an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// Builder: set the data payload.
    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Builder: append a child.
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the tag name. Only a no-op assignment of the current name is allowed.
    pub fn set_name(&mut self, name: &str) -> Result<()> {
        if name == self.name {
            return Ok(());
        }
        Err(FunXmppError::InvalidNode(format!(
            "cannot rename '{}' to '{}'",
            self.name, name
        )))
    }

    /// All attributes in insertion order.
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Attribute value by key.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute. An existing key keeps its position.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// Remove an attribute, returning its value.
    pub fn remove_attribute(&mut self, key: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(k, _)| k == key)?;
        Some(self.attributes.remove(pos).1)
    }

    /// Data payload.
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Replace the data payload.
    pub fn set_data(&mut self, data: Option<Vec<u8>>) {
        self.data = data;
    }

    /// Data payload as UTF-8 text, when it is valid text.
    pub fn data_str(&self) -> Option<&str> {
        self.data().and_then(|d| std::str::from_utf8(d).ok())
    }

    /// Children in order.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Mutable children.
    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    /// Append a child.
    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    /// First child with the given tag.
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Whether a child with the given tag exists.
    pub fn has_child(&self, name: &str) -> bool {
        self.child(name).is_some()
    }

    /// Remove every child with the given tag. Returns how many were removed.
    pub fn remove_children(&mut self, name: &str) -> usize {
        let before = self.children.len();
        self.children.retain(|c| c.name != name);
        before - self.children.len()
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = "  ".repeat(depth);
        write!(f, "{pad}<{}", self.name)?;
        for (k, v) in &self.attributes {
            write!(f, " {k}=\"{v}\"")?;
        }
        f.write_str(">\n")?;

        if let Some(data) = &self.data {
            if data.len() <= DISPLAY_DATA_LIMIT {
                writeln!(f, "{pad}{}", String::from_utf8_lossy(data))?;
            } else {
                writeln!(f, "{pad} {} byte data", data.len())?;
            }
        }

        for child in &self.children {
            child.fmt_indented(f, depth + 1)?;
        }

        writeln!(f, "{pad}</{}>", self.name)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(Node::new(""), Err(FunXmppError::InvalidNode(_))));
    }

    #[test]
    fn test_name_immutable() {
        let mut node = Node::new("iq").unwrap();
        assert!(node.set_name("iq").is_ok());
        assert!(node.set_name("message").is_err());
        assert_eq!(node.name(), "iq");
    }

    #[test]
    fn test_attribute_order_and_replace() {
        let mut node = Node::new("message")
            .unwrap()
            .with_attribute("to", "a@s.whatsapp.net")
            .with_attribute("type", "chat")
            .with_attribute("id", "m-1");

        node.set_attribute("type", "text");
        let keys: Vec<&str> = node.attributes().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["to", "type", "id"]);
        assert_eq!(node.attribute("type"), Some("text"));
        assert_eq!(node.remove_attribute("to").as_deref(), Some("a@s.whatsapp.net"));
        assert_eq!(node.attribute("to"), None);
    }

    #[test]
    fn test_children() {
        let node = Node::new("stream:features")
            .unwrap()
            .with_child(Node::new("receipt_acks").unwrap())
            .with_child(Node::new("status").unwrap());

        assert!(node.has_child("status"));
        assert!(!node.has_child("w:profile:picture"));
        assert_eq!(node.child("receipt_acks").map(|c| c.name()), Some("receipt_acks"));
    }

    #[test]
    fn test_display() {
        let node = Node::new("body")
            .unwrap()
            .with_attribute("id", "1")
            .with_data("hello");
        assert_eq!(node.to_string(), "<body id=\"1\">\nhello\n</body>\n");

        let big = Node::new("media").unwrap().with_data(vec![0u8; 2000]);
        assert!(big.to_string().contains(" 2000 byte data"));
    }

    #[test]
    fn test_nested_display_indents() {
        let node = Node::new("iq")
            .unwrap()
            .with_child(Node::new("ping").unwrap());
        assert_eq!(node.to_string(), "<iq>\n  <ping>\n  </ping>\n</iq>\n");
    }

    #[test]
    fn test_serde_roundtrip() {
        let node = Node::new("presence")
            .unwrap()
            .with_attribute("type", "available")
            .with_attribute("name", "Alice");
        let json = serde_json::to_string(&node).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }
}
