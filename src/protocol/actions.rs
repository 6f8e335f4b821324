//! Convenience actions: build one node and hand it to the session.

use crate::error::Result;
use crate::node::Node;

/// Something that can be sent as a single node.
pub trait Action {
    /// Build the node to send.
    fn node(&self) -> Result<Node>;
}

/// Presence update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presence {
    /// Presence type, e.g. `available` or `unavailable`.
    pub kind: String,
    /// Nickname shown to contacts.
    pub name: String,
}

impl Presence {
    /// `available` presence with a nickname.
    pub fn available(name: impl Into<String>) -> Self {
        Self {
            kind: "available".to_string(),
            name: name.into(),
        }
    }
}

impl Action for Presence {
    fn node(&self) -> Result<Node> {
        Ok(Node::new("presence")?
            .with_attribute("type", self.kind.as_str())
            .with_attribute("name", self.name.as_str()))
    }
}

/// Receipt flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receipt {
    /// Message was received.
    Received,
    /// Acknowledge a server receipt.
    Ack,
}

impl Receipt {
    /// Child tag for this receipt.
    pub fn as_str(self) -> &'static str {
        match self {
            Receipt::Received => "received",
            Receipt::Ack => "ack",
        }
    }
}

/// Receipt for an incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageReceived {
    /// JID the receipt goes to.
    pub to: String,
    /// Id of the message being acknowledged.
    pub id: String,
    /// Receipt flavor.
    pub response: Receipt,
}

impl MessageReceived {
    /// Receipt for message `id` from `to`.
    pub fn new(to: impl Into<String>, id: impl Into<String>, response: Receipt) -> Self {
        Self {
            to: to.into(),
            id: id.into(),
            response,
        }
    }

    /// Build a receipt answering an incoming `message` node.
    pub fn for_message(message: &Node, response: Receipt) -> Option<Self> {
        Some(Self::new(
            message.attribute("from")?,
            message.attribute("id")?,
            response,
        ))
    }
}

impl Action for MessageReceived {
    fn node(&self) -> Result<Node> {
        Ok(Node::new("message")?
            .with_attribute("to", self.to.as_str())
            .with_attribute("type", "chat")
            .with_attribute("id", self.id.as_str())
            .with_attribute("t", chrono::Utc::now().timestamp().to_string())
            .with_child(
                Node::new(self.response.as_str())?.with_attribute("xmlns", "urn:xmpp:receipts"),
            ))
    }
}

/// Clear dirty-status categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearDirty {
    /// Category names to clean.
    pub categories: Vec<String>,
}

impl ClearDirty {
    /// Clean the given categories.
    pub fn new<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            categories: categories.into_iter().map(Into::into).collect(),
        }
    }

    /// Categories listed in a dirty `presence`/`ib` node.
    pub fn from_node(node: &Node) -> Self {
        Self::new(
            node.children()
                .iter()
                .filter(|c| c.name() == "category" || c.name() == "dirty")
                .filter_map(|c| c.attribute("name").or_else(|| c.attribute("type"))),
        )
    }
}

impl Action for ClearDirty {
    fn node(&self) -> Result<Node> {
        let mut clean = Node::new("clean")?.with_attribute("xmlns", "urn:xmpp:whatsapp:dirty");
        for category in &self.categories {
            clean.add_child(Node::new("category")?.with_attribute("name", category.as_str()));
        }
        Ok(Node::new("iq")?
            .with_attribute("type", "set")
            .with_attribute("to", "s.whatsapp.net")
            .with_child(clean))
    }
}
