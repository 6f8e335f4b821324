//! Typed views over the tags the session reacts to.
//!
//! A single factory picks the variant by tag name; anything unknown is
//! `Generic`. Every variant still owns the full [`Node`].

use super::Node;
use crate::error::Result;

/// Child tag that subscribes to profile picture updates.
const PROFILE_PICTURE: &str = "w:profile:picture";

/// Node classified by tag name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stanza {
    /// `challenge`: data is the server nonce.
    Challenge(Node),
    /// `success`: login accepted, data is the next nonce.
    Success(Node),
    /// `failure`: login rejected.
    Failure(Node),
    /// `stream:features`
    StreamFeatures(Node),
    /// `iq`
    Iq(Node),
    /// `message`
    Message(Node),
    /// `presence`
    Presence(Node),
    /// Any other tag.
    Generic(Node),
}

/// Account details carried by a `success` node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuccessInfo {
    /// Server time (`t`).
    pub timestamp: Option<i64>,
    /// Account kind, e.g. `free` or `paid`.
    pub kind: Option<String>,
    /// Account status, e.g. `active`.
    pub status: Option<String>,
    /// Account creation time.
    pub creation: Option<i64>,
    /// Account expiration time.
    pub expiration: Option<i64>,
}

impl Stanza {
    /// Build a node from its parts and classify it.
    pub fn from_fields(
        tag: &str,
        attributes: Vec<(String, String)>,
        data: Option<Vec<u8>>,
        children: Vec<Node>,
    ) -> Result<Self> {
        Ok(Self::from_node(Node::from_parts(
            tag, attributes, data, children,
        )?))
    }

    /// Classify an existing node.
    pub fn from_node(node: Node) -> Self {
        match node.name() {
            "challenge" => Stanza::Challenge(node),
            "success" => Stanza::Success(node),
            "failure" => Stanza::Failure(node),
            "stream:features" => Stanza::StreamFeatures(node),
            "iq" => Stanza::Iq(node),
            "message" => Stanza::Message(node),
            "presence" => Stanza::Presence(node),
            _ => Stanza::Generic(node),
        }
    }

    /// Underlying node.
    pub fn node(&self) -> &Node {
        match self {
            Stanza::Challenge(n)
            | Stanza::Success(n)
            | Stanza::Failure(n)
            | Stanza::StreamFeatures(n)
            | Stanza::Iq(n)
            | Stanza::Message(n)
            | Stanza::Presence(n)
            | Stanza::Generic(n) => n,
        }
    }

    /// Take the underlying node.
    pub fn into_node(self) -> Node {
        match self {
            Stanza::Challenge(n)
            | Stanza::Success(n)
            | Stanza::Failure(n)
            | Stanza::StreamFeatures(n)
            | Stanza::Iq(n)
            | Stanza::Message(n)
            | Stanza::Presence(n)
            | Stanza::Generic(n) => n,
        }
    }

    /// Nonce bytes of a `challenge` or `success` node.
    pub fn nonce(&self) -> Option<&[u8]> {
        match self {
            Stanza::Challenge(n) | Stanza::Success(n) => n.data(),
            _ => None,
        }
    }

    /// Account details of a `success` node.
    pub fn success_info(&self) -> Option<SuccessInfo> {
        let Stanza::Success(n) = self else {
            return None;
        };
        let int = |key: &str| n.attribute(key).and_then(|v| v.parse().ok());
        Some(SuccessInfo {
            timestamp: int("t"),
            kind: n.attribute("kind").map(str::to_string),
            status: n.attribute("status").map(str::to_string),
            creation: int("creation"),
            expiration: int("expiration"),
        })
    }

    /// Reason of a `failure` node: the tag of its first child.
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Stanza::Failure(n) => n.children().first().map(Node::name),
            _ => None,
        }
    }

    /// `type` attribute of an `iq` node.
    pub fn iq_kind(&self) -> Option<&str> {
        match self {
            Stanza::Iq(n) => n.attribute("type"),
            _ => None,
        }
    }

    /// `to` attribute of an `iq` node.
    pub fn iq_to(&self) -> Option<&str> {
        match self {
            Stanza::Iq(n) => n.attribute("to"),
            _ => None,
        }
    }

    /// Stream features advertised at login.
    pub fn stream_features(profile_subscribe: bool) -> Result<Self> {
        let mut node = Node::new("stream:features")?;
        node.add_child(Node::new("receipt_acks")?);
        let mut features = Stanza::StreamFeatures(node);
        if profile_subscribe {
            features.add_profile_subscribe()?;
        }
        if let Stanza::StreamFeatures(n) = &mut features {
            n.add_child(Node::new("status")?);
        }
        Ok(features)
    }

    /// Whether a `stream:features` node subscribes to profile pictures.
    pub fn has_profile_subscribe(&self) -> bool {
        match self {
            Stanza::StreamFeatures(n) => n.has_child(PROFILE_PICTURE),
            _ => false,
        }
    }

    /// Add the profile picture subscription. No-op if already present or not
    /// a `stream:features` node.
    pub fn add_profile_subscribe(&mut self) -> Result<()> {
        if let Stanza::StreamFeatures(n) = self {
            if !n.has_child(PROFILE_PICTURE) {
                n.add_child(Node::new(PROFILE_PICTURE)?.with_attribute("type", "all"));
            }
        }
        Ok(())
    }

    /// Drop the profile picture subscription.
    pub fn remove_profile_subscribe(&mut self) {
        if let Stanza::StreamFeatures(n) = self {
            n.remove_children(PROFILE_PICTURE);
        }
    }
}

impl From<Node> for Stanza {
    fn from(node: Node) -> Self {
        Stanza::from_node(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_dispatch() {
        let s = Stanza::from_fields("challenge", vec![], Some(b"nonce".to_vec()), vec![]).unwrap();
        assert!(matches!(s, Stanza::Challenge(_)));
        assert_eq!(s.nonce(), Some(&b"nonce"[..]));

        let s = Stanza::from_fields("receipt", vec![], None, vec![]).unwrap();
        assert!(matches!(s, Stanza::Generic(_)));
        assert_eq!(s.nonce(), None);

        assert!(Stanza::from_fields("", vec![], None, vec![]).is_err());
    }

    #[test]
    fn test_success_info() {
        let node = Node::new("success")
            .unwrap()
            .with_attribute("t", "1391985981")
            .with_attribute("kind", "free")
            .with_attribute("status", "active")
            .with_attribute("creation", "1361461437")
            .with_attribute("expiration", "1424533437")
            .with_data("next-nonce");
        let info = Stanza::from_node(node).success_info().unwrap();
        assert_eq!(info.timestamp, Some(1391985981));
        assert_eq!(info.kind.as_deref(), Some("free"));
        assert_eq!(info.status.as_deref(), Some("active"));
        assert_eq!(info.expiration, Some(1424533437));
    }

    #[test]
    fn test_failure_reason() {
        let node = Node::new("failure")
            .unwrap()
            .with_child(Node::new("not-authorized").unwrap());
        assert_eq!(Stanza::from_node(node).failure_reason(), Some("not-authorized"));
    }

    #[test]
    fn test_iq_accessors() {
        let node = Node::new("iq")
            .unwrap()
            .with_attribute("type", "get")
            .with_attribute("to", "s.whatsapp.net");
        let s = Stanza::from_node(node);
        assert_eq!(s.iq_kind(), Some("get"));
        assert_eq!(s.iq_to(), Some("s.whatsapp.net"));
    }

    #[test]
    fn test_stream_features_layout() {
        let plain = Stanza::stream_features(false).unwrap();
        let names: Vec<&str> = plain.node().children().iter().map(Node::name).collect();
        assert_eq!(names, ["receipt_acks", "status"]);
        assert!(!plain.has_profile_subscribe());

        let mut with_pic = Stanza::stream_features(true).unwrap();
        let names: Vec<&str> = with_pic.node().children().iter().map(Node::name).collect();
        assert_eq!(names, ["receipt_acks", "w:profile:picture", "status"]);
        assert!(with_pic.has_profile_subscribe());

        with_pic.remove_profile_subscribe();
        assert!(!with_pic.has_profile_subscribe());
    }
}
