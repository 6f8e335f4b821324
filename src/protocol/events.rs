//! Session events and the listener registry.
//!
//! The session owns its registry; there is no global bus. Listeners are
//! keyed by event name and called synchronously, in registration order, on
//! the session's thread.
//!
//! | Pattern              | Matches                               |
//! |----------------------|---------------------------------------|
//! | `onLogin`            | exactly that event                    |
//! | `received.node.*`    | every name starting `received.node.`  |
//! | `*`                  | everything                            |

use std::sync::mpsc::{self, Receiver};

use crate::node::Node;

/// Something the session reports to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// About to open the socket.
    ConnectPre,
    /// Socket open.
    ConnectSuccess {
        /// Remote address.
        peer: String,
    },
    /// Socket could not be opened.
    ConnectError {
        /// Failure description.
        reason: String,
    },
    /// Socket closed by `disconnect`.
    DisconnectSuccess,
    /// A node is about to be written.
    NodeSent(Node),
    /// A node was parsed from the stream.
    NodeReceived(Node),
    /// Login completed.
    Login {
        /// Account phone number.
        phone: String,
    },
    /// The server answered the login with `failure`.
    LoginFailed {
        /// Account phone number.
        phone: String,
        /// The raw `failure` node.
        node: Node,
    },
    /// Presence was sent.
    SendPresence {
        /// Account phone number.
        phone: String,
        /// Presence type.
        kind: String,
        /// Nickname.
        name: String,
    },
    /// The socket closed under the session.
    Close {
        /// Account phone number.
        phone: String,
        /// Diagnostic reason.
        reason: String,
    },
}

impl Event {
    /// Name listeners subscribe to.
    pub fn name(&self) -> String {
        match self {
            Event::ConnectPre => "connect.pre".to_string(),
            Event::ConnectSuccess { .. } => "connect.success".to_string(),
            Event::ConnectError { .. } => "connect.error".to_string(),
            Event::DisconnectSuccess => "disconnect.success".to_string(),
            Event::NodeSent(_) => "node.sent".to_string(),
            Event::NodeReceived(node) => format!("received.node.{}", node.name()),
            Event::Login { .. } => "onLogin".to_string(),
            Event::LoginFailed { .. } => "onLoginFailed".to_string(),
            Event::SendPresence { .. } => "onSendPresence".to_string(),
            Event::Close { .. } => "onClose".to_string(),
        }
    }

    /// Node carried by the event, if any.
    pub fn node(&self) -> Option<&Node> {
        match self {
            Event::NodeSent(node) | Event::NodeReceived(node) => Some(node),
            Event::LoginFailed { node, .. } => Some(node),
            _ => None,
        }
    }
}

/// Boxed listener callback.
pub type Listener = Box<dyn FnMut(&Event) + Send>;

/// Handle returned by [`EventRegistry::on`], used to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Ordered, pattern-keyed listener list.
#[derive(Default)]
pub struct EventRegistry {
    listeners: Vec<(ListenerId, String, Listener)>,
    next_id: u64,
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn matches(pattern: &str, name: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match pattern.strip_suffix('*') {
        Some(prefix) if prefix.ends_with('.') => name.starts_with(prefix),
        _ => pattern == name,
    }
}

impl EventRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for events matching `pattern`.
    pub fn on<F>(&mut self, pattern: impl Into<String>, listener: F) -> ListenerId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, pattern.into(), Box::new(listener)));
        id
    }

    /// Deliver matching events into a channel the application drains.
    pub fn subscribe(&mut self, pattern: impl Into<String>) -> Receiver<Event> {
        let (tx, rx) = mpsc::channel();
        self.on(pattern, move |event| {
            // A dropped receiver just stops listening
            let _ = tx.send(event.clone());
        });
        rx
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _, _)| *lid != id);
        before != self.listeners.len()
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Call every matching listener. Returns how many were called.
    pub fn emit(&mut self, event: &Event) -> usize {
        let name = event.name();
        let mut called = 0;
        for (_, pattern, listener) in &mut self.listeners {
            if matches(pattern, &name) {
                listener(event);
                called += 1;
            }
        }
        tracing::trace!(event = %name, listeners = called, "emit");
        called
    }
}
