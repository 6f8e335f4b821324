//! Connection and login state machine.
//!
//! Owns the socket, both codec directions, the cipher slots, the message-id
//! counter and the listener registry. Everything runs on the caller's thread;
//! there is no background pump, the application drives
//! [`Session::poll_messages`] from its own loop.

use std::collections::VecDeque;
use std::time::Instant;

use uuid::Uuid;
use zeroize::Zeroizing;

use super::actions::{Action, Presence};
use super::challenge::{ChallengeStore, FileChallengeStore, MemoryChallengeStore};
use super::events::{Event, EventRegistry, ListenerId};
use super::{AUTH_MECHANISM, CLOSE_REASON_EOF, MNC, SASL_NS};
use crate::codec::{NodeReader, NodeWriter};
use crate::config::Config;
use crate::crypto::{derive_session_key, KeyStream};
use crate::error::{FunXmppError, Result};
use crate::logging::{RedactedBytes, RedactedPhone};
use crate::node::{Node, Stanza, SuccessInfo};
use crate::phone::{LocalizationService, Phone};
use crate::transport::{ReadOutcome, TcpTransport, Transport};

/// Session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No socket
    Disconnected,
    /// Socket open, not authenticated
    Connected,
    /// Empty auth sent, waiting for the server's challenge
    AwaitingChallenge,
    /// Auth blob or challenge response sent, waiting for `success`
    Authenticating,
    /// Logged in; steady-state message exchange
    LoggedIn,
}

/// FunXMPP client session
pub struct Session<T: Transport = TcpTransport> {
    /// Session ID
    id: Uuid,
    config: Config,
    phone: Phone,
    nickname: String,
    transport: Option<T>,
    state: SessionState,
    reader: NodeReader,
    writer: NodeWriter,
    password: Option<Zeroizing<String>>,
    /// Nonce the next key derivation uses
    challenge: Option<Vec<u8>>,
    /// Outbound cipher, installed on the writer once `success` arrives
    pending_output_key: Option<KeyStream>,
    store: Box<dyn ChallengeStore>,
    message_counter: u64,
    events: EventRegistry,
    messages: VecDeque<Node>,
    last_failure: Option<Node>,
    account: Option<SuccessInfo>,
    created_at: Instant,
    frames_sent: u64,
    frames_received: u64,
    bytes_sent: u64,
    bytes_received: u64,
}

impl<T: Transport> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("phone", &RedactedPhone(&self.phone.number))
            .field("state", &self.state)
            .field("reader_keyed", &self.reader.is_keyed())
            .field("writer_keyed", &self.writer.is_keyed())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Session<T> {
    /// Create a session for `number`, dissected with the embedded country table.
    pub fn new(config: Config, number: &str, nickname: impl Into<String>) -> Result<Self> {
        let phone = LocalizationService::new().dissect(number)?;
        Ok(Self::with_phone(config, phone, nickname))
    }

    /// Create a session for an already dissected phone.
    pub fn with_phone(config: Config, phone: Phone, nickname: impl Into<String>) -> Self {
        let store: Box<dyn ChallengeStore> = match &config.client.challenge_file {
            Some(path) => Box::new(FileChallengeStore::new(path.clone())),
            None => Box::new(MemoryChallengeStore::new()),
        };

        Self {
            id: Uuid::new_v4(),
            config,
            phone,
            nickname: nickname.into(),
            transport: None,
            state: SessionState::Disconnected,
            reader: NodeReader::new(),
            writer: NodeWriter::new(),
            password: None,
            challenge: None,
            pending_output_key: None,
            store,
            message_counter: 0,
            events: EventRegistry::new(),
            messages: VecDeque::new(),
            last_failure: None,
            account: None,
            created_at: Instant::now(),
            frames_sent: 0,
            frames_received: 0,
            bytes_sent: 0,
            bytes_received: 0,
        }
    }

    /// Replace the challenge nonce store.
    pub fn with_challenge_store(mut self, store: Box<dyn ChallengeStore>) -> Self {
        self.store = store;
        self
    }

    /// Session ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Account phone
    pub fn phone(&self) -> &Phone {
        &self.phone
    }

    /// Nickname sent with presence
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether a socket is open
    pub fn is_connected(&self) -> bool {
        self.transport.as_ref().is_some_and(Transport::is_open)
    }

    /// Whether login completed
    pub fn is_logged_in(&self) -> bool {
        self.state == SessionState::LoggedIn
    }

    /// Account details from the last `success`
    pub fn account(&self) -> Option<&SuccessInfo> {
        self.account.as_ref()
    }

    /// Listener registry
    pub fn events(&mut self) -> &mut EventRegistry {
        &mut self.events
    }

    /// Register a listener, see [`EventRegistry::on`]
    pub fn on<F>(&mut self, pattern: impl Into<String>, listener: F) -> ListenerId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.events.on(pattern, listener)
    }

    /// Use an already open transport.
    pub fn attach(&mut self, transport: T) {
        let peer = transport.peer_addr();
        tracing::info!(session = %self.id, transport = transport.name(), "Attached to {}", peer);
        self.transport = Some(transport);
        self.state = SessionState::Connected;
        self.events.emit(&Event::ConnectSuccess { peer });
    }

    /// Close the socket and forget both ciphers.
    pub fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.reset_crypto();
        self.reader.clear();
        self.state = SessionState::Disconnected;
        tracing::info!(session = %self.id, "Disconnected");
        self.events.emit(&Event::DisconnectSuccess);
    }

    /// Log in with the base64 account password.
    ///
    /// Sends the stream start, features and auth nodes, then polls until
    /// `success` arrives, the server answers `failure`, or the configured
    /// number of polls runs out. On success a presence is sent.
    pub fn login(&mut self, password: &str) -> Result<()> {
        if !self.is_connected() {
            return Err(FunXmppError::NotConnected);
        }

        self.reset_crypto();
        self.last_failure = None;
        self.password = Some(Zeroizing::new(password.to_string()));
        if let Some(nonce) = self.store.load()? {
            tracing::debug!(session = %self.id, nonce = %RedactedBytes(&nonce), "Using stored challenge");
            self.challenge = Some(nonce);
        }

        let resource = self.config.client.resource(self.config.server.port);
        let start = self.writer.start_stream(&self.config.server.domain, &resource)?;
        self.send_raw(&start)?;

        let features = Stanza::stream_features(self.config.client.profile_subscribe)?;
        self.send_node(features.into_node())?;

        let auth = self.create_auth_node()?;
        self.send_node(auth)?;
        self.state = if self.challenge.is_some() {
            SessionState::Authenticating
        } else {
            SessionState::AwaitingChallenge
        };
        tracing::info!(
            session = %self.id,
            phone = %RedactedPhone(&self.phone.number),
            state = ?self.state,
            "Login started"
        );

        let retries = self.config.client.login_retries;
        let mut attempts = 0;
        while self.state != SessionState::LoggedIn {
            if let Some(node) = self.last_failure.take() {
                self.state = SessionState::Connected;
                let reason = Stanza::from_node(node)
                    .failure_reason()
                    .unwrap_or("failure")
                    .to_string();
                tracing::warn!(session = %self.id, "Login failed: {}", reason);
                return Err(FunXmppError::AuthenticationFailed(reason));
            }
            if !self.is_connected() {
                return Err(FunXmppError::NotConnected);
            }
            if attempts >= retries {
                tracing::warn!(session = %self.id, attempts, "Login timed out");
                return Err(FunXmppError::LoginTimeout { attempts });
            }
            attempts += 1;
            self.poll_messages()?;
        }

        tracing::info!(session = %self.id, attempts, "Logged in");
        self.events.emit(&Event::Login {
            phone: self.phone.number.clone(),
        });
        self.send_presence("available")?;
        Ok(())
    }

    /// Send a presence update with the session nickname.
    pub fn send_presence(&mut self, kind: &str) -> Result<()> {
        let presence = Presence {
            kind: kind.to_string(),
            name: self.nickname.clone(),
        };
        self.send_node(presence.node()?)?;
        self.events.emit(&Event::SendPresence {
            phone: self.phone.number.clone(),
            kind: presence.kind,
            name: presence.name,
        });
        Ok(())
    }

    /// Build an action's node and send it.
    pub fn send_action(&mut self, action: &dyn Action) -> Result<String> {
        let node = action.node()?;
        self.send_node(node)
    }

    /// Send one node, assigning an `id` attribute when it has none.
    /// Returns the node's id.
    pub fn send_node(&mut self, mut node: Node) -> Result<String> {
        let id = match node.attribute("id") {
            Some(id) => id.to_string(),
            None => {
                let id = self.create_message_id(node.name());
                node.set_attribute("id", id.as_str());
                id
            }
        };

        self.events.emit(&Event::NodeSent(node.clone()));
        let frame = self.writer.write_frame(Some(&node))?;
        tracing::debug!(session = %self.id, tag = node.name(), len = frame.len(), "Sending node");
        self.send_raw(&frame)?;
        self.frames_sent += 1;
        Ok(id)
    }

    /// Next stanza id for `prefix`: `<prefix>-<unix seconds>-<counter>`.
    pub fn create_message_id(&mut self, prefix: &str) -> String {
        let id = format!(
            "{}-{}-{}",
            prefix,
            chrono::Utc::now().timestamp(),
            self.message_counter
        );
        self.message_counter += 1;
        id
    }

    /// Read once from the socket and handle every complete frame buffered.
    /// Returns the number of nodes handled.
    pub fn poll_messages(&mut self) -> Result<usize> {
        let transport = self.transport.as_mut().ok_or(FunXmppError::NotConnected)?;
        let mut buf = vec![0u8; self.config.server.read_chunk_size.max(1)];

        match transport.recv(&mut buf) {
            Ok(ReadOutcome::Data(n)) => {
                self.bytes_received += n as u64;
                self.process_inbound(Some(&buf[..n]))
            }
            Ok(ReadOutcome::Timeout) => Ok(0),
            Ok(ReadOutcome::Eof) => {
                self.close_on_error(CLOSE_REASON_EOF);
                Ok(0)
            }
            Err(e) => {
                self.close_on_error(&e.to_string());
                Err(e)
            }
        }
    }

    /// Drain queued inbound `message` nodes.
    pub fn take_messages(&mut self) -> Vec<Node> {
        self.messages.drain(..).collect()
    }

    /// Get session statistics
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            session_id: self.id.to_string(),
            state: self.state,
            frames_sent: self.frames_sent,
            frames_received: self.frames_received,
            bytes_sent: self.bytes_sent,
            bytes_received: self.bytes_received,
            uptime_secs: self.created_at.elapsed().as_secs(),
        }
    }

    fn process_inbound(&mut self, input: Option<&[u8]>) -> Result<usize> {
        let mut input = input;
        let mut handled = 0;
        loop {
            match self.reader.next_tree(input.take()) {
                Ok(Some(node)) => {
                    if let Err(e) = self.handle_node(node) {
                        tracing::error!(session = %self.id, "Handler error: {}", e);
                        self.close_on_error(&e.to_string());
                        return Err(e);
                    }
                    handled += 1;
                }
                Ok(None) if self.reader.buffered() == 0 => break,
                Ok(None) => {}
                Err(e) if e.is_recoverable() => {
                    tracing::trace!(session = %self.id, "{}", e);
                    break;
                }
                Err(e) => {
                    tracing::error!(session = %self.id, "Stream error: {}", e);
                    self.close_on_error(&e.to_string());
                    return Err(e);
                }
            }
        }
        Ok(handled)
    }

    fn handle_node(&mut self, node: Node) -> Result<()> {
        self.frames_received += 1;
        tracing::debug!(session = %self.id, tag = node.name(), "Received node");
        self.events.emit(&Event::NodeReceived(node.clone()));

        match Stanza::from_node(node) {
            Stanza::Challenge(node) => {
                let nonce = node.data().unwrap_or_default().to_vec();
                tracing::debug!(session = %self.id, nonce = %RedactedBytes(&nonce), "Challenge received");
                self.challenge = Some(nonce);
                if matches!(
                    self.state,
                    SessionState::AwaitingChallenge | SessionState::Authenticating
                ) {
                    self.send_auth_response()?;
                }
            }
            success @ Stanza::Success(_) => {
                match self.pending_output_key.take() {
                    Some(key) => self.writer.set_key(key),
                    None => tracing::warn!(session = %self.id, "Success without a derived key"),
                }
                self.account = success.success_info();
                self.state = SessionState::LoggedIn;
                if let Some(nonce) = success.nonce() {
                    if let Err(e) = self.store.save(nonce) {
                        tracing::warn!(session = %self.id, "Failed to persist challenge: {}", e);
                    }
                }
            }
            Stanza::Failure(node) => {
                self.events.emit(&Event::LoginFailed {
                    phone: self.phone.number.clone(),
                    node: node.clone(),
                });
                self.last_failure = Some(node);
            }
            Stanza::Message(node) => self.messages.push_back(node),
            Stanza::StreamFeatures(_)
            | Stanza::Iq(_)
            | Stanza::Presence(_)
            | Stanza::Generic(_) => {}
        }
        Ok(())
    }

    /// Derive a fresh key pair from the password and the current nonce.
    /// Keys the reader and parks the outbound stream until `success`.
    fn derive_keys(&mut self) -> Result<(Vec<u8>, KeyStream)> {
        let nonce = self.challenge.clone().unwrap_or_default();
        let password = self
            .password
            .as_ref()
            .ok_or_else(|| FunXmppError::AuthenticationFailed("no password set".to_string()))?;
        let key = derive_session_key(password.as_str(), &nonce)?;

        let input = KeyStream::new(&key).with_tag_verification(self.config.client.verify_tags);
        self.reader.set_key(input);
        Ok((nonce, KeyStream::new(&key)))
    }

    fn create_auth_node(&mut self) -> Result<Node> {
        let mut auth = Node::new("auth")?
            .with_attribute("xmlns", SASL_NS)
            .with_attribute("mechanism", AUTH_MECHANISM)
            .with_attribute("user", self.phone.number.as_str());

        if self.challenge.is_some() {
            let (nonce, mut output) = self.derive_keys()?;
            let mut blob = Zeroizing::new(Vec::new());
            blob.extend_from_slice(self.phone.number.as_bytes());
            blob.extend_from_slice(&nonce);
            blob.extend_from_slice(chrono::Utc::now().timestamp().to_string().as_bytes());
            blob.extend_from_slice(self.config.client.user_agent.as_bytes());
            blob.extend_from_slice(b" MccMnc/");
            blob.extend_from_slice(self.phone.mcc_padded().as_bytes());
            blob.extend_from_slice(MNC.as_bytes());

            auth.set_data(Some(output.encode(&blob, false)));
            self.pending_output_key = Some(output);
        }
        Ok(auth)
    }

    fn send_auth_response(&mut self) -> Result<()> {
        let (nonce, mut output) = self.derive_keys()?;
        let mut blob = Zeroizing::new(Vec::new());
        blob.extend_from_slice(self.phone.number.as_bytes());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(chrono::Utc::now().timestamp().to_string().as_bytes());

        let response = Node::new("response")?
            .with_attribute("xmlns", SASL_NS)
            .with_data(output.encode(&blob, false));
        self.pending_output_key = Some(output);
        self.state = SessionState::Authenticating;
        self.send_node(response)?;
        Ok(())
    }

    fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        let transport = self.transport.as_mut().ok_or(FunXmppError::NotConnected)?;
        if let Err(e) = transport.send(data) {
            self.close_on_error(&e.to_string());
            return Err(e);
        }
        self.bytes_sent += data.len() as u64;
        Ok(())
    }

    fn reset_crypto(&mut self) {
        self.reader.reset_key();
        self.writer.reset_key();
        self.pending_output_key = None;
    }

    fn close_on_error(&mut self, reason: &str) {
        if self.transport.is_none() && self.state == SessionState::Disconnected {
            return;
        }
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.reset_crypto();
        self.reader.clear();
        self.state = SessionState::Disconnected;
        tracing::warn!(session = %self.id, "Closing session: {}", reason);
        self.events.emit(&Event::Close {
            phone: self.phone.number.clone(),
            reason: reason.to_string(),
        });
    }
}

impl Session<TcpTransport> {
    /// Open a TCP connection to the configured server.
    pub fn connect(&mut self) -> Result<()> {
        self.events.emit(&Event::ConnectPre);
        let server = &self.config.server;
        match TcpTransport::connect(
            &server.host,
            server.port,
            server.connect_timeout(),
            server.read_timeout(),
        ) {
            Ok(transport) => {
                self.attach(transport);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(session = %self.id, "Connect failed: {}", e);
                self.events.emit(&Event::ConnectError {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }
}

/// Session statistics
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// Session ID
    pub session_id: String,
    /// Current state
    pub state: SessionState,
    /// Frames written
    pub frames_sent: u64,
    /// Nodes parsed
    pub frames_received: u64,
    /// Bytes written
    pub bytes_sent: u64,
    /// Bytes read
    pub bytes_received: u64,
    /// Session uptime in seconds
    pub uptime_secs: u64,
}
