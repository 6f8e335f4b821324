//! End-to-end login tests.
//!
//! The server side is played by a `MemoryPeer` plus a plain `NodeWriter` /
//! `NodeReader` pair keyed the way a real server would key them.

use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use funxmpp::codec::{NodeReader, NodeWriter, STREAM_PREAMBLE};
use funxmpp::config::{ClientConfig, Config, ServerConfig};
use funxmpp::crypto::{derive_session_key, KeyStream};
use funxmpp::protocol::{ChallengeStore, Event, MemoryChallengeStore, Session, SessionState};
use funxmpp::transport::{MemoryPeer, MemoryTransport};
use funxmpp::{FunXmppError, Node, Result};

const NUMBER: &str = "34600111222";

fn password() -> String {
    BASE64.encode(b"account-secret-20byt")
}

fn config(retries: u32, chunk: usize) -> Config {
    Config {
        server: ServerConfig {
            read_chunk_size: chunk,
            ..ServerConfig::default()
        },
        client: ClientConfig {
            challenge_file: None,
            login_retries: retries,
            ..ClientConfig::default()
        },
        ..Config::default()
    }
}

fn connected(
    config: Config,
    store: MemoryChallengeStore,
) -> (Session<MemoryTransport>, MemoryPeer) {
    let mut session = Session::new(config, NUMBER, "Alice")
        .unwrap()
        .with_challenge_store(Box::new(store));
    let (transport, peer) = MemoryTransport::pair();
    session.attach(transport);
    (session, peer)
}

fn success_node(next_nonce: &[u8]) -> Node {
    Node::new("success")
        .unwrap()
        .with_attribute("t", "1400000000")
        .with_attribute("kind", "free")
        .with_attribute("status", "active")
        .with_attribute("creation", "1300000000")
        .with_attribute("expiration", "1500000000")
        .with_data(next_nonce)
}

/// Frames the client wrote: start node first (after the preamble), then one
/// frame per send.
fn sent_frames(peer: &MemoryPeer) -> Vec<Vec<u8>> {
    let mut frames = peer.take_sent();
    assert!(frames[0].starts_with(&STREAM_PREAMBLE));
    frames[0].drain(..STREAM_PREAMBLE.len());
    frames
}

fn parse_plain(frame: &[u8]) -> Node {
    NodeReader::new().next_tree(Some(frame)).unwrap().unwrap()
}

#[test]
fn test_login_with_cached_nonce() {
    let cached = b"cached-nonce-0123456".to_vec();
    let next = b"next-nonce-abcdefghi".to_vec();
    let store = MemoryChallengeStore::with_nonce(cached.clone());
    let (mut session, peer) = connected(config(10, 1024), store.clone());

    let key = derive_session_key(&password(), &cached).unwrap();
    let mut server_out = NodeWriter::new();
    server_out.set_key(KeyStream::new(&key));
    peer.push(&server_out.write_frame(Some(&success_node(&next))).unwrap());

    let presences = Arc::new(Mutex::new(0));
    let p = Arc::clone(&presences);
    session.on("onSendPresence", move |_| *p.lock().unwrap() += 1);
    let login_rx = session.events().subscribe("onLogin");

    session.login(&password()).unwrap();
    assert_eq!(session.state(), SessionState::LoggedIn);
    assert_eq!(store.get(), Some(next));
    assert_eq!(*presences.lock().unwrap(), 1);
    assert_eq!(login_rx.try_iter().count(), 1);

    let info = session.account().unwrap();
    assert_eq!(info.kind.as_deref(), Some("free"));
    assert_eq!(info.expiration, Some(1500000000));

    let frames = sent_frames(&peer);
    assert_eq!(frames.len(), 4, "start, features, auth, presence");
    assert_eq!(parse_plain(&frames[0]).name(), "start");
    assert_eq!(parse_plain(&frames[1]).name(), "stream:features");

    let auth = parse_plain(&frames[2]);
    assert_eq!(auth.name(), "auth");
    assert_eq!(auth.attribute("mechanism"), Some("WAUTH-1"));
    assert_eq!(auth.attribute("user"), Some(NUMBER));

    let mut server_in = KeyStream::new(&key).with_tag_verification(true);
    let blob = server_in.decode(auth.data().unwrap()).unwrap();
    let mut expected_prefix = NUMBER.as_bytes().to_vec();
    expected_prefix.extend_from_slice(&cached);
    assert!(blob.starts_with(&expected_prefix));
    assert!(blob.ends_with(b" MccMnc/214001"));

    let mut reader = NodeReader::new();
    reader.set_key(server_in);
    let presence = reader.next_tree(Some(&frames[3])).unwrap().unwrap();
    assert_eq!(presence.name(), "presence");
    assert_eq!(presence.attribute("type"), Some("available"));
    assert_eq!(presence.attribute("name"), Some("Alice"));
}

#[test]
fn test_login_with_challenge() {
    let nonce = b"server-challenge-xyz".to_vec();
    let next = b"following-nonce-1234".to_vec();
    let store = MemoryChallengeStore::new();
    let (mut session, peer) = connected(config(10, 1024), store.clone());

    let key = derive_session_key(&password(), &nonce).unwrap();
    let mut server_plain = NodeWriter::new();
    let challenge = Node::new("challenge")
        .unwrap()
        .with_attribute("xmlns", "urn:ietf:params:xml:ns:xmpp-sasl")
        .with_data(nonce.clone());
    peer.push(&server_plain.write_frame(Some(&challenge)).unwrap());

    let mut server_out = NodeWriter::new();
    server_out.set_key(KeyStream::new(&key));
    peer.push(&server_out.write_frame(Some(&success_node(&next))).unwrap());

    session.login(&password()).unwrap();
    assert!(session.is_logged_in());
    assert_eq!(store.get(), Some(next));

    let frames = sent_frames(&peer);
    assert_eq!(frames.len(), 5, "start, features, auth, response, presence");
    let auth = parse_plain(&frames[2]);
    assert!(auth.data().is_none());

    let response = parse_plain(&frames[3]);
    assert_eq!(response.name(), "response");
    let mut server_in = KeyStream::new(&key).with_tag_verification(true);
    let blob = server_in.decode(response.data().unwrap()).unwrap();
    let mut expected_prefix = NUMBER.as_bytes().to_vec();
    expected_prefix.extend_from_slice(&nonce);
    assert!(blob.starts_with(&expected_prefix));

    let mut reader = NodeReader::new();
    reader.set_key(server_in);
    let presence = reader.next_tree(Some(&frames[4])).unwrap().unwrap();
    assert_eq!(presence.name(), "presence");
}

#[test]
fn test_login_failure() {
    let (mut session, peer) = connected(config(10, 1024), MemoryChallengeStore::new());

    let failure = Node::new("failure")
        .unwrap()
        .with_attribute("xmlns", "urn:ietf:params:xml:ns:xmpp-sasl")
        .with_child(Node::new("not-authorized").unwrap());
    peer.push(&NodeWriter::new().write_frame(Some(&failure)).unwrap());

    let failed = session.events().subscribe("onLoginFailed");
    let err = session.login(&password()).unwrap_err();
    assert!(
        matches!(&err, FunXmppError::AuthenticationFailed(reason) if reason == "not-authorized"),
        "{err}"
    );
    assert_eq!(session.state(), SessionState::Connected);

    let events: Vec<Event> = failed.try_iter().collect();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].node().map(Node::name), Some("failure"));
}

#[test]
fn test_login_across_partial_reads() {
    let cached = b"cached-nonce-0123456".to_vec();
    let next = b"next-nonce-abcdefghi".to_vec();
    let store = MemoryChallengeStore::with_nonce(cached.clone());
    // 3-byte reads split every frame header from its payload
    let (mut session, peer) = connected(config(500, 3), store);

    let key = derive_session_key(&password(), &cached).unwrap();
    let mut server_out = NodeWriter::new();
    server_out.set_key(KeyStream::new(&key));
    peer.push(&server_out.write_frame(Some(&success_node(&next))).unwrap());
    let msg = Node::new("message")
        .unwrap()
        .with_attribute("from", "34600999888@s.whatsapp.net")
        .with_attribute("id", "m-1")
        .with_child(Node::new("body").unwrap().with_data("hello there"));
    peer.push(&server_out.write_frame(Some(&msg)).unwrap());

    session.login(&password()).unwrap();
    assert!(session.is_logged_in());

    let mut received = Vec::new();
    for _ in 0..200 {
        session.poll_messages().unwrap();
        received.extend(session.take_messages());
        if !received.is_empty() {
            break;
        }
    }
    assert_eq!(received, vec![msg]);
}

#[test]
fn test_login_times_out_without_answer() {
    let (mut session, _peer) = connected(config(4, 1024), MemoryChallengeStore::new());
    let err = session.login(&password()).unwrap_err();
    assert!(matches!(err, FunXmppError::LoginTimeout { attempts: 4 }));
    assert_eq!(session.state(), SessionState::AwaitingChallenge);
}

#[test]
fn test_received_events_by_tag() {
    let (mut session, peer) = connected(config(4, 1024), MemoryChallengeStore::new());
    let iq_rx = session.events().subscribe("received.node.iq");
    let all_rx = session.events().subscribe("received.node.*");

    let mut writer = NodeWriter::new();
    peer.push(&writer.write_frame(Some(&Node::new("iq").unwrap())).unwrap());
    peer.push(&writer.write_frame(Some(&Node::new("ib").unwrap())).unwrap());
    assert_eq!(session.poll_messages().unwrap(), 2);

    assert_eq!(iq_rx.try_iter().count(), 1);
    let names: Vec<String> = all_rx.try_iter().map(|e| e.name()).collect();
    assert_eq!(names, ["received.node.iq", "received.node.ib"]);
}

/// Holds a nonce but cannot write a new one.
struct ReadOnlyStore(Vec<u8>);

impl ChallengeStore for ReadOnlyStore {
    fn load(&self) -> Result<Option<Vec<u8>>> {
        Ok(Some(self.0.clone()))
    }

    fn save(&mut self, _nonce: &[u8]) -> Result<()> {
        Err(std::io::Error::from(std::io::ErrorKind::PermissionDenied).into())
    }
}

#[test]
fn test_login_survives_unwritable_challenge_store() {
    let cached = b"cached-nonce-0123456".to_vec();
    let mut session = Session::new(config(10, 1024), NUMBER, "Alice")
        .unwrap()
        .with_challenge_store(Box::new(ReadOnlyStore(cached.clone())));
    let (transport, peer) = MemoryTransport::pair();
    session.attach(transport);

    let key = derive_session_key(&password(), &cached).unwrap();
    let mut server_out = NodeWriter::new();
    server_out.set_key(KeyStream::new(&key));
    peer.push(&server_out.write_frame(Some(&success_node(b"next"))).unwrap());

    session.login(&password()).unwrap();
    assert!(session.is_logged_in());
    assert!(session.is_connected());

    let frames = sent_frames(&peer);
    let auth = parse_plain(&frames[2]);
    let mut server_in = KeyStream::new(&key).with_tag_verification(true);
    server_in.decode(auth.data().unwrap()).unwrap();

    // presence after success goes out encrypted
    let presence_frame = &frames[3];
    assert_eq!(presence_frame[0], 0x80);
    let mut reader = NodeReader::new();
    reader.set_key(server_in);
    let presence = reader.next_tree(Some(presence_frame)).unwrap().unwrap();
    assert_eq!(presence.name(), "presence");
}
