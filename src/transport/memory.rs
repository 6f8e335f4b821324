//! In-process transport. The [`MemoryPeer`] half plays the server.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{ReadOutcome, Transport};
use crate::error::{FunXmppError, Result};

#[derive(Debug, Default)]
struct Shared {
    /// Bytes queued for the client.
    inbound: VecDeque<u8>,
    /// Writes made by the client, one entry per `send`.
    outbound: Vec<Vec<u8>>,
    peer_closed: bool,
    client_closed: bool,
    /// Next client read or write fails with this error.
    fault: Option<std::io::ErrorKind>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Client half. Reads never block: an empty queue is a timeout.
#[derive(Debug)]
pub struct MemoryTransport {
    shared: Arc<Mutex<Shared>>,
}

/// Server half.
#[derive(Debug, Clone)]
pub struct MemoryPeer {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryTransport {
    /// Connected client/peer pair.
    pub fn pair() -> (MemoryTransport, MemoryPeer) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        (
            MemoryTransport {
                shared: Arc::clone(&shared),
            },
            MemoryPeer { shared },
        )
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut shared = lock(&self.shared);
        if shared.client_closed {
            return Err(FunXmppError::NotConnected);
        }
        if let Some(kind) = shared.fault.take() {
            return Err(FunXmppError::Io(kind.into()));
        }
        if shared.peer_closed {
            return Err(FunXmppError::Io(std::io::ErrorKind::BrokenPipe.into()));
        }
        shared.outbound.push(data.to_vec());
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        let mut shared = lock(&self.shared);
        if shared.client_closed {
            return Err(FunXmppError::NotConnected);
        }
        if let Some(kind) = shared.fault.take() {
            return Err(FunXmppError::Io(kind.into()));
        }
        if shared.inbound.is_empty() {
            return Ok(if shared.peer_closed {
                ReadOutcome::Eof
            } else {
                ReadOutcome::Timeout
            });
        }
        let n = buf.len().min(shared.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(shared.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(ReadOutcome::Data(n))
    }

    fn close(&mut self) {
        lock(&self.shared).client_closed = true;
    }

    fn is_open(&self) -> bool {
        !lock(&self.shared).client_closed
    }

    fn name(&self) -> &'static str {
        "memory"
    }

    fn peer_addr(&self) -> String {
        "memory".to_string()
    }
}

impl MemoryPeer {
    /// Queue bytes for the client to read.
    pub fn push(&self, data: &[u8]) {
        lock(&self.shared).inbound.extend(data.iter().copied());
    }

    /// Take every write the client made so far.
    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut lock(&self.shared).outbound)
    }

    /// All client writes so far, concatenated.
    pub fn take_sent_bytes(&self) -> Vec<u8> {
        self.take_sent().concat()
    }

    /// Bytes still waiting for the client.
    pub fn pending(&self) -> usize {
        lock(&self.shared).inbound.len()
    }

    /// Close the server side. The client sees EOF once the queue is drained.
    pub fn close(&self) {
        lock(&self.shared).peer_closed = true;
    }

    /// Abort the connection: the next client read or write fails with
    /// `ConnectionReset`.
    pub fn reset(&self) {
        lock(&self.shared).fault = Some(std::io::ErrorKind::ConnectionReset);
    }

    /// Whether the client closed its half.
    pub fn client_closed(&self) -> bool {
        lock(&self.shared).client_closed
    }
}
