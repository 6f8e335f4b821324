//! Byte transport for the FunXMPP session.
//!
//! The session is single-threaded and blocking: it writes whole frames and
//! polls for inbound bytes with a short read timeout. Any backend that can do
//! that plugs in through [`Transport`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               Session                    │
//! │         (Transport-Agnostic)            │
//! └──────────────────┬──────────────────────┘
//!                    │
//!          ┌────────┴────────┐
//!          ▼                 ▼
//! ┌─────────────────┐ ┌─────────────────┐
//! │  TcpTransport   │ │ MemoryTransport │
//! │  (std::net)     │ │  (in-process)   │
//! └─────────────────┘ └─────────────────┘
//! ```

mod memory;
mod tcp;

pub use memory::{MemoryPeer, MemoryTransport};
pub use tcp::TcpTransport;

use crate::error::Result;

/// Result of one blocking read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were written into the buffer.
    Data(usize),
    /// Nothing arrived before the read timeout.
    Timeout,
    /// The peer closed the connection.
    Eof,
}

/// Transport trait for pluggable byte-stream backends.
pub trait Transport: Send {
    /// Write all of `data`.
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Read whatever is available into `buf`, waiting at most the read timeout.
    fn recv(&mut self, buf: &mut [u8]) -> Result<ReadOutcome>;

    /// Close the connection. Safe to call more than once.
    fn close(&mut self);

    /// Whether the connection is still open.
    fn is_open(&self) -> bool;

    /// Transport name for logging.
    fn name(&self) -> &'static str;

    /// Remote address as a string.
    fn peer_addr(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_is_object_safe() {
        let (transport, _peer) = MemoryTransport::pair();
        let boxed: Box<dyn Transport> = Box::new(transport);
        assert_eq!(boxed.name(), "memory");
    }
}
