//! Blocking TCP transport over `std::net`.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::{ReadOutcome, Transport};
use crate::error::{FunXmppError, Result};

/// TCP connection to the chat server.
#[derive(Debug)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
    peer: SocketAddr,
}

impl TcpTransport {
    /// Resolve `host:port` and connect to the first address that answers
    /// within `connect_timeout`. Reads wait at most `read_timeout`.
    pub fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self> {
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|e| FunXmppError::ConnectFailure(format!("{}:{}: {}", host, port, e)))?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, connect_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(read_timeout))?;
                    stream.set_nodelay(true)?;
                    tracing::info!("TCP transport connected to {}", addr);
                    return Ok(Self {
                        stream: Some(stream),
                        peer: addr,
                    });
                }
                Err(e) => {
                    tracing::debug!("Connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(FunXmppError::ConnectFailure(match last_err {
            Some(e) => format!("{}:{}: {}", host, port, e),
            None => format!("{}:{}: no addresses resolved", host, port),
        }))
    }

    fn stream(&mut self) -> Result<&mut TcpStream> {
        self.stream.as_mut().ok_or(FunXmppError::NotConnected)
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream()?;
        stream.write_all(data)?;
        stream.flush()?;
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        match self.stream()?.read(buf) {
            Ok(0) => Ok(ReadOutcome::Eof),
            Ok(n) => Ok(ReadOutcome::Data(n)),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Ok(ReadOutcome::Timeout)
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(ReadOutcome::Timeout),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn name(&self) -> &'static str {
        "tcp"
    }

    fn peer_addr(&self) -> String {
        self.peer.to_string()
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_tcp_roundtrip_and_eof() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = std::thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4];
            sock.read_exact(&mut buf).unwrap();
            sock.write_all(&buf).unwrap();
            // dropping closes the socket
        });

        let mut t = TcpTransport::connect(
            "127.0.0.1",
            port,
            Duration::from_secs(2),
            Duration::from_secs(2),
        )
        .unwrap();
        assert!(t.is_open());
        assert_eq!(t.name(), "tcp");
        t.send(b"WA\x01\x02").unwrap();

        let mut buf = [0u8; 16];
        let mut got = Vec::new();
        loop {
            match t.recv(&mut buf).unwrap() {
                ReadOutcome::Data(n) => got.extend_from_slice(&buf[..n]),
                ReadOutcome::Timeout => continue,
                ReadOutcome::Eof => break,
            }
        }
        assert_eq!(got, b"WA\x01\x02");
        server.join().unwrap();

        t.close();
        assert!(!t.is_open());
        assert!(matches!(t.send(b"x"), Err(FunXmppError::NotConnected)));
    }

    #[test]
    fn test_tcp_connect_refused() {
        // Bind then drop to find a port with nothing listening
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let err = TcpTransport::connect(
            "127.0.0.1",
            port,
            Duration::from_millis(500),
            Duration::from_millis(500),
        )
        .unwrap_err();
        assert!(matches!(err, FunXmppError::ConnectFailure(_)));
    }
}
