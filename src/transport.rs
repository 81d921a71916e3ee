//! TCP transport boundary.
//!
//! Thin wrapper around `tokio::net::TcpStream` giving the session a small,
//! swappable surface: open a connection, split it into owned halves for the
//! read loop and the writer task, and inspect the endpoints.
//!
//! # Example
//!
//! ```ignore
//! use natslink::transport::TcpTransport;
//!
//! let transport = TcpTransport::open("127.0.0.1", 4222).await?;
//! let (read_half, write_half) = transport.into_split();
//! ```

use std::net::SocketAddr;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::error::Result;

/// A connected TCP transport.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Open a connection to `host:port`.
    pub async fn open(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        Ok(Self { stream })
    }

    /// Split into owned read and write halves.
    pub fn into_split(self) -> (OwnedReadHalf, OwnedWriteHalf) {
        self.stream.into_split()
    }

    /// Remote endpoint address.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.stream.peer_addr()?)
    }

    /// Local endpoint address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.stream.local_addr()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_open_and_split() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let transport = TcpTransport::open("127.0.0.1", addr.port()).await.unwrap();
        assert_eq!(transport.peer_addr().unwrap(), addr);

        let (_read_half, _write_half) = transport.into_split();
        let (_stream, _peer) = listener.accept().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_refused_port_fails() {
        // Bind-then-drop guarantees the port is closed.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = TcpTransport::open("127.0.0.1", addr.port()).await;
        assert!(result.is_err());
    }
}
