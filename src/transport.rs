use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::instrument;

/// Size of the buffer used for every datagram read.
pub const RESPONSE_READ_BUFFER_SIZE: usize = 4096;

/// Datagram connection to one device.
///
/// `send` may be called from several tasks at once. Only one task may read
/// with `recv` at a time; every receive loop in this crate consumes and
/// discards datagrams that are not meant for it.
#[async_trait]
pub trait Connection: Send + Sync + std::fmt::Debug {
    /// Writes one datagram and returns the number of bytes written.
    async fn send(&self, datagram: &[u8]) -> io::Result<usize>;

    /// Reads one datagram into `buf` and returns its length.
    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;
}

/// UDP connection bound to an ephemeral local port and connected to one peer.
#[derive(Debug)]
pub struct UdpConnection {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UdpConnection {
    /// Binds an ephemeral socket and connects it to `peer`.
    ///
    /// # Errors
    ///
    /// Returns socket errors from binding or connecting.
    #[instrument(level = "debug")]
    pub async fn connect(peer: SocketAddr) -> io::Result<Self> {
        let local: SocketAddr = if peer.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0_u16; 8], 0))
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(peer).await?;
        Ok(Self { socket, peer })
    }

    #[must_use]
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

#[async_trait]
impl Connection for UdpConnection {
    async fn send(&self, datagram: &[u8]) -> io::Result<usize> {
        self.socket.send(datagram).await
    }

    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket.recv(buf).await
    }
}
