//! Fire-and-forget datagram channel between the HTTP and persistence workers.
//!
//! UDP on loopback: one datagram per form post, no acknowledgment, no retry,
//! no ordering. A send succeeds once the OS accepts the datagram, whether or
//! not anyone is listening. Payloads longer than the receiver's buffer are
//! truncated by the OS.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tokio::net::UdpSocket;

use crate::error::Error;

/// Producer side. Shared by every request handler.
#[derive(Debug)]
pub struct DatagramSender {
    socket: UdpSocket,
    target: SocketAddr,
}

impl DatagramSender {
    /// Binds an ephemeral local socket that sends to `target`.
    pub async fn bind(target: SocketAddr) -> Result<Self, Error> {
        let local = match target.ip() {
            IpAddr::V4(_) => SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 0),
            IpAddr::V6(_) => SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), 0),
        };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| Error::Bind { addr: local, source })?;
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Hands `payload` to the OS as a single datagram.
    pub async fn send(&self, payload: &[u8]) -> io::Result<usize> {
        self.socket.send_to(payload, self.target).await
    }
}

/// Consumer side. Owns the listening socket and a fixed receive buffer.
#[derive(Debug)]
pub struct DatagramReceiver {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl DatagramReceiver {
    pub async fn bind(addr: SocketAddr, buffer_size: usize) -> Result<Self, Error> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        Ok(Self { socket, buf: vec![0u8; buffer_size] })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn buffer_size(&self) -> usize {
        self.buf.len()
    }

    /// Waits for the next datagram. The returned slice is at most
    /// `buffer_size` bytes long and is only valid until the next call.
    pub async fn recv(&mut self) -> io::Result<(&[u8], SocketAddr)> {
        let (n, peer) = self.socket.recv_from(&mut self.buf).await?;
        Ok((&self.buf[..n], peer))
    }
}
