//! Datagram socket capability
//!
//! The workers only see this trait; the std [`UdpSocket`] impl is what
//! runs in production. `unblock_read` is the portable cancellation
//! mechanism for a blocking receive: a zero-length datagram sent to the
//! socket's own bound port makes `recv_from` return, after which the
//! worker observes the shutdown flag. Closing the socket from another
//! thread does not reliably interrupt a blocked read on all platforms.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs, UdpSocket};

use crate::error::NetworkError;

/// UDP send/receive plus read cancellation.
pub trait Datagram: Send + Sync {
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize>;
    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;
    fn local_addr(&self) -> io::Result<SocketAddr>;
    /// Make a concurrent blocking [`Datagram::recv_from`] return.
    fn unblock_read(&self) -> io::Result<()>;
}

impl Datagram for UdpSocket {
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, buf, addr)
    }

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::recv_from(self, buf)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        UdpSocket::local_addr(self)
    }

    fn unblock_read(&self) -> io::Result<()> {
        let port = self.local_addr()?.port();
        UdpSocket::send_to(self, &[], (Ipv4Addr::LOCALHOST, port)).map(|_| ())
    }
}

/// Bind the client voice socket on an ephemeral port.
pub fn bind_voice_socket() -> Result<UdpSocket, NetworkError> {
    UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .map_err(|e| NetworkError::BindFailed(e.to_string()))
}

/// Resolve the relay server hostname once; the first resolved address is
/// used for the lifetime of both workers.
pub fn resolve_server_addr(host: &str, port: u16) -> Result<SocketAddr, NetworkError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|e| NetworkError::DnsFailed(host.to_string(), e.to_string()))?;
    addrs
        .next()
        .ok_or_else(|| NetworkError::DnsFailed(host.to_string(), "no addresses".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_localhost() {
        let addr = resolve_server_addr("127.0.0.1", 7700).unwrap();
        assert_eq!(addr.port(), 7700);
    }

    #[test]
    fn resolve_garbage_fails() {
        assert!(resolve_server_addr("definitely-not-a-host.invalid", 1).is_err());
    }

    #[test]
    fn unblock_read_interrupts_blocking_recv() {
        let socket = std::sync::Arc::new(bind_voice_socket().unwrap());
        let reader = socket.clone();
        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 16];
            reader.recv_from(&mut buf).map(|(n, _)| n)
        });
        // Give the reader a moment to block.
        std::thread::sleep(std::time::Duration::from_millis(50));
        socket.unblock_read().unwrap();
        let got = handle.join().unwrap().unwrap();
        assert_eq!(got, 0);
    }
}
