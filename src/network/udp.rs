//! UDP transport primitives
//!
//! Sockets are created through `socket2` so the receive buffer, read
//! timeout and shutdown are available, then handed to the worker threads as
//! plain `std::net::UdpSocket`s. The controller keeps a [`TransportHandle`]
//! (a duplicate descriptor) to wake a receiver parked in `recv_from`.

use parking_lot::Mutex;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, ToSocketAddrs};
use std::time::Duration;

pub use std::net::UdpSocket;

use crate::error::NetworkError;

/// Controller-side handle used to force a socket closed during shutdown
#[derive(Debug)]
pub struct TransportHandle {
    socket: Mutex<Option<Socket>>,
    local_addr: SocketAddr,
}

impl TransportHandle {
    fn new(socket: &UdpSocket) -> io::Result<Self> {
        Ok(Self {
            local_addr: socket.local_addr()?,
            socket: Mutex::new(Some(Socket::from(socket.try_clone()?))),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shut the socket down so a blocked receive returns.
    /// Only the first call does anything; returns whether it was this one.
    pub fn close(&self) -> bool {
        let Some(socket) = self.socket.lock().take() else {
            return false;
        };

        match socket.shutdown(Shutdown::Both) {
            Ok(()) => {}
            // Unconnected UDP sockets report ENOTCONN yet still wake readers
            Err(e) if e.kind() == io::ErrorKind::NotConnected => {}
            Err(e) => tracing::debug!("Transport shutdown on {}: {}", self.local_addr, e),
        }
        tracing::debug!("Transport {} closed", self.local_addr);
        true
    }

    pub fn is_closed(&self) -> bool {
        self.socket.lock().is_none()
    }
}

/// How a failed receive should be treated by the receive loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvErrorKind {
    /// Read timeout or interrupted call: nothing arrived, check the flag
    Idle,
    /// The socket was shut down under us: leave the loop quietly
    Closed,
    /// Anything else: log, count and keep receiving
    Transient,
}

/// `shutting_down` is true once the flag is raised or the transport is
/// closed; any error after that point means the socket was shut down.
pub fn classify_recv_error(err: &io::Error, shutting_down: bool) -> RecvErrorKind {
    if shutting_down {
        return RecvErrorKind::Closed;
    }
    match err.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted => {
            RecvErrorKind::Idle
        }
        io::ErrorKind::NotConnected
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe => RecvErrorKind::Closed,
        _ => RecvErrorKind::Transient,
    }
}

/// Create an unconnected datagram socket bound to `addr`
pub fn create_socket(
    addr: SocketAddr,
    recv_buffer_size: Option<usize>,
    read_timeout: Option<Duration>,
) -> Result<(UdpSocket, TransportHandle), NetworkError> {
    let bind_failed = |source: io::Error| NetworkError::BindFailed { addr, source };

    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))
        .map_err(bind_failed)?;

    if let Some(size) = recv_buffer_size {
        // The OS may clamp this; a smaller buffer is not fatal
        if let Err(e) = socket.set_recv_buffer_size(size) {
            tracing::warn!("Failed to set receive buffer to {} bytes: {}", size, e);
        }
    }

    socket.bind(&addr.into()).map_err(bind_failed)?;
    socket.set_read_timeout(read_timeout).map_err(bind_failed)?;

    let socket: UdpSocket = socket.into();
    let handle = TransportHandle::new(&socket).map_err(bind_failed)?;
    Ok((socket, handle))
}

/// Bind the listening socket for the receive path
pub fn bind_receiver(
    bind_address: IpAddr,
    port: u16,
    recv_buffer_size: usize,
    read_timeout: Duration,
) -> Result<(UdpSocket, TransportHandle), NetworkError> {
    let addr = SocketAddr::new(bind_address, port);
    let (socket, handle) = create_socket(addr, Some(recv_buffer_size), Some(read_timeout))?;
    tracing::info!("Listening on {}", handle.local_addr());
    Ok((socket, handle))
}

/// Bind an ephemeral local socket for sending to `target`
pub fn bind_sender(target: SocketAddr) -> Result<(UdpSocket, TransportHandle), NetworkError> {
    let local = match target {
        SocketAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        SocketAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
    };
    create_socket(local, None, None)
}

/// Resolve `host:port` to the first usable address
pub fn resolve_target(host: &str, port: u16) -> Result<SocketAddr, NetworkError> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| NetworkError::InvalidAddress(format!("{}:{}: {}", host, port, e)))?
        .next()
        .ok_or_else(|| NetworkError::InvalidAddress(format!("{}:{}", host, port)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    fn localhost() -> IpAddr {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    }

    #[test]
    fn test_bind_ephemeral() {
        let (socket, handle) = bind_receiver(localhost(), 0, 64 * 1024, Duration::from_millis(50)).unwrap();
        assert_ne!(handle.local_addr().port(), 0);
        assert_eq!(socket.local_addr().unwrap(), handle.local_addr());
        assert_eq!(socket.read_timeout().unwrap(), Some(Duration::from_millis(50)));
    }

    #[test]
    fn test_port_in_use_is_bind_failure() {
        let (_first, handle) = bind_receiver(localhost(), 0, 64 * 1024, Duration::from_millis(50)).unwrap();
        let port = handle.local_addr().port();

        let result = bind_receiver(localhost(), port, 64 * 1024, Duration::from_millis(50));
        assert!(matches!(result, Err(NetworkError::BindFailed { .. })));
    }

    #[test]
    fn test_close_is_idempotent() {
        let (_socket, handle) = bind_receiver(localhost(), 0, 64 * 1024, Duration::from_millis(50)).unwrap();
        assert!(!handle.is_closed());
        assert!(handle.close());
        assert!(handle.is_closed());
        assert!(!handle.close());
    }

    #[test]
    fn test_close_wakes_blocked_receive() {
        // Long timeout so only the shutdown can wake the receive promptly
        let (socket, handle) = bind_receiver(localhost(), 0, 64 * 1024, Duration::from_secs(10)).unwrap();

        let receiver = thread::spawn(move || {
            let mut buf = [0u8; 16];
            socket.recv_from(&mut buf).map(|(n, _)| n)
        });

        thread::sleep(Duration::from_millis(50));
        let started = Instant::now();
        assert!(handle.close());
        let result = receiver.join().unwrap();
        assert!(started.elapsed() < Duration::from_millis(200));

        // Woken, not timed out: either an empty read or a closed-socket error
        match result {
            Ok(n) => assert_eq!(n, 0),
            Err(e) => assert_ne!(classify_recv_error(&e, false), RecvErrorKind::Idle),
        }
    }

    #[test]
    fn test_classify_recv_error() {
        let timeout = io::Error::from(io::ErrorKind::WouldBlock);
        assert_eq!(classify_recv_error(&timeout, false), RecvErrorKind::Idle);
        assert_eq!(classify_recv_error(&timeout, true), RecvErrorKind::Closed);

        let aborted = io::Error::from(io::ErrorKind::ConnectionAborted);
        assert_eq!(classify_recv_error(&aborted, false), RecvErrorKind::Closed);

        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert_eq!(classify_recv_error(&refused, false), RecvErrorKind::Transient);
        assert_eq!(classify_recv_error(&refused, true), RecvErrorKind::Closed);
    }

    #[test]
    fn test_resolve_target() {
        let addr = resolve_target("127.0.0.1", 5000).unwrap();
        assert_eq!(addr, SocketAddr::new(localhost(), 5000));
        assert!(resolve_target("not a host name", 5000).is_err());
    }
}
