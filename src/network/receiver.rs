//! Network receiver: datagrams → packet queue

use bytes::Bytes;
use std::net::UdpSocket;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::buffer::SharedQueue;
use crate::constants::MAX_PACKET_SIZE;
use crate::error::PipelineError;
use crate::network::udp::{classify_recv_error, RecvErrorKind, TransportHandle};
use crate::pipeline::stats::{add, bump, PipelineStats};
use crate::pipeline::{spawn_worker, ShutdownSignal};

/// Blocking receive loop feeding the jitter buffer
pub struct NetworkReceiver {
    socket: UdpSocket,
    /// Shared with the controller; closing it ends the loop
    transport: Arc<TransportHandle>,
    packets: SharedQueue<Bytes>,
    shutdown: ShutdownSignal,
    stats: Arc<PipelineStats>,
    /// Back-off after a failed receive so a broken socket cannot spin
    error_backoff: Duration,
}

impl NetworkReceiver {
    pub fn new(
        socket: UdpSocket,
        transport: Arc<TransportHandle>,
        packets: SharedQueue<Bytes>,
        shutdown: ShutdownSignal,
        stats: Arc<PipelineStats>,
        error_backoff: Duration,
    ) -> Self {
        Self {
            socket,
            transport,
            packets,
            shutdown,
            stats,
            error_backoff,
        }
    }

    pub fn spawn(self) -> Result<JoinHandle<()>, PipelineError> {
        spawn_worker("net-receiver", move || self.run())
    }

    fn stopping(&self) -> bool {
        self.shutdown.is_triggered() || self.transport.is_closed()
    }

    /// Receive until the shutdown flag is raised or the socket is closed
    pub fn run(self) {
        let mut buf = [0u8; MAX_PACKET_SIZE];
        tracing::info!("Network receiver started");

        while !self.stopping() {
            match self.socket.recv_from(&mut buf) {
                Ok((0, from)) => {
                    if self.stopping() {
                        break;
                    }
                    tracing::debug!("Ignoring empty datagram from {}", from);
                }
                Ok((len, from)) => {
                    bump(&self.stats.packets_received);
                    add(&self.stats.bytes_received, len as u64);
                    tracing::trace!("Received {} bytes from {}", len, from);
                    if !self.packets.push(Bytes::copy_from_slice(&buf[..len])) {
                        tracing::debug!("Jitter buffer full, dropped oldest packet");
                    }
                }
                Err(e) => match classify_recv_error(&e, self.stopping()) {
                    RecvErrorKind::Idle => {}
                    RecvErrorKind::Closed => {
                        tracing::debug!("Receive socket closed: {}", e);
                        break;
                    }
                    RecvErrorKind::Transient => {
                        bump(&self.stats.receive_errors);
                        tracing::warn!("Receive failed: {}", e);
                        thread::sleep(self.error_backoff);
                    }
                },
            }
        }

        tracing::info!("Network receiver finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::create_shared_queue;
    use crate::network::udp::bind_receiver;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Instant;

    fn spawn_receiver(
        read_timeout: Duration,
    ) -> (Arc<TransportHandle>, SharedQueue<Bytes>, ShutdownSignal, Arc<PipelineStats>, JoinHandle<()>) {
        let (socket, handle) =
            bind_receiver(IpAddr::V4(Ipv4Addr::LOCALHOST), 0, 64 * 1024, read_timeout).unwrap();
        let transport = Arc::new(handle);
        let packets = create_shared_queue(16);
        let shutdown = ShutdownSignal::new();
        let stats = Arc::new(PipelineStats::default());

        let worker = NetworkReceiver::new(
            socket,
            transport.clone(),
            packets.clone(),
            shutdown.clone(),
            stats.clone(),
            Duration::from_millis(5),
        )
        .spawn()
        .unwrap();

        (transport, packets, shutdown, stats, worker)
    }

    fn wait_for(deadline: Duration, mut ready: impl FnMut() -> bool) -> bool {
        let started = Instant::now();
        while started.elapsed() < deadline {
            if ready() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        ready()
    }

    #[test]
    fn test_receives_datagrams_in_order() {
        let (transport, packets, shutdown, stats, worker) = spawn_receiver(Duration::from_millis(50));

        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        let target = transport.local_addr();
        client.send_to(b"one", target).unwrap();
        client.send_to(b"", target).unwrap();
        client.send_to(b"two", target).unwrap();

        assert!(wait_for(Duration::from_secs(2), || packets.len() == 2));

        shutdown.trigger();
        transport.close();
        worker.join().unwrap();

        assert_eq!(packets.try_pop().unwrap(), Bytes::from_static(b"one"));
        assert_eq!(packets.try_pop().unwrap(), Bytes::from_static(b"two"));
        assert!(packets.is_empty());

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.packets_received, 2);
        assert_eq!(snapshot.bytes_received, 6);
        assert_eq!(snapshot.receive_errors, 0);
    }

    #[test]
    fn test_close_unblocks_idle_receiver() {
        // The read timeout alone would take 10 s to notice the flag
        let (transport, _packets, shutdown, stats, worker) = spawn_receiver(Duration::from_secs(10));

        // Let it park in recv_from with no traffic
        thread::sleep(Duration::from_millis(100));

        let started = Instant::now();
        shutdown.trigger();
        transport.close();
        worker.join().unwrap();

        assert!(started.elapsed() < Duration::from_millis(200));
        // Shutdown-induced wake-ups are not receive errors
        assert_eq!(stats.snapshot().receive_errors, 0);
    }

    #[test]
    fn test_closed_transport_stops_receiver_without_flag() {
        let (transport, _packets, shutdown, stats, worker) = spawn_receiver(Duration::from_secs(10));
        thread::sleep(Duration::from_millis(100));

        let started = Instant::now();
        transport.close();
        worker.join().unwrap();

        assert!(started.elapsed() < Duration::from_millis(200));
        assert!(!shutdown.is_triggered());
        assert_eq!(stats.snapshot().receive_errors, 0);
    }
}
