//! Network sender: outbound queue → datagrams

use bytes::Bytes;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::buffer::SharedQueue;
use crate::error::PipelineError;
use crate::pipeline::stats::{add, bump, PipelineStats};
use crate::pipeline::{spawn_worker, ShutdownSignal};

/// Polling send loop, one packet per datagram
pub struct NetworkSender {
    socket: UdpSocket,
    target: SocketAddr,
    outbound: SharedQueue<Bytes>,
    shutdown: ShutdownSignal,
    stats: Arc<PipelineStats>,
    poll_interval: Duration,
}

impl NetworkSender {
    pub fn new(
        socket: UdpSocket,
        target: SocketAddr,
        outbound: SharedQueue<Bytes>,
        shutdown: ShutdownSignal,
        stats: Arc<PipelineStats>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            socket,
            target,
            outbound,
            shutdown,
            stats,
            poll_interval,
        }
    }

    pub fn spawn(self) -> Result<JoinHandle<()>, PipelineError> {
        spawn_worker("net-sender", move || self.run())
    }

    pub fn run(self) {
        tracing::info!("Network sender started, sending to {}", self.target);

        while !self.shutdown.is_triggered() {
            match self.outbound.try_pop() {
                Some(packet) => match self.socket.send_to(&packet, self.target) {
                    Ok(sent) => {
                        bump(&self.stats.packets_sent);
                        add(&self.stats.bytes_sent, sent as u64);
                    }
                    Err(e) => {
                        bump(&self.stats.send_errors);
                        tracing::warn!("Failed to send packet to {}: {}", self.target, e);
                    }
                },
                None => thread::sleep(self.poll_interval),
            }
        }

        tracing::info!("Network sender finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::create_shared_queue;
    use crate::network::udp::bind_sender;

    #[test]
    fn test_sends_queued_packets_as_datagrams() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let target = listener.local_addr().unwrap();

        let (socket, _handle) = bind_sender(target).unwrap();
        let outbound = create_shared_queue(8);
        let shutdown = ShutdownSignal::new();
        let stats = Arc::new(PipelineStats::default());

        outbound.push(Bytes::from_static(b"first"));
        outbound.push(Bytes::from_static(b"second"));

        let worker = NetworkSender::new(
            socket,
            target,
            outbound.clone(),
            shutdown.clone(),
            stats.clone(),
            Duration::from_millis(5),
        )
        .spawn()
        .unwrap();

        let mut buf = [0u8; 64];
        let (len, _) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"first");
        let (len, _) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"second");

        shutdown.trigger();
        worker.join().unwrap();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.packets_sent, 2);
        assert_eq!(snapshot.bytes_sent, 11);
        assert!(outbound.is_empty());
    }

    #[test]
    fn test_idle_sender_stops_promptly() {
        let (socket, _handle) = bind_sender("127.0.0.1:9".parse().unwrap()).unwrap();
        let shutdown = ShutdownSignal::new();

        let worker = NetworkSender::new(
            socket,
            "127.0.0.1:9".parse().unwrap(),
            create_shared_queue(8),
            shutdown.clone(),
            Arc::new(PipelineStats::default()),
            Duration::from_millis(5),
        )
        .spawn()
        .unwrap();

        thread::sleep(Duration::from_millis(20));
        let started = std::time::Instant::now();
        shutdown.trigger();
        worker.join().unwrap();
        assert!(started.elapsed() < Duration::from_millis(500));
    }
}
