//! Decode worker: packet queue → codec → sample queue

use bytes::Bytes;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::buffer::SharedQueue;
use crate::codec::FrameDecoder;
use crate::error::PipelineError;
use crate::pipeline::stats::{bump, PipelineStats};
use crate::pipeline::{spawn_worker, ShutdownSignal};

/// A stream of garbage logs one warning per this many bad packets
const DECODE_WARN_EVERY: u64 = 100;

/// Outcome of one worker iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStep {
    /// A packet was decoded and this many samples were queued
    Decoded(usize),
    /// A packet was dropped because it did not decode
    Failed,
    /// The packet queue was empty
    Idle,
}

pub struct DecodeWorker<D> {
    decoder: D,
    packets: SharedQueue<Bytes>,
    samples: SharedQueue<i16>,
    shutdown: ShutdownSignal,
    stats: Arc<PipelineStats>,
    poll_interval: Duration,
}

impl<D: FrameDecoder> DecodeWorker<D> {
    pub fn new(
        decoder: D,
        packets: SharedQueue<Bytes>,
        samples: SharedQueue<i16>,
        shutdown: ShutdownSignal,
        stats: Arc<PipelineStats>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            decoder,
            packets,
            samples,
            shutdown,
            stats,
            poll_interval,
        }
    }

    /// Decode at most one packet without sleeping
    pub fn step(&mut self) -> DecodeStep {
        let Some(packet) = self.packets.try_pop() else {
            return DecodeStep::Idle;
        };

        match self.decoder.decode(&packet) {
            Ok(frame) => {
                let evicted = self.samples.push_slice(frame);
                if evicted > 0 {
                    tracing::trace!("Playback buffer full, dropped {} oldest samples", evicted);
                }
                bump(&self.stats.frames_decoded);
                DecodeStep::Decoded(frame.len())
            }
            Err(e) => {
                let failures = self.stats.decode_failures.fetch_add(1, Ordering::Relaxed) + 1;
                if failures == 1 || failures % DECODE_WARN_EVERY == 0 {
                    tracing::warn!(
                        "Dropping undecodable packet ({} bytes, {} so far): {}",
                        packet.len(),
                        failures,
                        e
                    );
                } else {
                    tracing::debug!("Dropping undecodable packet ({} bytes): {}", packet.len(), e);
                }
                DecodeStep::Failed
            }
        }
    }

    /// Decode until shutdown is raised and the packet queue has drained.
    /// The receiver is stopped first, so nothing refills it by then.
    pub fn run(mut self) {
        tracing::info!("Decode worker started");

        loop {
            if self.step() == DecodeStep::Idle {
                if self.shutdown.is_triggered() {
                    break;
                }
                thread::sleep(self.poll_interval);
            }
        }

        tracing::info!("Decode worker finished");
    }
}

impl<D: FrameDecoder + 'static> DecodeWorker<D> {
    pub fn spawn(self) -> Result<JoinHandle<()>, PipelineError> {
        spawn_worker("decoder", move || self.run())
    }
}
