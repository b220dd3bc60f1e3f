//! Run statistics
//!
//! Plain relaxed atomics: the real-time callbacks bump them without
//! synchronizing with anything, and readers only want approximate totals.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct PipelineStats {
    pub packets_received: AtomicU64,
    pub bytes_received: AtomicU64,
    pub receive_errors: AtomicU64,
    pub packets_sent: AtomicU64,
    pub bytes_sent: AtomicU64,
    pub send_errors: AtomicU64,
    pub frames_encoded: AtomicU64,
    pub encode_failures: AtomicU64,
    pub frames_decoded: AtomicU64,
    pub decode_failures: AtomicU64,
    pub playback_callbacks: AtomicU64,
    pub underruns: AtomicU64,
}

#[inline]
pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn add(counter: &AtomicU64, amount: u64) {
    counter.fetch_add(amount, Ordering::Relaxed);
}

impl PipelineStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            packets_received: load(&self.packets_received),
            bytes_received: load(&self.bytes_received),
            receive_errors: load(&self.receive_errors),
            packets_sent: load(&self.packets_sent),
            bytes_sent: load(&self.bytes_sent),
            send_errors: load(&self.send_errors),
            frames_encoded: load(&self.frames_encoded),
            encode_failures: load(&self.encode_failures),
            frames_decoded: load(&self.frames_decoded),
            decode_failures: load(&self.decode_failures),
            playback_callbacks: load(&self.playback_callbacks),
            underruns: load(&self.underruns),
            ..StatsSnapshot::default()
        }
    }
}

/// Point-in-time copy of the counters plus queue levels
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub packets_received: u64,
    pub bytes_received: u64,
    pub receive_errors: u64,
    pub packets_sent: u64,
    pub bytes_sent: u64,
    pub send_errors: u64,
    pub frames_encoded: u64,
    pub encode_failures: u64,
    pub frames_decoded: u64,
    pub decode_failures: u64,
    pub playback_callbacks: u64,
    pub underruns: u64,
    pub packet_queue_len: usize,
    pub packets_dropped: usize,
    pub sample_queue_len: usize,
    pub samples_dropped: usize,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rx {} pkts / {:.1} KB ({} err), tx {} pkts / {:.1} KB ({} err), \
             enc {} ({} failed), dec {} ({} failed), \
             underruns {}/{} callbacks, jitter buffer {} ({} dropped), \
             playback buffer {} ({} dropped)",
            self.packets_received,
            self.bytes_received as f64 / 1024.0,
            self.receive_errors,
            self.packets_sent,
            self.bytes_sent as f64 / 1024.0,
            self.send_errors,
            self.frames_encoded,
            self.encode_failures,
            self.frames_decoded,
            self.decode_failures,
            self.underruns,
            self.playback_callbacks,
            self.packet_queue_len,
            self.packets_dropped,
            self.sample_queue_len,
            self.samples_dropped,
        )
    }
}
