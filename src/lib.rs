//! # LAN Voice Link
//!
//! Low-latency mono voice streaming over UDP.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────── SENDER ─────────────────────────────┐
//! │  Microphone ──► Capture Callback ──► Opus encode ──► Outbound   │
//! │  (cpal RT thread)                                    Queue      │
//! │                                                        │        │
//! │                                           Network Sender thread │
//! └────────────────────────────────────────────────────────┼────────┘
//!                                                          │ UDP, one packet
//!                                                          ▼ per datagram
//! ┌──────────────────────────── RECEIVER ───────────────────────────┐
//! │  Network Receiver thread ──► Packet Queue (jitter buffer)       │
//! │                                    │                            │
//! │                              Decode Worker thread               │
//! │                                    │                            │
//! │                              Sample Queue (playback buffer)     │
//! │                                    │                            │
//! │  Speaker ◄── Playback Callback ◄───┘  (silence on underrun)     │
//! │  (cpal RT thread)                                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every queue has exactly one producer thread and one consumer thread.
//! The callbacks running on the audio driver's thread never block: they
//! only touch lock-free queues and atomic counters.
//!
//! The [`pipeline::Pipeline`] owns all queues, threads, the transport and
//! the audio stream, and tears them down in a fixed order on stop.

pub mod audio;
pub mod codec;
pub mod config;
pub mod error;
pub mod network;
pub mod pipeline;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Default sample rate for audio processing
    pub const DEFAULT_SAMPLE_RATE: u32 = 16000;

    /// Channel count (the codec is mono only)
    pub const CHANNELS: u16 = 1;

    /// Default codec bitrate in bits per second
    pub const DEFAULT_BITRATE: u32 = 16_000;

    /// Duration of one codec/device frame
    pub const FRAME_DURATION_MS: u32 = 20;

    /// Frames per second for [`FRAME_DURATION_MS`]
    pub const FRAMES_PER_SECOND: u32 = 1000 / FRAME_DURATION_MS;

    /// Maximum compressed packet size, also the receive buffer size
    pub const MAX_PACKET_SIZE: usize = 256;

    /// Sleep between polls of an empty queue
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5;

    /// Receive timeout that bounds how long a receive can stay parked
    pub const DEFAULT_READ_TIMEOUT_MS: u64 = 100;

    /// Packet queue capacity (in packets)
    pub const DEFAULT_PACKET_QUEUE_CAPACITY: usize = 64;

    /// Playback buffer cap expressed as latency
    pub const DEFAULT_MAX_PLAYBACK_LATENCY_MS: u32 = 1000;
}
