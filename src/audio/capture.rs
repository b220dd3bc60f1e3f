//! Capture side of the audio driver
//!
//! The driver hands over input buffers of whatever size it likes. They are
//! assembled into exact codec frames, encoded on the spot and pushed to the
//! outbound queue. Nothing here blocks or reports errors back to the driver;
//! a frame that fails to encode is simply dropped.

use bytes::Bytes;
use std::sync::Arc;

use crate::audio::buffer::SharedQueue;
use crate::audio::f32_to_i16;
use crate::codec::FrameEncoder;
use crate::pipeline::stats::{bump, PipelineStats};

/// Hardware-clocked capture handler
pub struct CaptureCallback<E> {
    encoder: E,
    outbound: SharedQueue<Bytes>,
    stats: Arc<PipelineStats>,
    /// Partially assembled frame; never grows past one frame
    pending: Vec<i16>,
}

impl<E: FrameEncoder> CaptureCallback<E> {
    pub fn new(encoder: E, outbound: SharedQueue<Bytes>, stats: Arc<PipelineStats>) -> Self {
        let frame_len = encoder.frame_len();
        Self {
            encoder,
            outbound,
            stats,
            pending: Vec::with_capacity(frame_len),
        }
    }

    /// Feed one driver buffer of i16 samples
    pub fn on_input(&mut self, input: &[i16]) {
        self.assemble(input.iter().copied());
    }

    /// Feed one driver buffer of f32 samples
    pub fn on_input_f32(&mut self, input: &[f32]) {
        self.assemble(input.iter().map(|&sample| f32_to_i16(sample)));
    }

    /// Samples waiting for the rest of their frame
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn assemble(&mut self, samples: impl Iterator<Item = i16>) {
        let frame_len = self.encoder.frame_len();
        for sample in samples {
            self.pending.push(sample);
            if self.pending.len() == frame_len {
                self.encode_pending();
            }
        }
    }

    fn encode_pending(&mut self) {
        match self.encoder.encode(&self.pending) {
            Ok(packet) => {
                bump(&self.stats.frames_encoded);
                self.outbound.push(packet);
            }
            Err(_) => bump(&self.stats.encode_failures),
        }
        self.pending.clear();
    }
}
