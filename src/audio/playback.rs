//! Playback side of the audio driver
//!
//! Drains the sample queue into the driver's output buffer. On the first
//! empty read the rest of the buffer is filled with silence; samples left
//! over after a full buffer stay queued for the next callback.

use std::sync::Arc;

use crate::audio::buffer::SharedQueue;
use crate::audio::i16_to_f32;
use crate::pipeline::stats::{bump, PipelineStats};

/// Hardware-clocked playback handler
pub struct PlaybackCallback {
    samples: SharedQueue<i16>,
    stats: Arc<PipelineStats>,
}

impl PlaybackCallback {
    pub fn new(samples: SharedQueue<i16>, stats: Arc<PipelineStats>) -> Self {
        Self { samples, stats }
    }

    /// Fill an i16 output buffer. Returns how many queued samples were
    /// written before silence took over.
    pub fn render(&self, out: &mut [i16]) -> usize {
        let written = self.samples.fill(out);
        self.finish(written, out.len());
        out[written..].fill(0);
        written
    }

    /// Fill an f32 output buffer, see [`PlaybackCallback::render`]
    pub fn render_f32(&self, out: &mut [f32]) -> usize {
        let mut written = 0;
        for slot in out.iter_mut() {
            match self.samples.try_pop() {
                Some(sample) => {
                    *slot = i16_to_f32(sample);
                    written += 1;
                }
                None => break,
            }
        }
        self.finish(written, out.len());
        out[written..].fill(0.0);
        written
    }

    fn finish(&self, written: usize, requested: usize) {
        bump(&self.stats.playback_callbacks);
        if written < requested {
            bump(&self.stats.underruns);
        }
    }
}
