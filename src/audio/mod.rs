//! Audio subsystem module

pub mod buffer;
pub mod capture;
pub mod device;
pub mod playback;

pub use buffer::{create_shared_queue, HandoffQueue, PacketQueue, SampleQueue, SharedQueue};
pub use capture::CaptureCallback;
pub use device::{list_devices, AudioDeviceInfo, AudioStream};
pub use playback::PlaybackCallback;

/// Convert a device sample in [-1.0, 1.0] to PCM
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Convert PCM to a device sample in [-1.0, 1.0)
#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}
