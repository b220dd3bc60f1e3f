//! Voice codec
//!
//! The pipeline only sees the [`FrameEncoder`] / [`FrameDecoder`] traits:
//! one fixed-length mono PCM frame in, one compressed packet out, and back.
//! [`OpusCodec`] is the production implementation.

pub mod decoder;
pub mod encoder;

#[cfg(test)]
pub(crate) mod mock;

use bytes::Bytes;

use crate::constants::{CHANNELS, FRAMES_PER_SECOND};
use crate::error::CodecError;

pub use decoder::OpusDecoder;
pub use encoder::OpusEncoder;

/// Sample rates accepted by the codec
pub const SUPPORTED_SAMPLE_RATES: [u32; 5] = [8000, 12000, 16000, 24000, 48000];

/// Target bitrates accepted by the codec
pub const SUPPORTED_BITRATES: [u32; 5] = [3_200, 6_000, 9_200, 16_000, 24_000];

/// Parameters needed to construct an encoder or decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecParams {
    pub sample_rate: u32,
    pub channels: u16,
    pub bitrate: u32,
}

impl CodecParams {
    /// Check the parameters against the supported sets
    pub fn validate(&self) -> Result<(), CodecError> {
        if !SUPPORTED_SAMPLE_RATES.contains(&self.sample_rate) {
            return Err(CodecError::UnsupportedParams(format!(
                "sample rate {} (supported: {:?})",
                self.sample_rate, SUPPORTED_SAMPLE_RATES
            )));
        }
        if self.channels != CHANNELS {
            return Err(CodecError::UnsupportedParams(format!(
                "{} channels (mono only)",
                self.channels
            )));
        }
        if !SUPPORTED_BITRATES.contains(&self.bitrate) {
            return Err(CodecError::UnsupportedParams(format!(
                "bitrate {} (supported: {:?})",
                self.bitrate, SUPPORTED_BITRATES
            )));
        }
        Ok(())
    }

    /// Samples in one frame
    pub fn frame_len(&self) -> usize {
        (self.sample_rate / FRAMES_PER_SECOND) as usize
    }
}

/// PCM frame → compressed packet
pub trait FrameEncoder: Send {
    /// Samples expected per call to [`FrameEncoder::encode`]
    fn frame_len(&self) -> usize;

    fn encode(&mut self, frame: &[i16]) -> Result<Bytes, CodecError>;
}

/// Compressed packet → PCM frame
pub trait FrameDecoder: Send {
    /// Samples produced per successful decode
    fn frame_len(&self) -> usize;

    /// Decode one packet. The returned frame borrows the decoder's
    /// internal buffer and is valid until the next call.
    fn decode(&mut self, packet: &[u8]) -> Result<&[i16], CodecError>;
}

/// Builds codec instances for a pipeline
pub trait CodecFactory {
    type Encoder: FrameEncoder + 'static;
    type Decoder: FrameDecoder + 'static;

    fn encoder(&self, params: &CodecParams) -> Result<Self::Encoder, CodecError>;

    fn decoder(&self, params: &CodecParams) -> Result<Self::Decoder, CodecError>;
}

/// Factory for the Opus codec
#[derive(Debug, Clone, Copy, Default)]
pub struct OpusCodec;

impl CodecFactory for OpusCodec {
    type Encoder = OpusEncoder;
    type Decoder = OpusDecoder;

    fn encoder(&self, params: &CodecParams) -> Result<OpusEncoder, CodecError> {
        OpusEncoder::new(params)
    }

    fn decoder(&self, params: &CodecParams) -> Result<OpusDecoder, CodecError> {
        OpusDecoder::new(params)
    }
}
