//! Opus encoder wrapper
//!
//! Encodes 20 ms mono i16 frames into packets no larger than
//! [`MAX_PACKET_SIZE`](crate::constants::MAX_PACKET_SIZE).

use bytes::Bytes;
use opus::{Application, Channels, Encoder};

use super::{CodecParams, FrameEncoder};
use crate::constants::MAX_PACKET_SIZE;
use crate::error::CodecError;

/// Opus encoder configured for voice
pub struct OpusEncoder {
    encoder: Encoder,
    frame_len: usize,
    /// Reused output buffer, sized to the largest packet we send
    encode_buffer: [u8; MAX_PACKET_SIZE],
}

impl OpusEncoder {
    /// Create a new Opus encoder with the specified parameters
    pub fn new(params: &CodecParams) -> Result<Self, CodecError> {
        params.validate()?;

        let mut encoder = Encoder::new(params.sample_rate, Channels::Mono, Application::Voip)
            .map_err(|e| CodecError::EncoderInit(e.to_string()))?;

        encoder
            .set_bitrate(opus::Bitrate::Bits(params.bitrate as i32))
            .map_err(|e| CodecError::EncoderInit(format!("Failed to set bitrate: {}", e)))?;

        // Constant bitrate keeps packet sizes predictable on the wire
        encoder
            .set_vbr(false)
            .map_err(|e| CodecError::EncoderInit(format!("Failed to set VBR: {}", e)))?;

        tracing::debug!(
            sample_rate = params.sample_rate,
            bitrate = params.bitrate,
            "Opus encoder created"
        );

        Ok(Self {
            encoder,
            frame_len: params.frame_len(),
            encode_buffer: [0u8; MAX_PACKET_SIZE],
        })
    }
}

impl FrameEncoder for OpusEncoder {
    fn frame_len(&self) -> usize {
        self.frame_len
    }

    fn encode(&mut self, frame: &[i16]) -> Result<Bytes, CodecError> {
        if frame.len() != self.frame_len {
            return Err(CodecError::InvalidFrameSize {
                expected: self.frame_len,
                actual: frame.len(),
            });
        }

        let size = self
            .encoder
            .encode(frame, &mut self.encode_buffer)
            .map_err(|e| CodecError::EncodingFailed(e.to_string()))?;

        Ok(Bytes::copy_from_slice(&self.encode_buffer[..size]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice_params() -> CodecParams {
        CodecParams {
            sample_rate: 16000,
            channels: 1,
            bitrate: 16_000,
        }
    }

    #[test]
    fn test_encoder_creation() {
        let encoder = OpusEncoder::new(&voice_params()).unwrap();
        assert_eq!(encoder.frame_len(), 320);

        let wideband = OpusEncoder::new(&CodecParams {
            sample_rate: 48000,
            ..voice_params()
        })
        .unwrap();
        assert_eq!(wideband.frame_len(), 960);
    }

    #[test]
    fn test_encoder_rejects_bad_params() {
        let mut params = voice_params();
        params.sample_rate = 44100;
        assert!(OpusEncoder::new(&params).is_err());
    }

    #[test]
    fn test_encoding_is_bounded() {
        let mut encoder = OpusEncoder::new(&voice_params()).unwrap();
        let frame = vec![0i16; encoder.frame_len()];

        let encoded = encoder.encode(&frame).unwrap();
        assert!(!encoded.is_empty());
        assert!(encoded.len() <= MAX_PACKET_SIZE);
    }

    #[test]
    fn test_lowest_bitrate_encodes() {
        let mut encoder = OpusEncoder::new(&CodecParams {
            bitrate: 3_200,
            ..voice_params()
        })
        .unwrap();
        let encoded = encoder.encode(&vec![0i16; 320]).unwrap();
        assert!(!encoded.is_empty());
        assert!(encoded.len() <= MAX_PACKET_SIZE);
    }

    #[test]
    fn test_wrong_frame_length() {
        let mut encoder = OpusEncoder::new(&voice_params()).unwrap();
        let result = encoder.encode(&[0i16; 100]);
        assert!(matches!(
            result,
            Err(CodecError::InvalidFrameSize {
                expected: 320,
                actual: 100
            })
        ));
    }
}
