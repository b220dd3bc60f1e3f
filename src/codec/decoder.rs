//! Opus decoder wrapper

use opus::{Channels, Decoder};

use super::{CodecParams, FrameDecoder};
use crate::error::CodecError;

/// Opus decoder producing fixed-length mono frames
pub struct OpusDecoder {
    decoder: Decoder,
    /// One frame; its length is the frame length
    decode_buffer: Vec<i16>,
}

impl OpusDecoder {
    /// Create a new Opus decoder
    pub fn new(params: &CodecParams) -> Result<Self, CodecError> {
        params.validate()?;

        let decoder = Decoder::new(params.sample_rate, Channels::Mono)
            .map_err(|e| CodecError::DecoderInit(e.to_string()))?;

        Ok(Self {
            decoder,
            decode_buffer: vec![0i16; params.frame_len()],
        })
    }
}

impl FrameDecoder for OpusDecoder {
    fn frame_len(&self) -> usize {
        self.decode_buffer.len()
    }

    fn decode(&mut self, packet: &[u8]) -> Result<&[i16], CodecError> {
        // An empty input would make Opus run loss concealment instead
        if packet.is_empty() {
            return Err(CodecError::EmptyPacket);
        }

        let samples = self
            .decoder
            .decode(packet, &mut self.decode_buffer, false)
            .map_err(|e| CodecError::DecodingFailed(e.to_string()))?;

        if samples != self.decode_buffer.len() {
            return Err(CodecError::InvalidFrameSize {
                expected: self.decode_buffer.len(),
                actual: samples,
            });
        }

        Ok(&self.decode_buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{FrameEncoder, OpusEncoder};

    fn voice_params() -> CodecParams {
        CodecParams {
            sample_rate: 16000,
            channels: 1,
            bitrate: 16_000,
        }
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let params = voice_params();
        let mut encoder = OpusEncoder::new(&params).unwrap();
        let mut decoder = OpusDecoder::new(&params).unwrap();

        // 440 Hz tone at half scale
        let frame: Vec<i16> = (0..encoder.frame_len())
            .map(|i| {
                let t = i as f32 / params.sample_rate as f32;
                ((t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 16000.0) as i16
            })
            .collect();

        let encoded = encoder.encode(&frame).unwrap();
        let decoded = decoder.decode(&encoded).unwrap();

        // Lossy, so only the shape is guaranteed
        assert_eq!(decoded.len(), frame.len());
    }

    #[test]
    fn test_empty_packet_is_rejected() {
        let mut decoder = OpusDecoder::new(&voice_params()).unwrap();
        assert!(matches!(decoder.decode(&[]), Err(CodecError::EmptyPacket)));
    }

    #[test]
    fn test_packet_from_other_rate_decodes_to_frame_len() {
        let mut params = voice_params();
        let mut decoder = OpusDecoder::new(&params).unwrap();

        params.sample_rate = 8000;
        let mut narrow = OpusEncoder::new(&params).unwrap();
        let packet = narrow.encode(&vec![0i16; 160]).unwrap();

        // 160 samples at 8 kHz is 20 ms, so at 16 kHz it decodes to 320
        assert_eq!(decoder.decode(&packet).unwrap().len(), 320);
    }
}
