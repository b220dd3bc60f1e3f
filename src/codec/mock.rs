//! Deterministic stand-in codec for tests
//!
//! A packet is the big-endian first sample of the frame; decoding yields a
//! frame filled with that value. Packets that are not exactly two bytes fail
//! to decode, and frames starting with `i16::MIN` fail to encode.

use bytes::Bytes;

use super::{CodecFactory, CodecParams, FrameDecoder, FrameEncoder};
use crate::error::CodecError;

pub fn packet(value: i16) -> Bytes {
    Bytes::copy_from_slice(&value.to_be_bytes())
}

pub struct MockEncoder {
    frame_len: usize,
}

impl FrameEncoder for MockEncoder {
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
        match frame[0] {
            i16::MIN => Err(CodecError::EncodingFailed("poisoned frame".into())),
            value => Ok(packet(value)),
        }
    }
}

pub struct MockDecoder {
    frame: Vec<i16>,
}

impl MockDecoder {
    pub fn new(frame_len: usize) -> Self {
        Self {
            frame: vec![0; frame_len],
        }
    }
}

impl FrameDecoder for MockDecoder {
    fn frame_len(&self) -> usize {
        self.frame.len()
    }

    fn decode(&mut self, packet: &[u8]) -> Result<&[i16], CodecError> {
        let bytes: [u8; 2] = packet
            .try_into()
            .map_err(|_| CodecError::DecodingFailed(format!("{} byte packet", packet.len())))?;
        self.frame.fill(i16::from_be_bytes(bytes));
        Ok(&self.frame)
    }
}

#[derive(Default)]
pub struct MockCodec {
    pub fail_encoder: bool,
    pub fail_decoder: bool,
}

impl CodecFactory for MockCodec {
    type Encoder = MockEncoder;
    type Decoder = MockDecoder;

    fn encoder(&self, params: &CodecParams) -> Result<MockEncoder, CodecError> {
        params.validate()?;
        if self.fail_encoder {
            return Err(CodecError::EncoderInit("mock failure".into()));
        }
        Ok(MockEncoder {
            frame_len: params.frame_len(),
        })
    }

    fn decoder(&self, params: &CodecParams) -> Result<MockDecoder, CodecError> {
        params.validate()?;
        if self.fail_decoder {
            return Err(CodecError::DecoderInit("mock failure".into()));
        }
        Ok(MockDecoder::new(params.frame_len()))
    }
}
