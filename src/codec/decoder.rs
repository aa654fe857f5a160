//! Opus decoder wrapper for one peer voice stream

use opus::{Channels, Decoder};

use crate::codec::samples_per_frame;
use crate::error::CodecError;

/// Mono Opus decoder bound to one peer's declared sampling rate.
pub struct VoiceDecoder {
    decoder: Decoder,
    sample_rate: u32,
    frame_samples: usize,
    /// Decoding buffer, reused across frames.
    decode_buffer: Vec<f32>,
}

impl VoiceDecoder {
    pub fn new(sample_rate: u32) -> Result<Self, CodecError> {
        let decoder = Decoder::new(sample_rate, Channels::Mono)
            .map_err(|e| CodecError::DecoderInit(e.to_string()))?;
        let frame_samples = samples_per_frame(sample_rate);

        Ok(Self {
            decoder,
            sample_rate,
            frame_samples,
            decode_buffer: vec![0.0f32; frame_samples],
        })
    }

    /// Decode one packet payload. Returns the decoded samples, valid
    /// until the next call. Errors if decoding fails or the packet does
    /// not hold exactly one 10 ms frame at this decoder's rate.
    pub fn decode(&mut self, payload: &[u8]) -> Result<&[f32], CodecError> {
        let n = self
            .decoder
            .decode_float(payload, &mut self.decode_buffer, false)
            .map_err(|e| CodecError::DecodingFailed(e.to_string()))?;
        if n != self.frame_samples {
            return Err(CodecError::UnexpectedFrameLength(n));
        }
        Ok(&self.decode_buffer[..n])
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frame_samples(&self) -> usize {
        self.frame_samples
    }
}
