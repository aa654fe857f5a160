//! Opus encoder wrapper for the outbound voice stream

use opus::{Application, Channels, Encoder};

use crate::codec::samples_per_frame;
use crate::constants::MAX_ENCODED_BYTES;
use crate::error::CodecError;

/// Mono VoIP-tuned Opus encoder bound to one codec rate for the lifetime
/// of a capture worker.
pub struct VoiceEncoder {
    encoder: Encoder,
    sample_rate: u32,
    frame_samples: usize,
    /// Encoding buffer, reused across frames to avoid allocations.
    encode_buffer: Vec<u8>,
}

impl VoiceEncoder {
    /// Create an encoder at a codec-supported rate (see
    /// [`crate::codec::pick_codec_rate`]).
    pub fn new(sample_rate: u32) -> Result<Self, CodecError> {
        let encoder = Encoder::new(sample_rate, Channels::Mono, Application::Voip)
            .map_err(|e| CodecError::EncoderInit(e.to_string()))?;

        Ok(Self {
            encoder,
            sample_rate,
            frame_samples: samples_per_frame(sample_rate),
            encode_buffer: vec![0u8; MAX_ENCODED_BYTES],
        })
    }

    /// Encode exactly one 10 ms mono frame. Returns the encoded bytes,
    /// valid until the next call.
    pub fn encode(&mut self, frame: &[f32]) -> Result<&[u8], CodecError> {
        debug_assert_eq!(frame.len(), self.frame_samples);
        let size = self
            .encoder
            .encode_float(frame, &mut self.encode_buffer)
            .map_err(|e| CodecError::EncodingFailed(e.to_string()))?;
        Ok(&self.encode_buffer[..size])
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples per 10 ms frame at this encoder's rate.
    pub fn frame_samples(&self) -> usize {
        self.frame_samples
    }
}
