//! Opus codec layer
//!
//! Mono voice frames only, fixed at 10 ms. The encoder runs at a
//! codec-supported rate chosen from the capture rate; each peer decoder
//! runs at the rate declared in that peer's stream announcement.

pub mod decoder;
pub mod encoder;
pub mod resampler;

pub use decoder::VoiceDecoder;
pub use encoder::VoiceEncoder;
pub use resampler::StreamResampler;

/// Sampling rates the Opus codec accepts directly.
pub const SUPPORTED_RATES: [u32; 5] = [8_000, 12_000, 16_000, 24_000, 48_000];

/// Rate used when the capture rate is not codec-supported; capture audio
/// is resampled up or down to it.
pub const FALLBACK_RATE: u32 = 48_000;

/// Pick the codec rate for a capture rate: the capture rate itself when
/// Opus supports it, otherwise [`FALLBACK_RATE`].
pub fn pick_codec_rate(capture_rate_hz: u32) -> u32 {
    if SUPPORTED_RATES.contains(&capture_rate_hz) {
        capture_rate_hz
    } else {
        FALLBACK_RATE
    }
}

/// Samples in one 10 ms mono frame at the given rate.
pub fn samples_per_frame(rate_hz: u32) -> usize {
    (rate_hz / 100) as usize
}
