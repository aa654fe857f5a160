//! # worldvoice
//!
//! Real-time voice streaming client for a shared virtual world.
//!
//! Connects a local microphone to a central relay server over UDP and plays
//! peer voices back as per-avatar audio sources:
//!
//! ```text
//!  microphone ──cpal callback──> HandoffBuffer ──drain──> OutboundVoice
//!                                                  (gain, resample, Opus,
//!                                                   10 ms frames, seq nums)
//!                                                          │ UDP
//!                                                          ▼
//!                                                     relay server
//!                                                          │ UDP
//!                                                          ▼
//!  WorldState avatars ──reconcile──> ReceiveWorker ──decode──> AudioSource
//!                                                              queues (mixer)
//! ```
//!
//! Two long-lived workers share one UDP socket: [`audio::CaptureWorker`]
//! owns the capture device, the resampler and the encoder;
//! [`net::ReceiveWorker`] owns a per-avatar decoder map reconciled against
//! [`world::WorldState`]. Both poll a shared shutdown flag; the receiver's
//! blocking read is unblocked with a zero-length datagram to its own port.

pub mod audio;
pub mod codec;
pub mod config;
pub mod control;
pub mod error;
pub mod mixer;
pub mod net;
pub mod protocol;
pub mod world;

pub use config::VoiceConfig;
pub use error::{Error, Result};

/// Crate-wide constants.
pub mod constants {
    use std::time::Duration;

    /// Cap on buffered capture samples, roughly one second at 48 kHz.
    /// Applies to both the callback hand-off buffer and the worker's
    /// pending buffer; excess input is dropped at append time.
    pub const MAX_PENDING_SAMPLES: usize = 48_000;

    /// Scratch buffer size for Opus encoder output.
    pub const MAX_ENCODED_BYTES: usize = 100_000;

    /// Receive buffer size for incoming voice datagrams.
    pub const RECV_BUFFER_SIZE: usize = 4096;

    /// How often the stream-started handshake is re-emitted so late
    /// joiners learn the codec rate and stream id.
    pub const HANDSHAKE_INTERVAL: Duration = Duration::from_secs(2);

    /// Cooperative sleep between capture loop iterations.
    pub const CAPTURE_LOOP_SLEEP: Duration = Duration::from_millis(2);

    /// High-water mark for a per-avatar source queue, in samples.
    pub const SOURCE_QUEUE_HIGH_WATER: usize = 4096;

    /// Trim target once the high-water mark is exceeded.
    pub const SOURCE_QUEUE_LOW_WATER: usize = 2048;

    /// One-pole decay factor for smoothed level meters: each update takes
    /// `max(new_max_abs, LEVEL_DECAY * previous)`.
    pub const LEVEL_DECAY: f32 = 0.95;
}
