//! Control messages and lifecycle events
//!
//! Each worker drains a [`ControlMsg`] queue at the top of its loop and
//! publishes [`VoiceEvent`]s upward to whoever owns the client session.
//! Shutdown is signalled both ways: a `Shutdown` message on the queue and a
//! shared atomic flag that both workers poll between iterations.

use crossbeam_channel::{unbounded, Receiver, Sender};

/// Flag bit set on a re-emitted stream-started handshake, telling the
/// server to notify clients that joined after the initial announcement.
pub const STREAM_FLAG_RENEW: u32 = 1;

/// Messages accepted by the capture worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlMsg {
    /// Update the gain applied to captured samples on the next drain.
    VolumeChanged(f32),
    /// Stop the worker at the next loop iteration.
    Shutdown,
}

/// Events published by the workers.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceEvent {
    /// A capture stream started (flags = 0) or renewed its announcement
    /// (flags has [`STREAM_FLAG_RENEW`] set).
    StreamStarted {
        sampling_rate: u32,
        flags: u32,
        stream_id: u32,
    },
    /// The capture worker exited; emitted exactly once per worker.
    StreamEnded,
    /// Diagnostic text for the session log.
    Log(String),
}

/// Create a control channel pair for a worker.
pub fn control_channel() -> (Sender<ControlMsg>, Receiver<ControlMsg>) {
    unbounded()
}

/// Create an event channel pair for a worker.
pub fn event_channel() -> (Sender<VoiceEvent>, Receiver<VoiceEvent>) {
    unbounded()
}
