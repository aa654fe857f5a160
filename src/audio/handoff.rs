//! Callback-to-worker sample hand-off
//!
//! The device callback runs on a real-time host thread and must never
//! block on I/O; it only takes this mutex, appends, and returns. The
//! capture worker drains under the same lock with a minimal critical
//! section: copy out, clear, unlock. Excess beyond the cap is dropped at
//! append time so a stalled consumer costs at most ~1 s of audio.

use std::sync::Mutex;

/// Bounded single-producer/single-consumer buffer of mono samples.
pub struct HandoffBuffer {
    samples: Mutex<Vec<f32>>,
    max_samples: usize,
}

impl HandoffBuffer {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: Mutex::new(Vec::with_capacity(max_samples)),
            max_samples,
        }
    }

    /// Append mono samples from the device callback, dropping whatever
    /// does not fit under the cap.
    pub fn append(&self, new_samples: &[f32]) {
        let mut samples = self.samples.lock().unwrap();
        let space = self.max_samples - samples.len();
        let take = space.min(new_samples.len());
        samples.extend_from_slice(&new_samples[..take]);
    }

    /// Move buffered samples into `pending`, bounded so `pending` never
    /// grows past `max_pending`; anything that does not fit is dropped.
    /// Returns the number of samples transferred; 0 with an empty buffer
    /// means no data was immediately available.
    pub fn drain_into(&self, pending: &mut Vec<f32>, max_pending: usize) -> usize {
        let mut samples = self.samples.lock().unwrap();
        if samples.is_empty() {
            return 0;
        }
        let space = max_pending.saturating_sub(pending.len());
        let take = space.min(samples.len());
        pending.extend_from_slice(&samples[..take]);
        samples.clear();
        take
    }

    /// Buffered sample count; test and diagnostics use only.
    pub fn len(&self) -> usize {
        self.samples.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_respects_cap() {
        let buffer = HandoffBuffer::new(100);
        buffer.append(&[0.5; 60]);
        assert_eq!(buffer.len(), 60);

        // 60 + 60 > 100: only 40 of the second batch fit.
        buffer.append(&[0.5; 60]);
        assert_eq!(buffer.len(), 100);

        buffer.append(&[0.5; 10]);
        assert_eq!(buffer.len(), 100);
    }

    #[test]
    fn drain_moves_and_clears() {
        let buffer = HandoffBuffer::new(100);
        buffer.append(&[1.0, 2.0, 3.0]);

        let mut pending = Vec::new();
        assert_eq!(buffer.drain_into(&mut pending, 48_000), 3);
        assert_eq!(pending, vec![1.0, 2.0, 3.0]);
        assert!(buffer.is_empty());

        assert_eq!(buffer.drain_into(&mut pending, 48_000), 0);
    }

    #[test]
    fn drain_bounded_by_pending_capacity() {
        let buffer = HandoffBuffer::new(100);
        buffer.append(&[0.1; 50]);

        let mut pending = vec![0.0; 90];
        // Only 10 slots left in pending; the other 40 samples are dropped.
        assert_eq!(buffer.drain_into(&mut pending, 100), 10);
        assert_eq!(pending.len(), 100);
        assert!(buffer.is_empty());
    }
}
