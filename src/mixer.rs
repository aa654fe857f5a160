//! Per-avatar audio source queues
//!
//! The mixing engine drains these queues on its own thread; the receive
//! worker appends decoded frames. A source that outlives its decode entry
//! is fine: the handle is shared between the world state, the mixer and
//! the receive worker, and the last holder drops it.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::constants::{LEVEL_DECAY, SOURCE_QUEUE_HIGH_WATER, SOURCE_QUEUE_LOW_WATER};

struct SourceState {
    queued: VecDeque<f32>,
    smoothed_cur_level: f32,
}

/// One avatar's voice output queue plus its smoothed level meter.
pub struct AudioSource {
    state: Mutex<SourceState>,
}

impl AudioSource {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SourceState {
                queued: VecDeque::new(),
                smoothed_cur_level: 0.0,
            }),
        }
    }

    /// Append one decoded frame, trimming first if the queue has grown
    /// past the high-water mark: everything but the newest
    /// [`SOURCE_QUEUE_LOW_WATER`] samples is popped, then the frame is
    /// appended. The incoming frame itself is never dropped.
    pub fn append_frame(&self, samples: &[f32], max_abs: f32) {
        let mut state = self.state.lock().unwrap();
        if state.queued.len() > SOURCE_QUEUE_HIGH_WATER {
            let excess = state.queued.len() - SOURCE_QUEUE_LOW_WATER;
            tracing::debug!("source queue too full, removing {excess} samples");
            state.queued.drain(..excess);
        }
        state.queued.extend(samples.iter().copied());
        state.smoothed_cur_level = max_abs.max(LEVEL_DECAY * state.smoothed_cur_level);
    }

    /// Number of samples currently queued.
    pub fn queued_samples(&self) -> usize {
        self.state.lock().unwrap().queued.len()
    }

    /// Pop up to `out.len()` samples into `out`, returning how many were
    /// written. The mixer calls this from its render thread.
    pub fn read_samples(&self, out: &mut [f32]) -> usize {
        let mut state = self.state.lock().unwrap();
        let n = out.len().min(state.queued.len());
        for slot in out.iter_mut().take(n) {
            *slot = state.queued.pop_front().unwrap_or(0.0);
        }
        n
    }

    /// Smoothed peak level of recently appended frames, for UI meters.
    pub fn smoothed_level(&self) -> f32 {
        self.state.lock().unwrap().smoothed_cur_level
    }

    #[cfg(test)]
    pub(crate) fn prefill(&self, n: usize) {
        let mut state = self.state.lock().unwrap();
        state.queued.extend(std::iter::repeat(0.0).take(n));
    }
}

impl Default for AudioSource {
    fn default() -> Self {
        Self::new()
    }
}
