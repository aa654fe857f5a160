//! Shared microphone level meter

use std::sync::Mutex;

use crate::constants::LEVEL_DECAY;

/// Smoothed peak level of recently captured audio, shared with the UI.
/// Updates apply a one-pole decay: `max(new_max, 0.95 * previous)`.
#[derive(Default)]
pub struct MicLevel {
    cur_level: Mutex<f32>,
}

impl MicLevel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the max-abs value of a freshly captured batch into the meter.
    pub fn update(&self, max_abs: f32) {
        let mut level = self.cur_level.lock().unwrap();
        *level = max_abs.max(LEVEL_DECAY * *level);
    }

    /// Current smoothed level.
    pub fn current(&self) -> f32 {
        *self.cur_level.lock().unwrap()
    }

    /// Zero the meter; called when the capture worker exits.
    pub fn reset(&self) {
        *self.cur_level.lock().unwrap() = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decay_rule() {
        let level = MicLevel::new();
        level.update(1.0);
        assert_eq!(level.current(), 1.0);

        level.update(0.0);
        assert!((level.current() - LEVEL_DECAY).abs() < 1e-6);

        level.update(0.99);
        assert!((level.current() - 0.99).abs() < 1e-6);

        level.reset();
        assert_eq!(level.current(), 0.0);
    }
}
