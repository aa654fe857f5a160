//! World-state avatar observer
//!
//! The receive worker reconciles its per-peer decoder map against this
//! avatar set whenever the changed flag is raised. The flag is checked
//! without the lock and cleared while holding it, so a concurrent update
//! always leaves either the flag set or the map already consistent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::mixer::AudioSource;

/// One remote avatar as seen by the voice subsystem.
#[derive(Clone)]
pub struct Avatar {
    pub uid: u64,
    /// Shared handle into the mixer; `None` while the avatar has no
    /// audible voice stream.
    pub audio_source: Option<Arc<AudioSource>>,
    /// Identifier of the avatar's current voice stream. A change means
    /// the sender restarted and decoder state must be rebuilt.
    pub audio_stream_id: u32,
    /// Codec sampling rate declared in the avatar's stream announcement.
    pub audio_stream_sampling_rate: u32,
}

/// Shared set of avatars, updated by the world-session layer and observed
/// by the receive worker.
#[derive(Default)]
pub struct WorldState {
    avatars: Mutex<HashMap<u64, Avatar>>,
    avatars_changed: AtomicBool,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an avatar and raise the changed flag.
    pub fn upsert_avatar(&self, avatar: Avatar) {
        let mut avatars = self.avatars.lock().unwrap();
        avatars.insert(avatar.uid, avatar);
        self.avatars_changed.store(true, Ordering::Release);
    }

    /// Remove an avatar and raise the changed flag.
    pub fn remove_avatar(&self, uid: u64) {
        let mut avatars = self.avatars.lock().unwrap();
        avatars.remove(&uid);
        self.avatars_changed.store(true, Ordering::Release);
    }

    /// Record a stream announcement for an avatar: new stream id and
    /// codec rate. No-op for unknown avatars.
    pub fn note_stream_started(&self, uid: u64, stream_id: u32, sampling_rate: u32) {
        let mut avatars = self.avatars.lock().unwrap();
        if let Some(avatar) = avatars.get_mut(&uid) {
            avatar.audio_stream_id = stream_id;
            avatar.audio_stream_sampling_rate = sampling_rate;
            self.avatars_changed.store(true, Ordering::Release);
        }
    }

    /// Cheap check, performed without taking the lock.
    pub fn avatars_changed(&self) -> bool {
        self.avatars_changed.load(Ordering::Acquire)
    }

    /// Lock the avatar map for a reconciliation pass.
    pub fn lock_avatars(&self) -> MutexGuard<'_, HashMap<u64, Avatar>> {
        self.avatars.lock().unwrap()
    }

    /// Clear the changed flag. Call while still holding the guard from
    /// [`Self::lock_avatars`] so no update slips between the pass and the
    /// clear.
    pub fn clear_avatars_changed(&self, _guard: &MutexGuard<'_, HashMap<u64, Avatar>>) {
        self.avatars_changed.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changed_flag_tracks_updates() {
        let world = WorldState::new();
        assert!(!world.avatars_changed());

        world.upsert_avatar(Avatar {
            uid: 7,
            audio_source: Some(Arc::new(AudioSource::new())),
            audio_stream_id: 1,
            audio_stream_sampling_rate: 48_000,
        });
        assert!(world.avatars_changed());

        {
            let guard = world.lock_avatars();
            assert_eq!(guard.len(), 1);
            world.clear_avatars_changed(&guard);
        }
        assert!(!world.avatars_changed());

        world.remove_avatar(7);
        assert!(world.avatars_changed());
        assert!(world.lock_avatars().is_empty());
    }

    #[test]
    fn stream_note_updates_known_avatar_only() {
        let world = WorldState::new();
        world.upsert_avatar(Avatar {
            uid: 3,
            audio_source: None,
            audio_stream_id: 10,
            audio_stream_sampling_rate: 48_000,
        });
        {
            let guard = world.lock_avatars();
            world.clear_avatars_changed(&guard);
        }

        world.note_stream_started(99, 11, 24_000);
        assert!(!world.avatars_changed());

        world.note_stream_started(3, 11, 24_000);
        assert!(world.avatars_changed());
        let guard = world.lock_avatars();
        let avatar = guard.get(&3).unwrap();
        assert_eq!(avatar.audio_stream_id, 11);
        assert_eq!(avatar.audio_stream_sampling_rate, 24_000);
    }
}
