use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use super::messages::VoiceId;

/// Voices the mixer is still sounding, shared between the controller side
/// and the audio thread. The backend adds a voice when it sends `Start`;
/// the mixer removes it once it ends or is stopped.
#[derive(Clone, Debug, Default)]
pub struct ActiveVoices(Arc<Mutex<HashSet<VoiceId>>>);

impl ActiveVoices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, voice: VoiceId) {
        if let Ok(mut set) = self.0.lock() {
            set.insert(voice);
        }
    }

    pub fn remove(&self, voice: VoiceId) {
        if let Ok(mut set) = self.0.lock() {
            set.remove(&voice);
        }
    }

    pub fn remove_all(&self, voices: &[VoiceId]) {
        if voices.is_empty() {
            return;
        }
        if let Ok(mut set) = self.0.lock() {
            for v in voices {
                set.remove(v);
            }
        }
    }

    pub fn contains(&self, voice: VoiceId) -> bool {
        self.0.lock().map(|set| set.contains(&voice)).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.0.lock().map(|set| set.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
