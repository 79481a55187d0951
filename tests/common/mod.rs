#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use soundboard_lib::board::{Color, SoundButton};
use soundboard_lib::config::Config;
use soundboard_lib::engine::playback::AudioBackend;
use soundboard_lib::store::{KvStore, MemoryStore};
use soundboard_lib::{Controller, Error, Result};

/// Backend that records every call and keeps voices alive until paused
/// (or `finish` is called).
#[derive(Debug, Default)]
pub struct FakeBackend {
    next: u64,
    pub log: Vec<String>,
    pub live: HashSet<u64>,
    pub fail_create: bool,
}

impl FakeBackend {
    pub fn finish(&mut self, voice: u64) {
        self.live.remove(&voice);
    }

    pub fn created(&self) -> Vec<&str> {
        self.log.iter().filter_map(|l| l.strip_prefix("create ")).collect()
    }

    pub fn last_gain(&self) -> Option<f32> {
        self.log.iter().rev().find_map(|l| l.strip_prefix("gain ")).and_then(|g| g.parse().ok())
    }
}

impl AudioBackend for FakeBackend {
    type Handle = u64;

    fn resume(&mut self) {}

    fn create(&mut self, source: &str, looping: bool) -> Result<u64> {
        if self.fail_create {
            return Err(Error::UnsupportedSource(source.to_string()));
        }
        self.next += 1;
        self.log.push(format!("create {}{}", source, if looping { " loop" } else { "" }));
        Ok(self.next)
    }

    fn route_through_gain(&mut self, _: &u64) -> Result<()> {
        Ok(())
    }

    fn start(&mut self, h: &u64) -> Result<()> {
        self.live.insert(*h);
        Ok(())
    }

    fn pause(&mut self, h: &u64) -> Result<()> {
        self.live.remove(h);
        self.log.push(format!("pause {h}"));
        Ok(())
    }

    fn is_active(&self, h: &u64) -> bool {
        self.live.contains(h)
    }

    fn set_gain(&mut self, gain: f32) {
        self.log.push(format!("gain {gain}"));
    }
}

/// Store shared between controller instances, standing in for a page reload.
/// Counts writes per key.
#[derive(Clone, Default)]
pub struct SharedStore {
    inner: Arc<Mutex<MemoryStore>>,
    writes: Arc<Mutex<Vec<String>>>,
}

impl SharedStore {
    pub fn seeded(key: &str, value: &str) -> Self {
        let s = Self::default();
        s.inner.lock().unwrap().set(key, value.to_string());
        s
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner.lock().unwrap().get(key)
    }

    pub fn writes_to(&self, key: &str) -> usize {
        self.writes.lock().unwrap().iter().filter(|k| *k == key).count()
    }
}

impl KvStore for SharedStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().unwrap().get(key)
    }

    fn set(&mut self, key: &str, value: String) {
        self.writes.lock().unwrap().push(key.to_string());
        self.inner.lock().unwrap().set(key, value);
    }
}

pub fn builtins() -> Vec<SoundButton> {
    vec![
        SoundButton::builtin("airhorn.mp3", "Air Horn", Some(Color::Red)),
        SoundButton::builtin("boing.mp3", "Boing", None),
        SoundButton::builtin("airplane.mp3", "AIRPLANE", Some(Color::Yellow)),
    ]
}

pub fn board(store: &SharedStore) -> Controller<FakeBackend> {
    Controller::new(Config::default(), Box::new(store.clone()), FakeBackend::default(), builtins())
}

pub fn visible(ctl: &Controller<FakeBackend>) -> Vec<String> {
    ctl.items().iter().filter(|i| !i.hidden).map(|i| i.button.id.clone()).collect()
}

pub fn order(ctl: &Controller<FakeBackend>) -> Vec<String> {
    ctl.items().iter().map(|i| i.button.id.clone()).collect()
}
