//! String-keyed persistence.
//!
//! The board stores a handful of independent JSON records under fixed keys.
//! [`KvStore`] is the raw string layer; [`codec`] puts typed records on top.

use std::collections::HashMap;

pub mod codec;
pub mod file;

pub use codec::{load, save, BackgroundRecord, CustomSound, CustomSoundsRecord, HotkeysRecord, OrderRecord, Record};
pub use file::FileStore;

/// Last-write-wins string store.
pub trait KvStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    map: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value, e.g. to simulate what an older session left behind.
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.map.insert(key.to_string(), value.to_string());
        self
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.map.insert(key.to_string(), value);
    }
}

impl<S: KvStore + ?Sized> KvStore for Box<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: String) {
        (**self).set(key, value)
    }
}
