//! Typed records over the raw string store.
//!
//! Every record decodes independently. A missing key or a value that does not
//! parse yields the record's default, never an error.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::KvStore;
use crate::background::Background;
use crate::board::button::Color;

pub trait Record: Serialize + DeserializeOwned + Default {
    const KEY: &'static str;
}

pub fn decode<R: Record>(raw: Option<&str>) -> R {
    let Some(raw) = raw else { return R::default() };
    serde_json::from_str(raw).unwrap_or_else(|e| {
        debug!("record {} is malformed, using default: {}", R::KEY, e);
        R::default()
    })
}

pub fn load<R: Record, S: KvStore + ?Sized>(store: &S) -> R {
    decode(store.get(R::KEY).as_deref())
}

pub fn save<R: Record, S: KvStore + ?Sized>(store: &mut S, record: &R) {
    match serde_json::to_string(record) {
        Ok(json) => store.set(R::KEY, json),
        Err(e) => warn!("encode record {}: {}", R::KEY, e),
    }
}

/// Left-to-right button ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderRecord(pub Vec<String>);

impl Record for OrderRecord {
    const KEY: &'static str = "order";
}

/// Button id -> normalized key token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HotkeysRecord(pub BTreeMap<String, String>);

impl Record for HotkeysRecord {
    const KEY: &'static str = "hotkeys";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomSound {
    /// Empty for uploads saved before ids were persisted.
    #[serde(default)]
    pub id: String,
    pub label: String,
    #[serde(rename = "dataUrl")]
    pub data_url: String,
    #[serde(default)]
    pub color: Color,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomSoundsRecord(pub Vec<CustomSound>);

impl Record for CustomSoundsRecord {
    const KEY: &'static str = "customSounds";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackgroundRecord(pub Option<Background>);

impl Record for BackgroundRecord {
    const KEY: &'static str = "background";
}
