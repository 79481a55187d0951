use std::{fs, path::{Path, PathBuf}};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Runtime settings. Every field has a default so a partial JSON file works.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Directory sound and image paths are resolved against.
    pub board_root: PathBuf,
    /// Built-in button manifest, relative to `board_root` unless absolute.
    pub manifest: PathBuf,
    /// Key-value storage file. `None` keeps everything in memory.
    pub storage_path: Option<PathBuf>,
    pub sound_dir: String,
    pub image_dir: String,
    pub chaos_key: String,
    pub loop_key: String,
    pub stop_key: String,
    /// Capacity of the controller -> mixer command channel.
    pub channel_capacity: usize,
    /// Preferred output sample rate; the device may pick another.
    pub sample_rate: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            board_root: PathBuf::from("."),
            manifest: PathBuf::from("board.json"),
            storage_path: default_storage_path(),
            sound_dir: "sounds/".to_string(),
            image_dir: "images/".to_string(),
            chaos_key: "c".to_string(),
            loop_key: "l".to_string(),
            stop_key: "s".to_string(),
            channel_capacity: 256,
            sample_rate: 44_100,
        }
    }
}

fn default_storage_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("soundboard").join("storage.json"))
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn manifest_path(&self) -> PathBuf {
        if self.manifest.is_absolute() {
            self.manifest.clone()
        } else {
            self.board_root.join(&self.manifest)
        }
    }

    /// Keys that toggle chaos/loop or stop playback. They can never be bound.
    pub fn reserved_keys(&self) -> [&str; 3] {
        [self.chaos_key.as_str(), self.loop_key.as_str(), self.stop_key.as_str()]
    }
}
