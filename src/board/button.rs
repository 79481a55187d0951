use std::fmt;

use serde::{Deserialize, Serialize};

/// Filter tag carried by every button. Anything unrecognised reads as green.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "serde_json::Value")]
pub enum Color {
    #[default]
    Green,
    Red,
    Yellow,
    Orange,
}

impl Color {
    pub const ALL: [Color; 4] = [Color::Green, Color::Red, Color::Yellow, Color::Orange];

    pub fn as_str(self) -> &'static str {
        match self {
            Color::Green => "green",
            Color::Red => "red",
            Color::Yellow => "yellow",
            Color::Orange => "orange",
        }
    }

    pub fn parse(s: &str) -> Option<Color> {
        Color::ALL.into_iter().find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl From<String> for Color {
    fn from(s: String) -> Self {
        Color::parse(&s).unwrap_or_default()
    }
}

// null, numbers and other non-strings read as green too
impl From<serde_json::Value> for Color {
    fn from(v: serde_json::Value) -> Self {
        v.as_str().and_then(Color::parse).unwrap_or_default()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SoundButton {
    /// Empty until the registry assigns one.
    pub id: String,
    /// Path under the sound directory, or an embedded `data:` payload.
    pub source: String,
    pub label: String,
    pub color: Option<Color>,
    pub hotkey: Option<String>,
}

impl SoundButton {
    /// A button shipped with the board; its id is derived from `source` on registration.
    pub fn builtin(source: impl Into<String>, label: impl Into<String>, color: Option<Color>) -> Self {
        Self { id: String::new(), source: source.into(), label: label.into(), color, hotkey: None }
    }

    pub fn upload(id: impl Into<String>, label: impl Into<String>, data_url: impl Into<String>, color: Color) -> Self {
        Self {
            id: id.into(),
            source: data_url.into(),
            label: label.into(),
            color: Some(color),
            hotkey: None,
        }
    }

    pub fn color(&self) -> Color {
        self.color.unwrap_or_default()
    }
}

/// One entry of the built-in board manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub sound: String,
    pub label: String,
    #[serde(default)]
    pub color: Option<Color>,
}

impl From<ManifestEntry> for SoundButton {
    fn from(e: ManifestEntry) -> Self {
        SoundButton::builtin(e.sound, e.label, e.color)
    }
}
