//! Single-key hotkeys: normalization, the id <-> key map and the capture
//! state machine that assigns them.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;

use super::registry::{EMPTY_PILL, PENDING_PILL};
use crate::store::HotkeysRecord;

pub const ESCAPE: &str = "escape";

static NAMED_KEYS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for (alias, token) in [
        ("space", "space"),
        ("spacebar", "space"),
        ("enter", "enter"),
        ("return", "enter"),
        ("tab", "tab"),
        ("backspace", "backspace"),
        ("delete", "delete"),
        ("del", "delete"),
        ("insert", "insert"),
        ("escape", ESCAPE),
        ("esc", ESCAPE),
        ("arrowup", "up"),
        ("up", "up"),
        ("arrowdown", "down"),
        ("down", "down"),
        ("arrowleft", "left"),
        ("left", "left"),
        ("arrowright", "right"),
        ("right", "right"),
        ("home", "home"),
        ("end", "end"),
        ("pageup", "pageup"),
        ("pagedown", "pagedown"),
    ] {
        m.insert(alias, token);
    }
    m
});

/// Maps a raw key name (as a UI toolkit reports it) to the stored token.
///
/// Single characters are lower-cased, named keys map onto a fixed vocabulary.
/// Modifiers and anything else unknown return `None`.
pub fn normalize(raw: &str) -> Option<String> {
    let mut chars = raw.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c == ' ' {
            return Some("space".to_string());
        }
        if c.is_control() {
            return None;
        }
        return Some(c.to_lowercase().collect());
    }
    let lower = raw.trim().to_ascii_lowercase();
    if let Some(token) = NAMED_KEYS.get(lower.as_str()) {
        return Some((*token).to_string());
    }
    match lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
        Some(n @ 1..=12) => Some(format!("f{n}")),
        _ => None,
    }
}

/// `[K]` for a bound key, the placeholder otherwise.
pub fn pill_text(key: Option<&str>) -> String {
    match key {
        Some(k) => format!("[{}]", k.to_uppercase()),
        None => EMPTY_PILL.to_string(),
    }
}

/// Button id -> key token, at most one id per token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HotkeyMap {
    by_id: BTreeMap<String, String>,
}

impl HotkeyMap {
    /// Builds the map from the persisted record. If several ids claim the
    /// same token the first one in id order keeps it.
    pub fn from_record(record: HotkeysRecord) -> Self {
        let mut map = Self::default();
        for (id, key) in record.0 {
            if map.owner(&key).is_none() {
                map.by_id.insert(id, key);
            }
        }
        map
    }

    pub fn to_record(&self) -> HotkeysRecord {
        HotkeysRecord(self.by_id.clone())
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(String::as_str)
    }

    pub fn owner(&self, key: &str) -> Option<&str> {
        self.by_id.iter().find(|(_, k)| k.as_str() == key).map(|(id, _)| id.as_str())
    }

    /// Binds `key` to `id`, returning the id it was taken from, if any.
    pub fn assign(&mut self, id: &str, key: &str) -> Option<String> {
        let evicted = self.owner(key).filter(|owner| *owner != id).map(str::to_string);
        if let Some(prev) = &evicted {
            self.by_id.remove(prev);
        }
        self.by_id.insert(id.to_string(), key.to_string());
        evicted
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_id.iter().map(|(id, k)| (id.as_str(), k.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Capturing(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// One of the chaos/loop/stop toggle keys.
    Reserved,
    /// A key with no token (modifiers, unknown names).
    Unsupported,
}

/// What a keypress did while capturing.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    Cancelled { id: String },
    Rejected { id: String, key: String, reason: RejectReason },
    Assigned { id: String, key: String, evicted: Option<String> },
}

impl CaptureOutcome {
    pub fn id(&self) -> &str {
        match self {
            CaptureOutcome::Cancelled { id }
            | CaptureOutcome::Rejected { id, .. }
            | CaptureOutcome::Assigned { id, .. } => id,
        }
    }
}

/// Owns the map and the Idle/Capturing state.
#[derive(Debug, Clone)]
pub struct Hotkeys {
    state: CaptureState,
    map: HotkeyMap,
    reserved: Vec<String>,
}

impl Hotkeys {
    pub fn new(map: HotkeyMap, reserved: &[&str]) -> Self {
        let reserved = reserved.iter().filter_map(|k| normalize(k)).collect();
        Self { state: CaptureState::Idle, map, reserved }
    }

    pub fn map(&self) -> &HotkeyMap {
        &self.map
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn capturing(&self) -> Option<&str> {
        match &self.state {
            CaptureState::Capturing(id) => Some(id),
            CaptureState::Idle => None,
        }
    }

    pub fn is_reserved(&self, token: &str) -> bool {
        self.reserved.iter().any(|r| r == token)
    }

    /// Enters capture for `id`. Returns the button a previous capture was
    /// abandoned for, so its pill can be reverted.
    pub fn begin(&mut self, id: &str) -> Option<String> {
        let prev = std::mem::replace(&mut self.state, CaptureState::Capturing(id.to_string()));
        match prev {
            CaptureState::Capturing(p) if p != id => Some(p),
            _ => None,
        }
    }

    /// Feeds a keypress. `None` when not capturing; the key is then free
    /// for normal dispatch. Every outcome returns the machine to `Idle`.
    pub fn on_key(&mut self, raw: &str) -> Option<CaptureOutcome> {
        let CaptureState::Capturing(id) = std::mem::replace(&mut self.state, CaptureState::Idle) else {
            return None;
        };
        let Some(key) = normalize(raw) else {
            return Some(CaptureOutcome::Rejected { id, key: raw.to_string(), reason: RejectReason::Unsupported });
        };
        if key == ESCAPE {
            return Some(CaptureOutcome::Cancelled { id });
        }
        if self.is_reserved(&key) {
            return Some(CaptureOutcome::Rejected { id, key, reason: RejectReason::Reserved });
        }
        let evicted = self.map.assign(&id, &key);
        Some(CaptureOutcome::Assigned { id, key, evicted })
    }

    /// Button bound to this keypress, if any.
    pub fn lookup(&self, raw: &str) -> Option<&str> {
        let key = normalize(raw)?;
        self.map.owner(&key)
    }

    /// Pill text for `id` in the current state.
    pub fn pill_for(&self, id: &str) -> String {
        if self.capturing() == Some(id) {
            PENDING_PILL.to_string()
        } else {
            pill_text(self.map.get(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> Hotkeys {
        Hotkeys::new(HotkeyMap::default(), &["c", "l", "s"])
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize("K").as_deref(), Some("k"));
        assert_eq!(normalize(" ").as_deref(), Some("space"));
        assert_eq!(normalize("Spacebar").as_deref(), Some("space"));
        assert_eq!(normalize("ArrowUp").as_deref(), Some("up"));
        assert_eq!(normalize("Enter").as_deref(), Some("enter"));
        assert_eq!(normalize("Esc").as_deref(), Some("escape"));
        assert_eq!(normalize("F5").as_deref(), Some("f5"));
        assert_eq!(normalize("F13"), None);
        assert_eq!(normalize("Shift"), None);
        assert_eq!(normalize("\t"), None);
        assert_eq!(normalize("7").as_deref(), Some("7"));
    }

    #[test]
    fn assignment_evicts_previous_owner() {
        let mut hk = machine();
        hk.begin("A");
        assert!(matches!(hk.on_key("k"), Some(CaptureOutcome::Assigned { evicted: None, .. })));
        hk.begin("B");
        let out = hk.on_key("K").unwrap();
        assert_eq!(
            out,
            CaptureOutcome::Assigned { id: "B".into(), key: "k".into(), evicted: Some("A".into()) }
        );
        assert_eq!(hk.map().get("A"), None);
        assert_eq!(hk.map().get("B"), Some("k"));
        assert_eq!(hk.pill_for("A"), "---");
        assert_eq!(hk.pill_for("B"), "[K]");
        assert_eq!(hk.state(), &CaptureState::Idle);
    }

    #[test]
    fn reserved_keys_are_never_bound() {
        for k in ["c", "L", "s"] {
            let mut hk = machine();
            hk.begin("A");
            let before = hk.map().clone();
            let out = hk.on_key(k).unwrap();
            assert!(matches!(out, CaptureOutcome::Rejected { reason: RejectReason::Reserved, .. }));
            assert_eq!(hk.map(), &before);
            assert_eq!(hk.capturing(), None);
        }
    }

    #[test]
    fn escape_cancels_and_keeps_old_binding() {
        let mut hk = machine();
        hk.begin("A");
        hk.on_key("q");
        hk.begin("A");
        assert_eq!(hk.pill_for("A"), "???");
        assert_eq!(hk.on_key("Escape"), Some(CaptureOutcome::Cancelled { id: "A".into() }));
        assert_eq!(hk.pill_for("A"), "[Q]");
        assert_eq!(hk.on_key("x"), None);
    }

    #[test]
    fn unsupported_keys_are_rejected() {
        let mut hk = machine();
        hk.begin("A");
        let out = hk.on_key("Control").unwrap();
        assert!(matches!(out, CaptureOutcome::Rejected { reason: RejectReason::Unsupported, .. }));
        assert_eq!(hk.map().get("A"), None);
    }

    #[test]
    fn switching_capture_target_reports_abandoned_button() {
        let mut hk = machine();
        assert_eq!(hk.begin("A"), None);
        assert_eq!(hk.begin("B").as_deref(), Some("A"));
        assert_eq!(hk.begin("B"), None);
    }

    #[test]
    fn duplicate_tokens_in_record_keep_first_owner() {
        let mut rec = BTreeMap::new();
        rec.insert("b_a".to_string(), "k".to_string());
        rec.insert("b_b".to_string(), "k".to_string());
        rec.insert("b_c".to_string(), "j".to_string());
        let map = HotkeyMap::from_record(HotkeysRecord(rec));
        assert_eq!(map.owner("k"), Some("b_a"));
        assert_eq!(map.get("b_b"), None);
        assert_eq!(map.get("b_c"), Some("j"));
    }

    #[test]
    fn lookup_normalizes() {
        let mut hk = machine();
        hk.begin("A");
        hk.on_key(" ");
        assert_eq!(hk.lookup("Spacebar"), Some("A"));
        assert_eq!(hk.lookup("x"), None);
    }
}
