use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use super::button::{Color, SoundButton};

pub const EMPTY_PILL: &str = "---";
pub const PENDING_PILL: &str = "???";

/// A registered button with the UI state hanging off it.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundItem {
    pub button: SoundButton,
    /// Read-only hotkey label: `[K]`, `---` or `???` while capturing.
    pub pill: String,
    pub draggable: bool,
    pub dragging: bool,
    pub hidden: bool,
}

/// Registered buttons in visual (left-to-right) order.
#[derive(Debug, Default)]
pub struct Registry {
    items: Vec<SoundItem>,
}

fn now_ms() -> i64 {
    let dur = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    dur.as_millis() as i64
}

static ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Fresh id for an uploaded sound. Unique within the process and across reloads.
pub fn new_upload_id() -> String {
    let ts = now_ms();
    let c = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("c_{}-{}", ts, c)
}

/// Built-in ids are derived from the source so they are stable across reloads.
pub fn builtin_id(source: &str) -> String {
    format!("b_{}", source)
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns missing id/color and wraps the button. Returns `false` if a
    /// button with the same id is already wrapped; nothing changes then.
    pub fn register(&mut self, mut button: SoundButton) -> bool {
        if button.id.is_empty() {
            button.id = builtin_id(&button.source);
        }
        if button.color.is_none() {
            button.color = Some(Color::Green);
        }
        if self.position(&button.id).is_some() {
            return false;
        }
        self.items.push(SoundItem {
            button,
            pill: EMPTY_PILL.to_string(),
            draggable: true,
            dragging: false,
            hidden: false,
        });
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[SoundItem] {
        &self.items
    }

    pub fn items_mut(&mut self) -> impl Iterator<Item = &mut SoundItem> {
        self.items.iter_mut()
    }

    pub fn buttons(&self) -> impl Iterator<Item = &SoundButton> {
        self.items.iter().map(|i| &i.button)
    }

    pub fn ids(&self) -> Vec<String> {
        self.items.iter().map(|i| i.button.id.clone()).collect()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|i| i.button.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&SoundItem> {
        self.items.iter().find(|i| i.button.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut SoundItem> {
        self.items.iter_mut().find(|i| i.button.id == id)
    }

    /// Re-parents `id` to the end of the container.
    pub fn move_to_end(&mut self, id: &str) -> bool {
        let Some(from) = self.position(id) else { return false };
        let item = self.items.remove(from);
        self.items.push(item);
        true
    }

    /// Moves `id` directly before (or after) `target`.
    pub fn move_next_to(&mut self, id: &str, target: &str, after: bool) -> bool {
        if id == target {
            return false;
        }
        let (Some(from), Some(_)) = (self.position(id), self.position(target)) else {
            return false;
        };
        let item = self.items.remove(from);
        // target index shifts once the dragged item is out
        let Some(mut to) = self.position(target) else {
            self.items.insert(from, item);
            return false;
        };
        if after {
            to += 1;
        }
        let moved = to != from;
        self.items.insert(to, item);
        moved
    }
}
