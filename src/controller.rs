//! Session state and event handling for one board.
//!
//! The UI forwards raw events (clicks, key presses, input values, drag
//! gestures) to [`Controller`] and renders what it exposes afterwards: the
//! items with their pills and hidden/dragging flags, the volume fields, the
//! mode flags and any pending notices.

use std::collections::BTreeSet;

use log::{debug, info, warn};

use crate::background::Background;
use crate::board::hotkeys::{self, CaptureOutcome, HotkeyMap, Hotkeys, RejectReason};
use crate::board::registry::{new_upload_id, Registry, SoundItem};
use crate::board::{filter, order, Color, SoundButton};
use crate::config::Config;
use crate::engine::playback::{AudioBackend, PlaybackManager};
use crate::engine::volume::VolumeController;
use crate::error::{Error, Result};
use crate::paths::SourceResolver;
use crate::store::{self, BackgroundRecord, CustomSound, CustomSoundsRecord, HotkeysRecord, KvStore};

/// What a keydown ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyOutcome {
    /// Consumed by hotkey capture.
    Capture(CaptureOutcome),
    Chaos(bool),
    Loop(bool),
    Stopped,
    Played(String),
    Ignored,
}

/// Toolkit-neutral UI events, for front ends that prefer one entry point.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Click(String),
    MapTrigger(String),
    KeyDown { key: String, in_text_field: bool },
    PctInput(String),
    BoostInput(String),
    BoostCommit(String),
    SearchInput(String),
    ColorFilter { color: Color, enabled: bool },
    DragStart(String),
    DragOver { target: String, fraction: Option<f32> },
    Drop,
    DragEnd,
    ChaosButton,
    LoopButton,
    StopButton,
}

fn is_key(token: &str, configured: &str) -> bool {
    hotkeys::normalize(configured).as_deref() == Some(token)
}

pub struct Controller<B: AudioBackend> {
    config: Config,
    resolver: SourceResolver,
    store: Box<dyn KvStore>,
    registry: Registry,
    hotkeys: Hotkeys,
    volume: VolumeController,
    playback: PlaybackManager<B>,
    query: String,
    enabled: BTreeSet<Color>,
    dragging: Option<String>,
    background: Option<Background>,
    notices: Vec<String>,
}

impl<B: AudioBackend> Controller<B> {
    /// Builds the board: built-ins first, then stored uploads, then the saved
    /// order, hotkey labels, filters and background.
    pub fn new(config: Config, store: Box<dyn KvStore>, backend: B, builtins: Vec<SoundButton>) -> Self {
        let resolver = SourceResolver::new(&config.sound_dir, &config.image_dir);
        let map = HotkeyMap::from_record(store::load::<HotkeysRecord, _>(&store));
        let hotkeys = Hotkeys::new(map, &config.reserved_keys());
        let background = store::load::<BackgroundRecord, _>(&store).0;
        let mut c = Self {
            playback: PlaybackManager::new(backend, resolver.clone()),
            resolver,
            config,
            store,
            registry: Registry::new(),
            hotkeys,
            volume: VolumeController::new(),
            query: String::new(),
            enabled: filter::all_colors(),
            dragging: None,
            background,
            notices: Vec::new(),
        };

        for b in builtins {
            if !c.registry.register(b) {
                debug!("duplicate built-in button skipped");
            }
        }
        c.load_uploads();
        let saved = order::restore(&c.store);
        order::apply(&mut c.registry, &saved);
        c.refresh_pills();
        c.apply_filters();
        let gain = c.volume.gain();
        c.playback.set_gain(gain);
        info!("board ready with {} buttons", c.registry.len());
        c
    }

    fn load_uploads(&mut self) {
        let mut record = store::load::<CustomSoundsRecord, _>(&self.store);
        let mut assigned = false;
        for cs in record.0.iter_mut() {
            if cs.id.is_empty() {
                cs.id = new_upload_id();
                assigned = true;
            }
            let button = SoundButton::upload(cs.id.clone(), cs.label.clone(), cs.data_url.clone(), cs.color);
            self.registry.register(button);
        }
        if assigned {
            store::save(&mut self.store, &record);
        }
    }

    fn refresh_pills(&mut self) {
        let hotkeys = &self.hotkeys;
        for item in self.registry.items_mut() {
            let id = item.button.id.clone();
            item.button.hotkey = hotkeys.map().get(&id).map(str::to_string);
            item.pill = hotkeys.pill_for(&id);
        }
    }

    fn refresh_pill(&mut self, id: &str) {
        let key = self.hotkeys.map().get(id).map(str::to_string);
        let pill = self.hotkeys.pill_for(id);
        if let Some(item) = self.registry.get_mut(id) {
            item.button.hotkey = key;
            item.pill = pill;
        }
    }

    fn apply_filters(&mut self) {
        let visible = filter::apply(self.registry.buttons(), &self.query, &self.enabled);
        for (item, v) in self.registry.items_mut().zip(visible) {
            item.hidden = !v;
        }
    }

    fn notify(&mut self, msg: String) {
        info!("notice: {}", msg);
        self.notices.push(msg);
    }

    // --- projection -------------------------------------------------------

    pub fn items(&self) -> &[SoundItem] {
        self.registry.items()
    }

    pub fn item(&self, id: &str) -> Option<&SoundItem> {
        self.registry.get(id)
    }

    pub fn hotkey(&self, id: &str) -> Option<&str> {
        self.hotkeys.map().get(id)
    }

    pub fn capturing(&self) -> Option<&str> {
        self.hotkeys.capturing()
    }

    pub fn volume(&self) -> &VolumeController {
        &self.volume
    }

    pub fn chaos(&self) -> bool {
        self.playback.chaos()
    }

    pub fn looping(&self) -> bool {
        self.playback.looping()
    }

    pub fn playback(&self) -> &PlaybackManager<B> {
        &self.playback
    }

    pub fn playback_mut(&mut self) -> &mut PlaybackManager<B> {
        &mut self.playback
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn enabled_colors(&self) -> &BTreeSet<Color> {
        &self.enabled
    }

    pub fn background(&self) -> Option<&Background> {
        self.background.as_ref()
    }

    /// CSS background for the page, if one was chosen.
    pub fn background_style(&self) -> Option<String> {
        self.background.as_ref().map(|b| b.style(&self.resolver))
    }

    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // --- playback ---------------------------------------------------------

    pub fn on_click(&mut self, id: &str) -> Result<()> {
        let item = self.registry.get(id).ok_or_else(|| Error::UnknownButton(id.to_string()))?;
        let source = item.button.source.clone();
        let label = item.button.label.clone();
        match self.playback.play(&source) {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("play {}: {}", id, e);
                self.notify(format!("Could not play \"{}\"", label));
                Err(e)
            }
        }
    }

    pub fn toggle_chaos(&mut self) -> bool {
        self.playback.toggle_chaos()
    }

    pub fn toggle_loop(&mut self) -> bool {
        self.playback.toggle_loop()
    }

    pub fn stop_all(&mut self) {
        self.playback.stop_all();
    }

    // --- volume -----------------------------------------------------------

    pub fn on_pct_input(&mut self, raw: &str) -> f32 {
        let gain = self.volume.on_pct_input(raw);
        self.playback.set_gain(gain);
        gain
    }

    pub fn on_boost_input(&mut self, raw: &str) -> f32 {
        let gain = self.volume.on_boost_input(raw);
        self.playback.set_gain(gain);
        gain
    }

    pub fn on_boost_commit(&mut self, raw: &str) -> f32 {
        let gain = self.volume.on_boost_commit(raw);
        self.playback.set_gain(gain);
        gain
    }

    // --- hotkeys ----------------------------------------------------------

    pub fn on_map_trigger(&mut self, id: &str) -> Result<()> {
        if self.registry.get(id).is_none() {
            return Err(Error::UnknownButton(id.to_string()));
        }
        if let Some(abandoned) = self.hotkeys.begin(id) {
            self.refresh_pill(&abandoned);
        }
        self.refresh_pill(id);
        Ok(())
    }

    pub fn on_key_down(&mut self, raw: &str, in_text_field: bool) -> KeyOutcome {
        if let Some(outcome) = self.hotkeys.on_key(raw) {
            self.finish_capture(&outcome);
            return KeyOutcome::Capture(outcome);
        }
        if in_text_field {
            return KeyOutcome::Ignored;
        }
        let Some(key) = hotkeys::normalize(raw) else {
            return KeyOutcome::Ignored;
        };
        if is_key(&key, &self.config.chaos_key) {
            return KeyOutcome::Chaos(self.toggle_chaos());
        }
        if is_key(&key, &self.config.loop_key) {
            return KeyOutcome::Loop(self.toggle_loop());
        }
        if is_key(&key, &self.config.stop_key) {
            self.stop_all();
            return KeyOutcome::Stopped;
        }
        // bindings for ids not on this board stay stored but do nothing
        let bound = self.hotkeys.lookup(raw).filter(|id| self.registry.get(id).is_some());
        match bound.map(str::to_string) {
            Some(id) => {
                // failures already surfaced as a notice
                let _ = self.on_click(&id);
                KeyOutcome::Played(id)
            }
            None => KeyOutcome::Ignored,
        }
    }

    fn finish_capture(&mut self, outcome: &CaptureOutcome) {
        match outcome {
            CaptureOutcome::Cancelled { id } => {
                self.refresh_pill(id);
                self.apply_filters();
            }
            CaptureOutcome::Rejected { id, key, reason } => {
                self.refresh_pill(id);
                self.apply_filters();
                let msg = match reason {
                    RejectReason::Reserved => format!(
                        "\"{}\" is reserved for chaos/loop/stop and cannot be a hotkey",
                        key.to_uppercase()
                    ),
                    RejectReason::Unsupported => format!("\"{}\" cannot be used as a hotkey", key),
                };
                self.notify(msg);
            }
            CaptureOutcome::Assigned { id, key, evicted } => {
                if let Some(prev) = evicted {
                    self.refresh_pill(prev);
                    debug!("hotkey {} moved from {} to {}", key, prev, id);
                }
                self.refresh_pill(id);
                let record = self.hotkeys.map().to_record();
                store::save(&mut self.store, &record);
            }
        }
    }

    // --- search / filter --------------------------------------------------

    pub fn on_search_input(&mut self, query: &str) {
        self.query = query.to_string();
        self.apply_filters();
    }

    pub fn on_color_filter(&mut self, color: Color, enabled: bool) {
        if enabled {
            self.enabled.insert(color);
        } else {
            self.enabled.remove(&color);
        }
        self.apply_filters();
    }

    // --- drag and drop ----------------------------------------------------

    pub fn on_drag_start(&mut self, id: &str) -> bool {
        let Some(item) = self.registry.get_mut(id) else { return false };
        if !item.draggable {
            return false;
        }
        item.dragging = true;
        self.dragging = Some(id.to_string());
        true
    }

    /// `fraction` is the pointer position across the target (0.0 = leading
    /// edge). At or past the midpoint the dragged item goes after the target.
    pub fn on_drag_over(&mut self, target: &str, fraction: Option<f32>) -> bool {
        let Some(dragged) = self.dragging.clone() else { return false };
        let after = fraction.map_or(false, |f| f >= 0.5);
        self.registry.move_next_to(&dragged, target, after)
    }

    pub fn on_drop(&mut self) {}

    pub fn on_drag_end(&mut self) {
        let Some(id) = self.dragging.take() else { return };
        if let Some(item) = self.registry.get_mut(&id) {
            item.dragging = false;
        }
        order::save(&mut self.store, self.registry.ids());
    }

    // --- uploads ----------------------------------------------------------

    /// Adds a user sound at the end of the board and persists it.
    pub fn upload(&mut self, label: &str, data_url: &str, color: Color) -> String {
        let id = new_upload_id();
        self.registry.register(SoundButton::upload(id.clone(), label, data_url, color));
        let mut record = store::load::<CustomSoundsRecord, _>(&self.store);
        record.0.push(CustomSound {
            id: id.clone(),
            label: label.to_string(),
            data_url: data_url.to_string(),
            color,
        });
        store::save(&mut self.store, &record);
        self.refresh_pill(&id);
        self.apply_filters();
        id
    }

    pub fn set_background(&mut self, background: Option<Background>) {
        self.background = background;
        let record = BackgroundRecord(self.background.clone());
        store::save(&mut self.store, &record);
    }

    // --- single entry point -----------------------------------------------

    pub fn dispatch(&mut self, event: UiEvent) -> Result<Option<KeyOutcome>> {
        match event {
            UiEvent::Click(id) => self.on_click(&id)?,
            UiEvent::MapTrigger(id) => self.on_map_trigger(&id)?,
            UiEvent::KeyDown { key, in_text_field } => {
                return Ok(Some(self.on_key_down(&key, in_text_field)));
            }
            UiEvent::PctInput(v) => {
                self.on_pct_input(&v);
            }
            UiEvent::BoostInput(v) => {
                self.on_boost_input(&v);
            }
            UiEvent::BoostCommit(v) => {
                self.on_boost_commit(&v);
            }
            UiEvent::SearchInput(q) => self.on_search_input(&q),
            UiEvent::ColorFilter { color, enabled } => self.on_color_filter(color, enabled),
            UiEvent::DragStart(id) => {
                self.on_drag_start(&id);
            }
            UiEvent::DragOver { target, fraction } => {
                self.on_drag_over(&target, fraction);
            }
            UiEvent::Drop => self.on_drop(),
            UiEvent::DragEnd => self.on_drag_end(),
            UiEvent::ChaosButton => {
                self.toggle_chaos();
            }
            UiEvent::LoopButton => {
                self.toggle_loop();
            }
            UiEvent::StopButton => self.stop_all(),
        }
        Ok(None)
    }
}
