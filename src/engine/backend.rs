use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use crossbeam_channel::{Sender, TrySendError};
use log::{debug, warn};

use super::decode::{self, Clip};
use super::messages::{EngineMsg, VoiceId};
use super::playback::AudioBackend;
use super::state::ActiveVoices;
use crate::error::{Error, Result};

struct Pending {
  clip: Arc<Clip>,
  looping: bool,
}

/// [`AudioBackend`] that decodes on the caller's thread and hands finished
/// clips to the mixer over the engine channel.
pub struct EngineBackend {
  tx: Sender<EngineMsg>,
  active: ActiveVoices,
  root: PathBuf,
  cache: HashMap<String, Arc<Clip>>,
  pending: HashMap<VoiceId, Pending>,
  routed: HashSet<VoiceId>,
  started: HashSet<VoiceId>,
  next_voice: VoiceId,
}

impl EngineBackend {
  pub fn new(tx: Sender<EngineMsg>, active: ActiveVoices, root: impl Into<PathBuf>) -> Self {
    Self {
      tx,
      active,
      root: root.into(),
      cache: HashMap::new(),
      pending: HashMap::new(),
      routed: HashSet::new(),
      started: HashSet::new(),
      next_voice: 1,
    }
  }

  fn send(&self, msg: EngineMsg) -> Result<()> {
    match self.tx.try_send(msg) {
      Ok(()) => Ok(()),
      Err(TrySendError::Full(msg)) => {
        warn!("engine queue full, dropping {:?}", MsgKind(&msg));
        Err(Error::OutputUnavailable("engine queue full".into()))
      }
      Err(TrySendError::Disconnected(_)) => Err(Error::EngineClosed),
    }
  }

  fn clip(&mut self, source: &str) -> Result<Arc<Clip>> {
    if let Some(c) = self.cache.get(source) {
      return Ok(c.clone());
    }
    let clip = Arc::new(decode::load_source(&self.root, source)?);
    self.cache.insert(source.to_string(), clip.clone());
    Ok(clip)
  }

  pub fn cached_clips(&self) -> usize { self.cache.len() }
}

// Clip payloads are large; log only the message kind.
struct MsgKind<'a>(&'a EngineMsg);

impl std::fmt::Debug for MsgKind<'_> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self.0 {
      EngineMsg::Resume => f.write_str("Resume"),
      EngineMsg::Start { voice, .. } => write!(f, "Start({voice})"),
      EngineMsg::Route { voice } => write!(f, "Route({voice})"),
      EngineMsg::Stop { voice } => write!(f, "Stop({voice})"),
      EngineMsg::SetGain { gain } => write!(f, "SetGain({gain})"),
      EngineMsg::Quit => f.write_str("Quit"),
    }
  }
}

impl AudioBackend for EngineBackend {
  type Handle = VoiceId;

  fn resume(&mut self) {
    if let Err(e) = self.send(EngineMsg::Resume) {
      debug!("resume: {}", e);
    }
  }

  fn create(&mut self, source: &str, looping: bool) -> Result<VoiceId> {
    let clip = self.clip(source)?;
    // forget voices that ended on their own
    let active = &self.active;
    self.started.retain(|v| active.contains(*v));
    let pending = &self.pending;
    let started = &self.started;
    self.routed.retain(|v| pending.contains_key(v) || started.contains(v));
    let voice = self.next_voice;
    self.next_voice += 1;
    self.pending.insert(voice, Pending { clip, looping });
    Ok(voice)
  }

  fn route_through_gain(&mut self, voice: &VoiceId) -> Result<()> {
    if self.routed.contains(voice) {
      return Err(Error::AlreadyRouted(*voice));
    }
    if self.started.contains(voice) {
      self.send(EngineMsg::Route { voice: *voice })?;
    } else if !self.pending.contains_key(voice) {
      return Err(Error::UnknownVoice(*voice));
    }
    self.routed.insert(*voice);
    Ok(())
  }

  fn start(&mut self, voice: &VoiceId) -> Result<()> {
    let Pending { clip, looping } = self.pending.remove(voice).ok_or(Error::UnknownVoice(*voice))?;
    let routed = self.routed.contains(voice);
    // marked before sending: the mixer may finish a short clip before we return
    self.active.insert(*voice);
    if let Err(e) = self.send(EngineMsg::Start { voice: *voice, clip, looping, routed }) {
      self.active.remove(*voice);
      self.routed.remove(voice);
      return Err(e);
    }
    self.started.insert(*voice);
    Ok(())
  }

  fn pause(&mut self, voice: &VoiceId) -> Result<()> {
    self.pending.remove(voice);
    self.routed.remove(voice);
    let was_started = self.started.remove(voice);
    self.active.remove(*voice);
    if was_started {
      self.send(EngineMsg::Stop { voice: *voice })?;
    }
    Ok(())
  }

  fn is_active(&self, voice: &VoiceId) -> bool {
    self.active.contains(*voice)
  }

  fn set_gain(&mut self, gain: f32) {
    if let Err(e) = self.send(EngineMsg::SetGain { gain }) {
      debug!("set gain: {}", e);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::engine::mixer::Mixer;
  use base64::Engine as _;
  use std::io::Cursor;

  fn data_url(frames: &[i16]) -> String {
    let spec = hound::WavSpec { channels: 1, sample_rate: 8_000, bits_per_sample: 16, sample_format: hound::SampleFormat::Int };
    let mut cursor = Cursor::new(Vec::new());
    {
      let mut w = hound::WavWriter::new(&mut cursor, spec).unwrap();
      for s in frames { w.write_sample(*s).unwrap(); }
      w.finalize().unwrap();
    }
    format!("data:audio/wav;base64,{}", base64::engine::general_purpose::STANDARD.encode(cursor.into_inner()))
  }

  #[test]
  fn start_reaches_the_mixer_routed() {
    let (tx, rx) = crossbeam_channel::bounded(16);
    let active = ActiveVoices::new();
    let mut be = EngineBackend::new(tx, active.clone(), ".");
    let url = data_url(&[8_192; 16]);

    be.resume();
    let v = be.create(&url, false).unwrap();
    be.route_through_gain(&v).unwrap();
    assert!(matches!(be.route_through_gain(&v), Err(Error::AlreadyRouted(_))));
    be.set_gain(0.5);
    be.start(&v).unwrap();
    assert!(be.is_active(&v));

    let mut mixer = Mixer::new(8_000, active.clone());
    assert!(mixer.pump(&rx));
    assert_eq!(mixer.voice_count(), 1);
    let [l, _] = mixer.render_frame();
    assert!((l - 0.125).abs() < 1e-3);

    be.pause(&v).unwrap();
    assert!(!be.is_active(&v));
    mixer.pump(&rx);
    assert_eq!(mixer.voice_count(), 0);
  }

  #[test]
  fn clips_are_decoded_once() {
    let (tx, _rx) = crossbeam_channel::bounded(16);
    let mut be = EngineBackend::new(tx, ActiveVoices::new(), ".");
    let url = data_url(&[0; 4]);
    let a = be.create(&url, false).unwrap();
    let b = be.create(&url, true).unwrap();
    assert_ne!(a, b);
    assert_eq!(be.cached_clips(), 1);
  }

  #[test]
  fn full_queue_is_an_error_not_a_block() {
    let (tx, _rx) = crossbeam_channel::bounded(1);
    let mut be = EngineBackend::new(tx, ActiveVoices::new(), ".");
    let url = data_url(&[0; 4]);
    be.resume();
    let v = be.create(&url, false).unwrap();
    assert!(be.start(&v).is_err());
    assert!(!be.is_active(&v));
  }

  #[test]
  fn undecodable_source_fails_create() {
    let (tx, _rx) = crossbeam_channel::bounded(16);
    let mut be = EngineBackend::new(tx, ActiveVoices::new(), "/nonexistent");
    assert!(be.create("sounds/missing.wav", false).is_err());
  }
}
