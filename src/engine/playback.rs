use std::fmt::Debug;

use log::{debug, warn};

use crate::error::Result;
use crate::paths::SourceResolver;

/// Where voices actually come from. The engine backend talks to the mixer;
/// tests plug in a recorder.
pub trait AudioBackend {
  type Handle: Clone + Debug + PartialEq;

  /// Wakes a suspended output. Fire-and-forget.
  fn resume(&mut self);
  /// Prepares a voice for `source` (already resolved). Nothing sounds yet.
  fn create(&mut self, source: &str, looping: bool) -> Result<Self::Handle>;
  /// Puts the voice behind the shared gain stage.
  fn route_through_gain(&mut self, handle: &Self::Handle) -> Result<()>;
  fn start(&mut self, handle: &Self::Handle) -> Result<()>;
  fn pause(&mut self, handle: &Self::Handle) -> Result<()>;
  /// False once the voice finished on its own or was paused.
  fn is_active(&self, handle: &Self::Handle) -> bool;
  fn set_gain(&mut self, gain: f32);
}

/// Chaos/loop policy over the set of playing handles.
pub struct PlaybackManager<B: AudioBackend> {
  backend: B,
  resolver: SourceResolver,
  chaos: bool,
  looping: bool,
  playing: Vec<B::Handle>,
}

impl<B: AudioBackend> PlaybackManager<B> {
  pub fn new(backend: B, resolver: SourceResolver) -> Self {
    Self { backend, resolver, chaos: false, looping: false, playing: Vec::new() }
  }

  pub fn backend(&self) -> &B { &self.backend }

  pub fn backend_mut(&mut self) -> &mut B { &mut self.backend }

  pub fn chaos(&self) -> bool { self.chaos }

  pub fn looping(&self) -> bool { self.looping }

  pub fn toggle_chaos(&mut self) -> bool {
    self.chaos = !self.chaos;
    self.chaos
  }

  pub fn toggle_loop(&mut self) -> bool {
    self.looping = !self.looping;
    self.looping
  }

  pub fn playing(&self) -> &[B::Handle] { &self.playing }

  pub fn set_gain(&mut self, gain: f32) { self.backend.set_gain(gain) }

  /// Starts `source`. Without chaos everything else stops first. A voice
  /// that cannot be routed through the gain stage still plays.
  pub fn play(&mut self, source: &str) -> Result<B::Handle> {
    self.backend.resume();
    if !self.chaos {
      self.stop_all();
    } else {
      let backend = &self.backend;
      self.playing.retain(|h| backend.is_active(h));
    }
    let resolved = self.resolver.resolve_sound(source);
    let handle = self.backend.create(&resolved, self.looping)?;
    if let Err(e) = self.backend.route_through_gain(&handle) {
      warn!("{:?} plays without volume control: {}", handle, e);
    }
    self.backend.start(&handle)?;
    self.playing.push(handle.clone());
    Ok(handle)
  }

  pub fn stop_all(&mut self) {
    for h in self.playing.drain(..) {
      if let Err(e) = self.backend.pause(&h) {
        debug!("pause {:?}: {}", h, e);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::Error;
  use std::collections::HashSet;

  #[derive(Default)]
  struct Recorder {
    next: u64,
    log: Vec<String>,
    live: HashSet<u64>,
    fail_route: bool,
    fail_create: bool,
  }

  impl AudioBackend for Recorder {
    type Handle = u64;
    fn resume(&mut self) { self.log.push("resume".into()) }
    fn create(&mut self, source: &str, looping: bool) -> Result<u64> {
      if self.fail_create {
        return Err(Error::UnsupportedSource(source.into()));
      }
      self.next += 1;
      self.log.push(format!("create {} {} loop={}", self.next, source, looping));
      Ok(self.next)
    }
    fn route_through_gain(&mut self, h: &u64) -> Result<()> {
      if self.fail_route { return Err(Error::AlreadyRouted(*h)); }
      self.log.push(format!("route {h}"));
      Ok(())
    }
    fn start(&mut self, h: &u64) -> Result<()> {
      self.live.insert(*h);
      self.log.push(format!("start {h}"));
      Ok(())
    }
    fn pause(&mut self, h: &u64) -> Result<()> {
      self.live.remove(h);
      self.log.push(format!("pause {h}"));
      Ok(())
    }
    fn is_active(&self, h: &u64) -> bool { self.live.contains(h) }
    fn set_gain(&mut self, gain: f32) { self.log.push(format!("gain {gain}")) }
  }

  fn manager() -> PlaybackManager<Recorder> {
    PlaybackManager::new(Recorder::default(), SourceResolver::default())
  }

  #[test]
  fn without_chaos_previous_sound_stops_first() {
    let mut pm = manager();
    let x = pm.play("x.mp3").unwrap();
    let y = pm.play("y.mp3").unwrap();
    let log = &pm.backend().log;
    let pause_x = log.iter().position(|l| *l == format!("pause {x}")).unwrap();
    let start_y = log.iter().position(|l| *l == format!("start {y}")).unwrap();
    assert!(pause_x < start_y);
    assert_eq!(pm.playing(), &[y]);
    assert!(!pm.backend().is_active(&x));
  }

  #[test]
  fn chaos_keeps_sounds_overlapping() {
    let mut pm = manager();
    pm.toggle_chaos();
    let x = pm.play("x.mp3").unwrap();
    let y = pm.play("y.mp3").unwrap();
    assert_eq!(pm.playing(), &[x, y]);
    assert!(pm.backend().is_active(&x));
    assert!(!pm.backend().log.iter().any(|l| l.starts_with("pause")));
  }

  #[test]
  fn loop_mode_and_resolution_reach_the_backend() {
    let mut pm = manager();
    assert!(pm.toggle_loop());
    pm.play("/boing.mp3").unwrap();
    assert!(pm.backend().log.contains(&"create 1 sounds/boing.mp3 loop=true".to_string()));
    assert_eq!(pm.backend().log[0], "resume");
  }

  #[test]
  fn routing_failure_still_plays() {
    let mut pm = manager();
    pm.backend_mut().fail_route = true;
    let h = pm.play("x.mp3").unwrap();
    assert!(pm.backend().is_active(&h));
    assert_eq!(pm.playing(), &[h]);
  }

  #[test]
  fn create_failure_is_reported() {
    let mut pm = manager();
    pm.play("x.mp3").unwrap();
    pm.backend_mut().fail_create = true;
    assert!(pm.play("y.mp3").is_err());
    // the stop policy already ran
    assert!(pm.playing().is_empty());
  }

  #[test]
  fn stop_all_clears_and_chaos_reaps_finished() {
    let mut pm = manager();
    pm.toggle_chaos();
    let x = pm.play("x.mp3").unwrap();
    pm.backend_mut().live.remove(&x);
    let y = pm.play("y.mp3").unwrap();
    assert_eq!(pm.playing(), &[y]);
    pm.stop_all();
    assert!(pm.playing().is_empty());
    assert!(!pm.backend().is_active(&y));
  }
}
