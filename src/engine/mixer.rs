use std::sync::Arc;

use crossbeam_channel::{Receiver, TryRecvError};
use dasp::frame::Stereo;
use dasp::Frame;

use super::decode::Clip;
use super::messages::{EngineMsg, VoiceId};
use super::state::ActiveVoices;

/// Messages applied per buffer at most, so a burst never starves the callback.
pub const MAX_MSGS_PER_BUFFER: usize = 24;

struct Voice {
  id: VoiceId,
  clip: Arc<Clip>,
  pos: f64,
  step: f64,
  looping: bool,
  routed: bool,
  done: bool,
}

impl Voice {
  fn next_frame(&mut self) -> Option<Stereo<f32>> {
    let frames = self.clip.frames();
    if frames == 0 || self.pos >= frames as f64 {
      return None;
    }
    let i = self.pos.floor() as usize;
    let frac = (self.pos - i as f64) as f32;
    let a = self.clip.frame(i);
    let next = if i + 1 < frames { Some(i + 1) } else if self.looping { Some(0) } else { None };
    let out: Stereo<f32> = match next {
      Some(j) => a.zip_map(self.clip.frame(j), |x, y| x + (y - x) * frac),
      None => a,
    };
    self.pos += self.step;
    if self.looping && self.pos >= frames as f64 {
      self.pos %= frames as f64;
    }
    Some(out)
  }
}

/// Sums every voice into one stereo stream.
///
/// Routed voices pass through the shared gain stage; unrouted ones are added
/// at unity. Output is clamped to [-1, 1].
pub struct Mixer {
  sr: u32,
  voices: Vec<Voice>,
  gain: f32,
  running: bool,
  active: ActiveVoices,
}

impl Mixer {
  pub fn new(sr: u32, active: ActiveVoices) -> Self {
    Self { sr: sr.max(1), voices: Vec::new(), gain: 1.0, running: false, active }
  }

  pub fn sample_rate(&self) -> u32 { self.sr }

  pub fn gain(&self) -> f32 { self.gain }

  pub fn is_running(&self) -> bool { self.running }

  pub fn voice_count(&self) -> usize { self.voices.len() }

  /// Returns `false` on `Quit`.
  pub fn apply(&mut self, msg: EngineMsg) -> bool {
    match msg {
      EngineMsg::Resume => self.running = true,
      EngineMsg::Start { voice, clip, looping, routed } => {
        let step = clip.sample_rate as f64 / self.sr as f64;
        self.voices.push(Voice { id: voice, clip, pos: 0.0, step, looping, routed, done: false });
        self.active.insert(voice);
      }
      EngineMsg::Route { voice } => {
        if let Some(v) = self.voices.iter_mut().find(|v| v.id == voice) {
          v.routed = true;
        }
      }
      EngineMsg::Stop { voice } => {
        self.voices.retain(|v| v.id != voice);
        self.active.remove(voice);
      }
      EngineMsg::SetGain { gain } => self.gain = gain.max(0.0),
      EngineMsg::Quit => {
        self.running = false;
        return false;
      }
    }
    true
  }

  /// Drains pending messages without blocking. `false` once the engine should shut down.
  pub fn pump(&mut self, rx: &Receiver<EngineMsg>) -> bool {
    for _ in 0..MAX_MSGS_PER_BUFFER {
      match rx.try_recv() {
        Ok(msg) => {
          if !self.apply(msg) {
            return false;
          }
        }
        Err(TryRecvError::Empty) => break,
        Err(TryRecvError::Disconnected) => return false,
      }
    }
    true
  }

  pub fn render_frame(&mut self) -> Stereo<f32> {
    if !self.running {
      return Stereo::<f32>::EQUILIBRIUM;
    }
    let mut routed = Stereo::<f32>::EQUILIBRIUM;
    let mut direct = Stereo::<f32>::EQUILIBRIUM;
    for v in self.voices.iter_mut().filter(|v| !v.done) {
      match v.next_frame() {
        Some(f) if v.routed => routed = routed.add_amp(f),
        Some(f) => direct = direct.add_amp(f),
        None => v.done = true,
      }
    }
    let out: Stereo<f32> = routed.scale_amp(self.gain).add_amp(direct).map(|s| s.clamp(-1.0, 1.0));
    out
  }

  /// Fills an interleaved buffer of `channels` channels. Channels past the
  /// second are silent; a mono device gets the left channel.
  pub fn render(&mut self, out: &mut [f32], channels: usize) {
    let channels = channels.max(1);
    for frame in out.chunks_mut(channels) {
      let [l, r] = self.render_frame();
      for (c, s) in frame.iter_mut().enumerate() {
        *s = match c {
          0 => l,
          1 => r,
          _ => 0.0,
        };
      }
    }
    self.reap();
  }

  fn reap(&mut self) {
    if !self.voices.iter().any(|v| v.done) {
      return;
    }
    let ended: Vec<VoiceId> = self.voices.iter().filter(|v| v.done).map(|v| v.id).collect();
    self.voices.retain(|v| !v.done);
    self.active.remove_all(&ended);
  }
}
