use crossbeam_channel::{bounded, Receiver, Sender};

use super::backend::EngineBackend;
use super::messages::EngineMsg;
use super::state::ActiveVoices;
use crate::error::{Error, Result};

pub struct AudioEngine {
  tx: Sender<EngineMsg>,
  rx: Receiver<EngineMsg>,
  active: ActiveVoices,
  pub sr: u32,
  #[cfg(feature = "device")]
  stream: Option<cpal::Stream>,
  #[cfg(not(feature = "device"))]
  null_sink: Option<std::thread::JoinHandle<()>>,
}

impl AudioEngine {
  pub fn new(capacity: usize, preferred_sr: u32) -> Self {
    let (tx, rx) = bounded(capacity.max(1));
    Self {
      tx,
      rx,
      active: ActiveVoices::new(),
      sr: preferred_sr,
      #[cfg(feature = "device")]
      stream: None,
      #[cfg(not(feature = "device"))]
      null_sink: None,
    }
  }

  pub fn sender(&self) -> Sender<EngineMsg> { self.tx.clone() }

  pub fn active(&self) -> ActiveVoices { self.active.clone() }

  /// Backend for a playback manager, resolving file sources under `root`.
  pub fn backend(&self, root: impl Into<std::path::PathBuf>) -> EngineBackend {
    EngineBackend::new(self.sender(), self.active(), root)
  }

  /// Without device support the mixer still runs, in real time, into a null
  /// sink, so voices end on schedule and the board behaves the same.
  #[cfg(not(feature = "device"))]
  pub fn start(&mut self) -> Result<()> {
    use super::mixer::Mixer;
    use std::time::Duration;

    if self.null_sink.is_some() { return Ok(()); }
    const TICK: Duration = Duration::from_millis(10);
    let rx = self.rx.clone();
    let mut mixer = Mixer::new(self.sr, self.active.clone());
    let frames = (self.sr as usize / 100).max(1);
    let handle = std::thread::Builder::new()
      .name("null-sink".into())
      .spawn(move || {
        let mut scratch = vec![0.0f32; frames * 2];
        while mixer.pump(&rx) {
          mixer.render(&mut scratch, 2);
          std::thread::sleep(TICK);
        }
      })
      .map_err(Error::Io)?;
    log::warn!("built without the `device` feature; rendering to a null sink");
    self.null_sink = Some(handle);
    Ok(())
  }

  #[cfg(feature = "device")]
  pub fn start(&mut self) -> Result<()> {
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use super::mixer::Mixer;

    if self.stream.is_some() { return Ok(()); }
    let host = cpal::default_host();
    let device = host
      .default_output_device()
      .ok_or_else(|| Error::OutputUnavailable("no output device".into()))?;

    // prefer the configured rate in f32, then whatever f32 config the device offers
    let mut chosen_cfg: Option<cpal::SupportedStreamConfig> = None;
    if let Ok(supported) = device.supported_output_configs() {
      let ranges: Vec<_> = supported
        .filter(|r| r.sample_format() == cpal::SampleFormat::F32)
        .collect();
      let want = self.sr;
      chosen_cfg = ranges
        .iter()
        .find(|r| r.channels() >= 2 && r.min_sample_rate().0 <= want && r.max_sample_rate().0 >= want)
        .map(|r| r.clone().with_sample_rate(cpal::SampleRate(want)))
        .or_else(|| ranges.first().map(|r| r.clone().with_max_sample_rate()));
    }
    let config = match chosen_cfg {
      Some(cfg) => cfg,
      None => device.default_output_config().map_err(|e| Error::OutputUnavailable(e.to_string()))?,
    };
    let mut cfg: cpal::StreamConfig = config.into();
    // larger buffer, fewer underruns
    cfg.buffer_size = cpal::BufferSize::Fixed(1024);
    self.sr = cfg.sample_rate.0;
    let channels = cfg.channels as usize;

    let rx = self.rx.clone();
    let mut mixer = Mixer::new(self.sr, self.active.clone());
    let mut alive = true;
    let err_fn = |e: cpal::StreamError| log::error!("stream error: {e}");
    let stream = device
      .build_output_stream(
        &cfg,
        move |data: &mut [f32], _| {
          if alive {
            alive = mixer.pump(&rx);
          }
          if alive {
            mixer.render(data, channels);
          } else {
            data.iter_mut().for_each(|s| *s = 0.0);
          }
        },
        err_fn,
        None,
      )
      .map_err(|e| Error::OutputUnavailable(e.to_string()))?;
    stream.play().map_err(|e| Error::OutputUnavailable(e.to_string()))?;
    log::info!("audio output running at {} Hz, {} channels", self.sr, channels);
    self.stream = Some(stream);
    Ok(())
  }

  pub fn stop(&mut self) {
    let _ = self.tx.try_send(EngineMsg::Quit);
    #[cfg(feature = "device")]
    self.stream.take();
    #[cfg(not(feature = "device"))]
    if let Some(handle) = self.null_sink.take() {
      let _ = handle.join();
    }
  }
}

impl Drop for AudioEngine {
  fn drop(&mut self) {
    self.stop();
  }
}
