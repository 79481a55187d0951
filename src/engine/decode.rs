use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use base64::Engine as _;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{Error, Result};
use crate::paths::SourceResolver;

/// A decoded sound, interleaved stereo f32.
#[derive(Clone, Debug, PartialEq)]
pub struct Clip {
  pub data: Vec<f32>,
  pub sample_rate: u32,
}

impl Clip {
  pub fn frames(&self) -> usize { self.data.len() / 2 }

  pub fn is_empty(&self) -> bool { self.data.is_empty() }

  #[inline]
  pub fn frame(&self, i: usize) -> [f32; 2] {
    [self.data[i * 2], self.data[i * 2 + 1]]
  }
}

/// Decodes a resolved sound identifier: a path under `root` or a `data:` URL.
pub fn load_source(root: &Path, resolved: &str) -> Result<Clip> {
  if SourceResolver::is_embedded(resolved) {
    let (bytes, ext) = parse_data_url(resolved)?;
    return decode(Box::new(Cursor::new(bytes)), ext, resolved);
  }
  if SourceResolver::is_remote(resolved) || resolved.is_empty() {
    return Err(Error::UnsupportedSource(resolved.to_string()));
  }
  let path = root.join(resolved);
  let file = File::open(&path)?;
  let ext = path.extension().and_then(|e| e.to_str());
  decode(Box::new(file), ext, resolved)
}

/// `data:<mime>;base64,<payload>` -> (bytes, extension hint)
pub fn parse_data_url(url: &str) -> Result<(Vec<u8>, Option<&'static str>)> {
  let rest = url
    .strip_prefix("data:")
    .ok_or_else(|| Error::decode(url_head(url), "not a data URL"))?;
  let (mime, b64) = rest
    .split_once(";base64,")
    .ok_or_else(|| Error::decode(url_head(url), "data URL is not base64"))?;
  let bytes = base64::engine::general_purpose::STANDARD
    .decode(b64.trim())
    .map_err(|e| Error::decode(url_head(url), e))?;
  Ok((bytes, ext_for_mime(mime)))
}

fn url_head(url: &str) -> &str {
  // keep log lines short; payloads can be megabytes
  let end = url.char_indices().nth(40).map(|(i, _)| i).unwrap_or(url.len());
  &url[..end]
}

fn ext_for_mime(mime: &str) -> Option<&'static str> {
  let sub = mime.split('/').nth(1)?.to_ascii_lowercase();
  match sub.as_str() {
    "mpeg" | "mp3" => Some("mp3"),
    "wav" | "wave" | "x-wav" | "vnd.wave" => Some("wav"),
    "flac" | "x-flac" => Some("flac"),
    "aiff" | "x-aiff" => Some("aiff"),
    "ogg" => Some("ogg"),
    _ => None,
  }
}

fn decode(source: Box<dyn MediaSource>, ext: Option<&str>, source_id: &str) -> Result<Clip> {
  let mss = MediaSourceStream::new(source, Default::default());

  let mut hint = Hint::new();
  if let Some(ext) = ext {
    hint.with_extension(ext);
  }

  let meta_opts: MetadataOptions = Default::default();
  let fmt_opts: FormatOptions = Default::default();
  let probed = symphonia::default::get_probe()
    .format(&hint, mss, &fmt_opts, &meta_opts)
    .map_err(|e| Error::decode(url_head(source_id), e))?;
  let mut format = probed.format;

  let track = format
    .tracks()
    .iter()
    .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
    .ok_or_else(|| Error::decode(url_head(source_id), "no supported audio tracks"))?;
  let dec_opts: DecoderOptions = Default::default();
  let mut decoder = symphonia::default::get_codecs()
    .make(&track.codec_params, &dec_opts)
    .map_err(|e| Error::decode(url_head(source_id), e))?;
  let track_id = track.id;

  let mut data: Vec<f32> = Vec::new();
  let mut sample_rate = track.codec_params.sample_rate.unwrap_or(44_100);
  let mut buf: Option<SampleBuffer<f32>> = None;

  loop {
    let packet = match format.next_packet() {
      Ok(packet) => packet,
      // end of stream, or a chained stream we do not follow
      Err(SymError::IoError(_)) | Err(SymError::ResetRequired) => break,
      Err(e) => return Err(Error::decode(url_head(source_id), e)),
    };
    while !format.metadata().is_latest() {
      format.metadata().pop();
    }
    if packet.track_id() != track_id {
      continue;
    }
    let decoded = match decoder.decode(&packet) {
      Ok(d) => d,
      // a corrupt packet is skipped, the rest of the clip still plays
      Err(SymError::DecodeError(e)) => {
        log::debug!("skipping bad packet in {}: {}", url_head(source_id), e);
        continue;
      }
      Err(e) => return Err(Error::decode(url_head(source_id), e)),
    };
    let spec = *decoded.spec();
    sample_rate = spec.rate;
    let channels = spec.channels.count().max(1);
    let sb = buf.get_or_insert_with(|| SampleBuffer::new(decoded.capacity() as u64, spec));
    if sb.capacity() < decoded.capacity() * channels {
      *sb = SampleBuffer::new(decoded.capacity() as u64, spec);
    }
    sb.copy_interleaved_ref(decoded);
    for frame in sb.samples().chunks(channels) {
      let l = frame[0];
      let r = if channels > 1 { frame[1] } else { l };
      data.push(l);
      data.push(r);
    }
  }

  if data.is_empty() {
    return Err(Error::decode(url_head(source_id), "no audio frames"));
  }
  Ok(Clip { data, sample_rate })
}
