//! Slider/boost synchronisation.
//!
//! The slider is a percentage (0-100). The boost field accepts 0-1000 so a
//! sound can be pushed past unity. Gain is always `boost / 100`.

pub const PCT_MAX: f64 = 100.0;
pub const BOOST_MAX: f64 = 1000.0;

/// Parses `raw` and clamps it into `[min, max]`. Non-numeric input is `min`.
pub fn clamp(raw: &str, min: f64, max: f64) -> f64 {
  match raw.trim().parse::<f64>() {
    Ok(n) if !n.is_nan() => n.clamp(min, max),
    _ => min,
  }
}

/// Integral values print without a fraction, like a number input shows them.
pub fn format_value(v: f64) -> String {
  if v.fract() == 0.0 { format!("{}", v as i64) } else { format!("{}", v) }
}

#[derive(Debug, Clone)]
pub struct VolumeController {
  pct: f64,
  /// What the boost field holds. May be out of range until committed.
  boost_text: String,
}

impl Default for VolumeController {
  fn default() -> Self {
    Self { pct: PCT_MAX, boost_text: format_value(PCT_MAX) }
  }
}

impl VolumeController {
  pub fn new() -> Self { Self::default() }

  /// Slider moved: the boost field follows it.
  pub fn on_pct_input(&mut self, raw: &str) -> f32 {
    let v = clamp(raw, 0.0, PCT_MAX);
    self.pct = v;
    self.boost_text = format_value(v);
    self.gain()
  }

  /// Boost typed: the slider follows, capped at 100.
  pub fn on_boost_input(&mut self, raw: &str) -> f32 {
    self.boost_text = raw.to_string();
    self.pct = self.boost().min(PCT_MAX);
    self.gain()
  }

  /// Boost committed (blur/enter): the field itself is clamped.
  pub fn on_boost_commit(&mut self, raw: &str) -> f32 {
    let b = clamp(raw, 0.0, BOOST_MAX);
    self.boost_text = format_value(b);
    self.pct = b.min(PCT_MAX);
    self.gain()
  }

  pub fn pct(&self) -> f64 { self.pct }

  pub fn pct_text(&self) -> String { format_value(self.pct) }

  pub fn boost(&self) -> f64 { clamp(&self.boost_text, 0.0, BOOST_MAX) }

  pub fn boost_text(&self) -> &str { &self.boost_text }

  /// 0.0 - 10.0
  pub fn gain(&self) -> f32 { (self.boost() / 100.0) as f32 }
}
