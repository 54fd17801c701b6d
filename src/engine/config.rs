//! Engine configuration.
//!
//! Everything here is optional on disk; a missing key falls back to the
//! default. `AudioContext` is the resolved, device-facing subset the mixer
//! is built from once the output rate is known.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::EngineResult;
use super::params::DspParamsPatch;

/// Frames rendered per DSP block when nothing else is requested
pub const DEFAULT_BLOCK_SIZE: usize = 512;
/// Largest block the render scratch buffers are sized for
pub const MAX_BLOCK_SIZE: usize = 8192;
pub const MIN_BLOCK_SIZE: usize = 16;
/// Length of the gain ramp applied on volume / mute / solo changes
pub const DEFAULT_GAIN_RAMP_MS: f32 = 10.0;
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
/// Used when the host hands us a nonsensical rate
pub const FALLBACK_SAMPLE_RATE: f32 = 48_000.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
  /// Preferred output rate. `None` tries 44.1 kHz, then 48 kHz, then the device maximum.
  pub sample_rate: Option<u32>,
  pub block_size: usize,
  pub gain_ramp_ms: f32,
  /// Capacity of the control -> audio message queue
  pub queue_capacity: usize,
  /// Master chain settings applied when the mixer is built
  pub dsp: DspParamsPatch,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      sample_rate: None,
      block_size: DEFAULT_BLOCK_SIZE,
      gain_ramp_ms: DEFAULT_GAIN_RAMP_MS,
      queue_capacity: DEFAULT_QUEUE_CAPACITY,
      dsp: DspParamsPatch::default(),
    }
  }
}

impl EngineConfig {
  pub fn from_json_str(text: &str) -> EngineResult<Self> {
    let cfg: Self = serde_json::from_str(text)?;
    Ok(cfg.sanitized())
  }

  pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let cfg = Self::from_json_str(&text)?;
    log::info!("loaded engine config from {}", path.display());
    Ok(cfg)
  }

  /// Pulls every field back into a range the engine can run with.
  pub fn sanitized(mut self) -> Self {
    self.block_size = self.block_size.clamp(MIN_BLOCK_SIZE, MAX_BLOCK_SIZE);
    self.gain_ramp_ms = if self.gain_ramp_ms.is_finite() { self.gain_ramp_ms.clamp(0.0, 500.0) } else { DEFAULT_GAIN_RAMP_MS };
    self.queue_capacity = self.queue_capacity.max(8);
    self
  }

  /// Resolves the context for a negotiated device sample rate.
  pub fn context(&self, sample_rate: f32) -> AudioContext {
    AudioContext::new(sample_rate, self.block_size).with_gain_ramp_ms(self.gain_ramp_ms)
  }
}

/// What the mixer needs to know about the host: rate, block size, ramp time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AudioContext {
  pub sample_rate: f32,
  pub block_size: usize,
  pub gain_ramp_ms: f32,
}

impl AudioContext {
  pub fn new(sample_rate: f32, block_size: usize) -> Self {
    let sample_rate = if sample_rate.is_finite() && sample_rate >= 1000.0 { sample_rate } else { FALLBACK_SAMPLE_RATE };
    Self { sample_rate, block_size: block_size.clamp(MIN_BLOCK_SIZE, MAX_BLOCK_SIZE), gain_ramp_ms: DEFAULT_GAIN_RAMP_MS }
  }

  pub fn with_gain_ramp_ms(mut self, ms: f32) -> Self {
    self.gain_ramp_ms = if ms.is_finite() { ms.max(0.0) } else { DEFAULT_GAIN_RAMP_MS };
    self
  }

  #[inline]
  pub fn ramp_samples(&self) -> u32 { (self.gain_ramp_ms * 0.001 * self.sample_rate).round() as u32 }
}
