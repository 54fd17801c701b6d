use serde::{Deserialize, Serialize};

pub const BIT_DEPTH_MIN: u32 = 1;
pub const BIT_DEPTH_MAX: u32 = 16;
pub const RATE_DIV_MIN: u32 = 1;
pub const RATE_DIV_MAX: u32 = 16;
pub const DELAY_TIME_MIN: f32 = 0.01;
pub const DELAY_TIME_MAX: f32 = 1.9;
pub const DELAY_FEEDBACK_MAX: f32 = 0.95;
pub const REVERB_SIZE_MIN: f32 = 0.1;

/// Master chain parameters. Every write goes through `apply`, so the
/// stored values are always inside their documented ranges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DspParams {
  bit_depth: u32,
  sample_rate_div: u32,
  delay_time: f32,
  delay_feedback: f32,
  delay_mix: f32,
  reverb_mix: f32,
  reverb_size: f32,
}

impl Default for DspParams {
  fn default() -> Self {
    Self {
      bit_depth: BIT_DEPTH_MAX,
      sample_rate_div: RATE_DIV_MIN,
      delay_time: 0.3,
      delay_feedback: 0.3,
      delay_mix: 0.0,
      reverb_mix: 0.0,
      reverb_size: 0.5,
    }
  }
}

/// Partial update for `DspParams`. `None` leaves the field as it is.
/// Keys are camelCase on the wire (`{"bitDepth": 8, "delayMix": 0.4}`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DspParamsPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub bit_depth: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sample_rate_div: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub delay_time: Option<f32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub delay_feedback: Option<f32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub delay_mix: Option<f32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reverb_mix: Option<f32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reverb_size: Option<f32>,
}

impl DspParamsPatch {
  pub fn is_empty(&self) -> bool { *self == Self::default() }
}

// NaN lands on the lower bound instead of poisoning the chain.
#[inline]
fn clamp_f(v: f32, lo: f32, hi: f32) -> f32 {
  if v.is_nan() { lo } else { v.clamp(lo, hi) }
}

impl DspParams {
  pub fn apply(&mut self, patch: &DspParamsPatch) {
    if let Some(v) = patch.bit_depth { self.bit_depth = v.clamp(BIT_DEPTH_MIN, BIT_DEPTH_MAX); }
    if let Some(v) = patch.sample_rate_div { self.sample_rate_div = v.clamp(RATE_DIV_MIN, RATE_DIV_MAX); }
    if let Some(v) = patch.delay_time { self.delay_time = clamp_f(v, DELAY_TIME_MIN, DELAY_TIME_MAX); }
    if let Some(v) = patch.delay_feedback { self.delay_feedback = clamp_f(v, 0.0, DELAY_FEEDBACK_MAX); }
    if let Some(v) = patch.delay_mix { self.delay_mix = clamp_f(v, 0.0, 1.0); }
    if let Some(v) = patch.reverb_mix { self.reverb_mix = clamp_f(v, 0.0, 1.0); }
    if let Some(v) = patch.reverb_size { self.reverb_size = clamp_f(v, REVERB_SIZE_MIN, 1.0); }
  }

  pub fn with(mut self, patch: &DspParamsPatch) -> Self { self.apply(patch); self }

  /// A patch that sets every field to the current value.
  pub fn to_patch(&self) -> DspParamsPatch {
    DspParamsPatch {
      bit_depth: Some(self.bit_depth),
      sample_rate_div: Some(self.sample_rate_div),
      delay_time: Some(self.delay_time),
      delay_feedback: Some(self.delay_feedback),
      delay_mix: Some(self.delay_mix),
      reverb_mix: Some(self.reverb_mix),
      reverb_size: Some(self.reverb_size),
    }
  }

  #[inline] pub fn bit_depth(&self) -> u32 { self.bit_depth }
  #[inline] pub fn sample_rate_div(&self) -> u32 { self.sample_rate_div }
  #[inline] pub fn delay_time(&self) -> f32 { self.delay_time }
  #[inline] pub fn delay_feedback(&self) -> f32 { self.delay_feedback }
  #[inline] pub fn delay_mix(&self) -> f32 { self.delay_mix }
  #[inline] pub fn reverb_mix(&self) -> f32 { self.reverb_mix }
  #[inline] pub fn reverb_size(&self) -> f32 { self.reverb_size }
}
