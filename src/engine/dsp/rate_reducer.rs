use super::StereoStage;
use crate::engine::params::{DspParams, RATE_DIV_MAX, RATE_DIV_MIN};

/// Zero-order-hold decimator. One counter drives both sides so left and
/// right are always captured on the same sample.
pub struct RateReducer {
  factor: u32,
  cnt: u32,
  hold_l: f32,
  hold_r: f32,
}

impl RateReducer {
  pub fn new() -> Self { Self { factor: RATE_DIV_MIN, cnt: 0, hold_l: 0.0, hold_r: 0.0 } }

  pub fn set_factor(&mut self, f: u32) { self.factor = f.clamp(RATE_DIV_MIN, RATE_DIV_MAX); }
}

impl StereoStage for RateReducer {
  fn prepare(&mut self, params: &DspParams) { self.set_factor(params.sample_rate_div()); }

  #[inline]
  fn process_one(&mut self, l: f32, r: f32) -> (f32, f32) {
    if self.cnt == 0 {
      self.hold_l = l;
      self.hold_r = r;
    }
    // a factor that shrank mid-cycle wraps on the next step
    self.cnt += 1; if self.cnt >= self.factor { self.cnt = 0; }
    (self.hold_l, self.hold_r)
  }
}
