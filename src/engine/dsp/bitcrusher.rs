use super::StereoStage;
use crate::engine::params::{DspParams, BIT_DEPTH_MAX, BIT_DEPTH_MIN};

/// Amplitude quantizer. No state beyond the step derived from the bit depth.
pub struct Bitcrusher {
  bits: u32,
  step: f32,
}

impl Bitcrusher {
  pub fn new() -> Self { Self { bits: BIT_DEPTH_MAX, step: 0.0 } }

  pub fn set_bits(&mut self, b: u32) {
    let b = b.clamp(BIT_DEPTH_MIN, BIT_DEPTH_MAX);
    if b == self.bits { return; }
    self.bits = b;
    // 16 bits is treated as a straight wire
    self.step = if b >= BIT_DEPTH_MAX { 0.0 } else { 0.5f32.powi(b as i32 - 1) };
  }

  pub fn bits(&self) -> u32 { self.bits }

  #[inline]
  fn quantize(x: f32, step: f32) -> f32 {
    if step <= 0.0 { return x; }
    (x / step).round() * step
  }
}

impl StereoStage for Bitcrusher {
  fn prepare(&mut self, params: &DspParams) { self.set_bits(params.bit_depth()); }

  #[inline]
  fn process_one(&mut self, l: f32, r: f32) -> (f32, f32) {
    (Self::quantize(l, self.step), Self::quantize(r, self.step))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sixteen_bits_is_identity() {
    let mut cr = Bitcrusher::new();
    cr.set_bits(16);
    for i in 0..2000 {
      let x = ((i as f32) * 0.0137).sin() * 1.3 + 1e-7 * i as f32;
      assert_eq!(cr.process_one(x, -x), (x, -x));
    }
  }

  #[test]
  fn snaps_to_nearest_step() {
    let mut cr = Bitcrusher::new();
    cr.set_bits(3); // step = 0.25
    assert_eq!(cr.process_one(0.3, -0.3), (0.25, -0.25));
    assert_eq!(cr.process_one(0.4, 0.62), (0.5, 0.5));
    assert_eq!(cr.process_one(0.1, 0.9), (0.0, 1.0));
  }

  #[test]
  fn one_bit_leaves_three_levels() {
    let mut cr = Bitcrusher::new();
    cr.set_bits(1);
    assert_eq!(cr.process_one(0.49, -0.51), (0.0, -1.0));
    assert_eq!(cr.process_one(0.8, 0.2), (1.0, 0.0));
  }

  #[test]
  fn depth_is_clamped() {
    let mut cr = Bitcrusher::new();
    cr.set_bits(0);
    assert_eq!(cr.bits(), 1);
    cr.set_bits(40);
    assert_eq!(cr.bits(), 16);
    assert_eq!(cr.process_one(0.123, 0.456), (0.123, 0.456));
  }
}
