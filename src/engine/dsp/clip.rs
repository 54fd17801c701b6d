use super::StereoStage;

/// Below this magnitude the clipper is a straight wire.
pub const KNEE: f32 = 0.9;

/// Final safety stage. Linear up to `KNEE`, then a tanh shoulder that
/// approaches but never exceeds 1.0.
pub struct SoftClip;

#[inline]
pub fn soft_clip(x: f32) -> f32 {
  let a = x.abs();
  if a <= KNEE { return x; }
  let over = (a - KNEE) / (1.0 - KNEE);
  let y = (KNEE + (1.0 - KNEE) * over.tanh()).min(1.0);
  y.copysign(x)
}

impl StereoStage for SoftClip {
  #[inline]
  fn process_one(&mut self, l: f32, r: f32) -> (f32, f32) { (soft_clip(l), soft_clip(r)) }
}
