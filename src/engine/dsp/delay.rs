use super::StereoStage;
use crate::engine::params::DspParams;

/// Seconds of history each delay buffer holds
pub const MAX_DELAY_SECONDS: f32 = 2.0;

/// Feedback delay with one circular buffer per side and a shared write head.
///
/// The read offset is recomputed in `prepare`, i.e. once per block. A live
/// `delay_time` change therefore jumps the read position at the block edge
/// instead of gliding; there is no interpolation inside a block.
pub struct DelayLine {
  buf_l: Vec<f32>,
  buf_r: Vec<f32>,
  wr: usize,
  len: usize,
  sr: f32,
  delay_samp: usize,
  fb: f32,
  wet: f32,
}

impl DelayLine {
  pub fn new(sr: f32) -> Self {
    let len = ((MAX_DELAY_SECONDS * sr).ceil() as usize).max(2);
    Self { buf_l: vec![0.0; len], buf_r: vec![0.0; len], wr: 0, len, sr, delay_samp: 1, fb: 0.0, wet: 0.0 }
  }

  pub fn capacity(&self) -> usize { self.len }
  pub fn delay_samples(&self) -> usize { self.delay_samp }

  /// Largest magnitude currently stored in either buffer; infinite if any
  /// stored sample is not finite.
  pub fn peak(&self) -> f32 {
    self.buf_l.iter().chain(self.buf_r.iter()).fold(0.0f32, |m, x| if x.is_finite() { m.max(x.abs()) } else { f32::INFINITY })
  }
}

impl StereoStage for DelayLine {
  fn prepare(&mut self, params: &DspParams) {
    let d = (params.delay_time() * self.sr).floor() as usize;
    self.delay_samp = d.min(self.len - 1);
    self.fb = params.delay_feedback();
    self.wet = params.delay_mix();
  }

  #[inline]
  fn process_one(&mut self, l: f32, r: f32) -> (f32, f32) {
    // read BEFORE writing so a zero offset still sees the oldest sample
    let rd = (self.wr + self.len - self.delay_samp) % self.len;
    let yl = self.buf_l[rd];
    let yr = self.buf_r[rd];
    self.buf_l[self.wr] = l + yl * self.fb;
    self.buf_r[self.wr] = r + yr * self.fb;
    self.wr += 1; if self.wr >= self.len { self.wr = 0; }
    let dry = 1.0 - self.wet;
    (l * dry + yl * self.wet, r * dry + yr * self.wet)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::engine::params::DspParamsPatch;

  const SR: f32 = 48_000.0;

  fn params(time: f32, fb: f32, mix: f32) -> DspParams {
    DspParams::default().with(&DspParamsPatch { delay_time: Some(time), delay_feedback: Some(fb), delay_mix: Some(mix), ..Default::default() })
  }

  #[test]
  fn capacity_is_two_seconds() {
    assert_eq!(DelayLine::new(SR).capacity(), 96_000);
    assert_eq!(DelayLine::new(44_100.0).capacity(), 88_200);
  }

  #[test]
  fn impulse_comes_back_once() {
    let mut d = DelayLine::new(SR);
    d.prepare(&params(0.25, 0.0, 1.0));
    let target = (0.25 * SR).round() as usize;
    for n in 0..(target * 2) {
      let x = if n == 0 { 1.0 } else { 0.0 };
      let (l, r) = d.process_one(x, x);
      if n == target { assert_eq!((l, r), (1.0, 1.0)); } else { assert_eq!((l, r), (0.0, 0.0), "sample {n}"); }
    }
  }

  #[test]
  fn dry_mix_passes_input_untouched() {
    let mut d = DelayLine::new(SR);
    d.prepare(&params(0.01, 0.9, 0.0));
    for n in 0..5000 {
      let x = (n as f32 * 0.05).sin();
      assert_eq!(d.process_one(x, -x), (x, -x));
    }
  }

  #[test]
  fn feedback_repeats_decay() {
    let mut d = DelayLine::new(SR);
    d.prepare(&params(0.01, 0.5, 1.0));
    let step = (0.01 * SR).floor() as usize;
    let out: Vec<f32> = (0..step * 3 + 1).map(|n| d.process_one(if n == 0 { 1.0 } else { 0.0 }, 0.0).0).collect();
    assert_eq!(out[step], 1.0);
    assert_eq!(out[step * 2], 0.5);
    assert_eq!(out[step * 3], 0.25);
  }

  #[test]
  fn sustained_input_stays_bounded() {
    let mut d = DelayLine::new(SR);
    let p = params(0.05, 0.95, 0.5);
    let ceiling = 1.0 / (1.0 - p.delay_feedback()) + 1e-3;
    let block = 512;
    for _ in 0..((10.0 * SR) as usize / block) {
      d.prepare(&p);
      for _ in 0..block { d.process_one(1.0, 1.0); }
    }
    assert!(d.peak() <= ceiling, "peak {} above {}", d.peak(), ceiling);
    assert!(d.peak() > 10.0);
  }

  #[test]
  fn peak_flags_a_poisoned_buffer() {
    let mut d = DelayLine::new(SR);
    d.prepare(&params(0.05, 0.5, 0.5));
    d.process_one(f32::NAN, 0.0);
    assert_eq!(d.peak(), f32::INFINITY);
  }

  #[test]
  fn offset_applies_at_block_edge() {
    let mut d = DelayLine::new(SR);
    d.prepare(&params(0.1, 0.0, 1.0));
    assert_eq!(d.delay_samples(), 4800);
    d.process_one(0.0, 0.0);
    d.prepare(&params(0.2, 0.0, 1.0));
    assert_eq!(d.delay_samples(), 9600);
  }
}
