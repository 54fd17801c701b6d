use super::StereoStage;
use crate::engine::params::DspParams;

// Comb and allpass lengths in samples at 44.1 kHz, scaled to the host rate
const COMB_TUNING: [usize; 4] = [1116, 1188, 1277, 1356];
const ALLPASS_TUNING: usize = 556;
const TUNING_SR: f32 = 44_100.0;

/// Comb feedback at `reverb_size == 1`; always below one so the bank decays.
pub const COMB_FEEDBACK_SCALE: f32 = 0.84;
pub const ALLPASS_GAIN: f32 = 0.7;

struct Comb {
  buf: Vec<f32>,
  wr: usize,
}

impl Comb {
  fn new(len: usize) -> Self { Self { buf: vec![0.0; len.max(1)], wr: 0 } }

  #[inline]
  fn tick(&mut self, x: f32, len: usize, fb: f32) -> f32 {
    // the active length shrinks with reverb size; pull the head back inside it
    if self.wr >= len { self.wr %= len; }
    let y = self.buf[self.wr];
    self.buf[self.wr] = x + y * fb;
    self.wr += 1; if self.wr >= len { self.wr = 0; }
    y
  }
}

struct Allpass {
  buf: Vec<f32>,
  wr: usize,
}

impl Allpass {
  fn new(len: usize) -> Self { Self { buf: vec![0.0; len.max(1)], wr: 0 } }

  #[inline]
  fn tick(&mut self, x: f32) -> f32 {
    let rd = self.buf[self.wr];
    let w = x + rd * ALLPASS_GAIN;
    self.buf[self.wr] = w;
    self.wr += 1; if self.wr >= self.buf.len() { self.wr = 0; }
    rd - ALLPASS_GAIN * w
  }
}

/// Four parallel combs averaged into one allpass diffuser.
///
/// The bank is mono: it is fed the mid of the incoming stereo pair and the
/// diffused tail is added equally to both sides on top of the input.
pub struct Reverb {
  combs: [Comb; 4],
  comb_len: [usize; 4],
  allpass: Allpass,
  fb: f32,
  mix: f32,
}

impl Reverb {
  pub fn new(sr: f32) -> Self {
    let scale = sr / TUNING_SR;
    let sized = |n: usize| ((n as f32 * scale).round() as usize).max(1);
    let combs = COMB_TUNING.map(|n| Comb::new(sized(n)));
    let comb_len = COMB_TUNING.map(sized);
    Self { combs, comb_len, allpass: Allpass::new(sized(ALLPASS_TUNING)), fb: 0.0, mix: 0.0 }
  }

  pub fn set_size(&mut self, size: f32) {
    self.fb = COMB_FEEDBACK_SCALE * size;
    for (len, comb) in self.comb_len.iter_mut().zip(self.combs.iter()) {
      let base = comb.buf.len();
      *len = ((base as f32 * size).ceil() as usize).clamp(1, base);
    }
  }

  pub fn comb_feedback(&self) -> f32 { self.fb }
  pub fn comb_lengths(&self) -> [usize; 4] { self.comb_len }
}

impl StereoStage for Reverb {
  fn prepare(&mut self, params: &DspParams) {
    self.set_size(params.reverb_size());
    self.mix = params.reverb_mix();
  }

  #[inline]
  fn process_one(&mut self, l: f32, r: f32) -> (f32, f32) {
    let x = 0.5 * (l + r);
    let mut acc = 0.0;
    for (comb, &len) in self.combs.iter_mut().zip(self.comb_len.iter()) {
      acc += comb.tick(x, len, self.fb);
    }
    let diffused = self.allpass.tick(acc * 0.25);
    (l + diffused * self.mix, r + diffused * self.mix)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::engine::params::DspParamsPatch;

  fn params(size: f32, mix: f32) -> DspParams {
    DspParams::default().with(&DspParamsPatch { reverb_size: Some(size), reverb_mix: Some(mix), ..Default::default() })
  }

  #[test]
  fn lengths_follow_size() {
    let mut rv = Reverb::new(44_100.0);
    rv.prepare(&params(1.0, 1.0));
    assert_eq!(rv.comb_lengths(), COMB_TUNING);
    rv.prepare(&params(0.5, 1.0));
    assert_eq!(rv.comb_lengths(), [558, 594, 639, 678]);
    assert!((rv.comb_feedback() - 0.42).abs() < 1e-6);
  }

  #[test]
  fn zero_mix_is_identity() {
    let mut rv = Reverb::new(48_000.0);
    rv.prepare(&params(1.0, 0.0));
    for n in 0..10_000 {
      let x = (n as f32 * 0.01).sin();
      assert_eq!(rv.process_one(x, 0.5 * x), (x, 0.5 * x));
    }
  }

  #[test]
  fn impulse_spreads_over_time() {
    let mut rv = Reverb::new(44_100.0);
    rv.prepare(&params(1.0, 1.0));
    let out: Vec<f32> = (0..20_000).map(|n| rv.process_one(if n == 0 { 1.0 } else { 0.0 }, 0.0).0).collect();
    // t = 0 is only the dry impulse; nothing has made it through a comb yet
    assert_eq!(out[0], 1.0);
    let tail = out[1..].iter().filter(|x| x.abs() > 1e-6).count();
    assert!(tail > 100, "only {tail} nonzero tail samples");
    let first = out[1..].iter().position(|x| x.abs() > 1e-6).map(|p| p + 1);
    assert_eq!(first, Some(COMB_TUNING[0]));
  }

  #[test]
  fn tail_decays() {
    let mut rv = Reverb::new(48_000.0);
    rv.prepare(&params(1.0, 1.0));
    rv.process_one(1.0, 1.0);
    let mut last = 0.0f32;
    for _ in 0..(48_000 * 3) { last = last.max(rv.process_one(0.0, 0.0).0.abs()); }
    let late = (0..4800).fold(0.0f32, |m, _| m.max(rv.process_one(0.0, 0.0).0.abs()));
    assert!(late < 1e-4 && late < last);
  }

  #[test]
  fn shrinking_size_keeps_heads_in_range() {
    let mut rv = Reverb::new(48_000.0);
    rv.prepare(&params(1.0, 1.0));
    for _ in 0..1300 { rv.process_one(0.3, 0.3); }
    rv.prepare(&params(0.1, 1.0));
    for _ in 0..1000 {
      let (l, _) = rv.process_one(0.3, 0.3);
      assert!(l.is_finite());
    }
  }
}
