pub mod bitcrusher;
pub mod clip;
pub mod delay;
pub mod rate_reducer;
pub mod reverb;

use super::params::{DspParams, DspParamsPatch};
use bitcrusher::Bitcrusher;
use clip::SoftClip;
use delay::DelayLine;
use rate_reducer::RateReducer;
use reverb::Reverb;

/// One link of the master chain: takes a stereo sample, returns one.
pub trait StereoStage {
  /// Called once at the top of every block with the parameters for that block.
  fn prepare(&mut self, _params: &DspParams) {}
  fn process_one(&mut self, l: f32, r: f32) -> (f32, f32);
}

/// bitcrusher -> rate reducer -> delay -> reverb -> soft clip, in that order.
///
/// Parameters are latched at the start of each block; a `set_params` between
/// blocks takes effect on the next one.
pub struct DspChain {
  params: DspParams,
  crusher: Bitcrusher,
  reducer: RateReducer,
  delay: DelayLine,
  reverb: Reverb,
  clip: SoftClip,
}

impl DspChain {
  pub fn new(sr: f32) -> Self {
    Self {
      params: DspParams::default(),
      crusher: Bitcrusher::new(),
      reducer: RateReducer::new(),
      delay: DelayLine::new(sr),
      reverb: Reverb::new(sr),
      clip: SoftClip,
    }
  }

  pub fn set_params(&mut self, patch: &DspParamsPatch) { self.params.apply(patch); }
  pub fn params(&self) -> &DspParams { &self.params }
  pub fn delay(&self) -> &DelayLine { &self.delay }

  pub fn process_block(&mut self, l: &mut [f32], r: &mut [f32]) {
    let p = self.params;
    self.crusher.prepare(&p);
    self.reducer.prepare(&p);
    self.delay.prepare(&p);
    self.reverb.prepare(&p);
    self.clip.prepare(&p);
    for (xl, xr) in l.iter_mut().zip(r.iter_mut()) {
      let (a, b) = self.crusher.process_one(*xl, *xr);
      let (a, b) = self.reducer.process_one(a, b);
      let (a, b) = self.delay.process_one(a, b);
      let (a, b) = self.reverb.process_one(a, b);
      let (a, b) = self.clip.process_one(a, b);
      *xl = a; *xr = b;
    }
  }
}
