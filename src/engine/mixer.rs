use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use super::buffer::StereoBuffer;
use super::config::AudioContext;
use super::dsp::DspChain;
use super::params::{DspParams, DspParamsPatch};

/// Channel count is fixed for the life of a session
pub const NUM_CHANNELS: usize = 4;
pub const DEFAULT_VOLUME: f32 = 1.0;

/// Fader values are finite and non-negative; NaN and infinities read as 0.
#[inline]
pub fn clamp_volume(v: f32) -> f32 { if v.is_finite() { v.max(0.0) } else { 0.0 } }

#[inline]
fn finite_or_zero(x: f32) -> f32 { if x.is_finite() { x } else { 0.0 } }

/// Linear ramp toward a target gain. Lands exactly on the target after
/// `len` samples, so a settled channel multiplies by the target itself.
pub struct GainRamp {
  y: f32,
  target: f32,
  step: f32,
  left: u32,
  len: u32,
}

impl GainRamp {
  pub fn new(value: f32, len: u32) -> Self { Self { y: value, target: value, step: 0.0, left: 0, len } }

  pub fn set_target(&mut self, t: f32) {
    if t == self.target { return; }
    self.target = t;
    if self.len == 0 { self.y = t; self.left = 0; return; }
    self.step = (t - self.y) / self.len as f32;
    self.left = self.len;
  }

  #[inline]
  pub fn next(&mut self) -> f32 {
    if self.left > 0 {
      self.left -= 1;
      if self.left == 0 { self.y = self.target; } else { self.y += self.step; }
    }
    self.y
  }

  #[inline] pub fn value(&self) -> f32 { self.y }
  #[inline] pub fn target(&self) -> f32 { self.target }
  #[inline] pub fn is_settled(&self) -> bool { self.left == 0 }
}

pub struct ChannelStrip {
  volume: f32,
  muted: bool,
  soloed: bool,
  gain: GainRamp,
}

impl ChannelStrip {
  fn new(ramp_len: u32) -> Self {
    Self { volume: DEFAULT_VOLUME, muted: false, soloed: false, gain: GainRamp::new(DEFAULT_VOLUME, ramp_len) }
  }

  // mute beats solo; an active solo elsewhere silences everyone not soloed
  #[inline]
  fn effective_gain(&self, has_solo: bool) -> f32 {
    if self.muted { 0.0 } else if has_solo && !self.soloed { 0.0 } else { self.volume }
  }

  pub fn volume(&self) -> f32 { self.volume }
  pub fn is_muted(&self) -> bool { self.muted }
  pub fn is_soloed(&self) -> bool { self.soloed }
  /// Gain the strip is heading to (or sitting at).
  pub fn gain_target(&self) -> f32 { self.gain.target() }
  pub fn gain_settled(&self) -> bool { self.gain.is_settled() }
}

/// Per-channel peak of the last rendered block, shared with the control side.
/// Stored as raw `f32` bits.
pub struct ChannelMeters([AtomicU32; NUM_CHANNELS]);

impl ChannelMeters {
  pub fn new() -> Self { Self(std::array::from_fn(|_| AtomicU32::new(0))) }

  #[inline]
  pub fn store(&self, ch: usize, level: f32) {
    if let Some(m) = self.0.get(ch) { m.store(level.to_bits(), Ordering::Relaxed); }
  }

  /// Level in `[0, 1]`; unknown channels read as silence.
  pub fn load(&self, ch: usize) -> f32 {
    self.0.get(ch).map_or(0.0, |m| f32::from_bits(m.load(Ordering::Relaxed)))
  }
}

/// Four channel strips summed into the master chain.
///
/// Out-of-range channel indices are ignored: setters do nothing, toggles
/// report `false`, meters read zero.
pub struct Mixer {
  ctx: AudioContext,
  strips: [ChannelStrip; NUM_CHANNELS],
  has_solo: bool,
  chain: DspChain,
  meters: Arc<ChannelMeters>,
}

impl Mixer {
  pub fn new(ctx: &AudioContext) -> Self {
    let ramp = ctx.ramp_samples();
    Self {
      ctx: *ctx,
      strips: std::array::from_fn(|_| ChannelStrip::new(ramp)),
      has_solo: false,
      chain: DspChain::new(ctx.sample_rate),
      meters: Arc::new(ChannelMeters::new()),
    }
  }

  pub fn context(&self) -> &AudioContext { &self.ctx }
  pub fn strip(&self, ch: usize) -> Option<&ChannelStrip> { self.strips.get(ch) }
  pub fn has_solo(&self) -> bool { self.has_solo }
  pub fn meters(&self) -> Arc<ChannelMeters> { Arc::clone(&self.meters) }
  pub fn params(&self) -> &DspParams { self.chain.params() }
  pub fn chain(&self) -> &DspChain { &self.chain }

  pub fn set_params(&mut self, patch: &DspParamsPatch) { self.chain.set_params(patch); }

  /// Target gain after mute/solo resolution; 0 for unknown channels.
  pub fn effective_gain(&self, ch: usize) -> f32 {
    self.strips.get(ch).map_or(0.0, |s| s.effective_gain(self.has_solo))
  }

  pub fn set_channel_volume(&mut self, ch: usize, volume: f32) {
    let Some(strip) = self.strips.get_mut(ch) else { return };
    strip.volume = clamp_volume(volume);
    self.recompute_gain(ch);
  }

  pub fn toggle_mute(&mut self, ch: usize) -> bool {
    let Some(on) = self.strips.get(ch).map(|s| !s.muted) else { return false };
    self.set_mute(ch, on);
    on
  }

  pub fn set_mute(&mut self, ch: usize, on: bool) {
    let Some(strip) = self.strips.get_mut(ch) else { return };
    strip.muted = on;
    self.recompute_gain(ch);
  }

  pub fn toggle_solo(&mut self, ch: usize) -> bool {
    let Some(on) = self.strips.get(ch).map(|s| !s.soloed) else { return false };
    self.set_solo(ch, on);
    on
  }

  /// Solo is global: changing one flag can silence or release every other channel.
  pub fn set_solo(&mut self, ch: usize, on: bool) {
    let Some(strip) = self.strips.get_mut(ch) else { return };
    strip.soloed = on;
    self.has_solo = self.strips.iter().any(|s| s.soloed);
    self.recompute_gains();
  }

  pub fn channel_level(&self, ch: usize) -> f32 { self.meters.load(ch) }

  /// Zeroes every meter; used when nothing is being rendered.
  pub fn clear_meters(&self) {
    for ch in 0..NUM_CHANNELS { self.meters.store(ch, 0.0); }
  }

  fn recompute_gain(&mut self, ch: usize) {
    let has_solo = self.has_solo;
    if let Some(strip) = self.strips.get_mut(ch) {
      let g = strip.effective_gain(has_solo);
      strip.gain.set_target(g);
    }
  }

  pub fn recompute_gains(&mut self) {
    for ch in 0..NUM_CHANNELS { self.recompute_gain(ch); }
  }

  /// Mixes `inputs` (one buffer per channel, missing ones are silent) into
  /// `out_l`/`out_r` and runs the master chain over the result. The frame
  /// count is `out_l.len()`; inputs shorter than that read as silence.
  pub fn process(&mut self, inputs: &[StereoBuffer], out_l: &mut [f32], out_r: &mut [f32]) {
    let frames = out_l.len().min(out_r.len());
    let (out_l, out_r) = (&mut out_l[..frames], &mut out_r[..frames]);
    out_l.fill(0.0);
    out_r.fill(0.0);
    for (ch, strip) in self.strips.iter_mut().enumerate() {
      let input = inputs.get(ch);
      let mut peak = 0.0f32;
      for n in 0..frames {
        let g = strip.gain.next();
        let (xl, xr) = match input {
          Some(b) => (b.left.get(n).copied().unwrap_or(0.0), b.right.get(n).copied().unwrap_or(0.0)),
          None => (0.0, 0.0),
        };
        let (yl, yr) = (finite_or_zero(xl * g), finite_or_zero(xr * g));
        peak = peak.max(yl.abs()).max(yr.abs());
        out_l[n] += yl;
        out_r[n] += yr;
      }
      self.meters.store(ch, peak.min(1.0));
    }
    // anything non-finite reaching the chain would live on in its feedback buffers
    for x in out_l.iter_mut().chain(out_r.iter_mut()) { *x = finite_or_zero(*x); }
    self.chain.process_block(out_l, out_r);
  }

  pub fn process_block(&mut self, inputs: &[StereoBuffer], out: &mut StereoBuffer) {
    let n = out.len();
    let (l, r) = out.split_mut(n);
    self.process(inputs, l, r);
  }
}
