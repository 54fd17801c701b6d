use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use super::error::{EngineError, EngineResult};
use super::messages::{EngineMsg, ParamValue};
use super::mixer::{clamp_volume, ChannelMeters, Mixer, NUM_CHANNELS};
use super::params::{DspParams, DspParamsPatch};

// Control-side copy of what the render thread was last told.
#[derive(Clone, Debug)]
struct Mirror {
  volume: [f32; NUM_CHANNELS],
  muted: [bool; NUM_CHANNELS],
  soloed: [bool; NUM_CHANNELS],
  params: DspParams,
  playing: bool,
}

/// Control surface for a mixer living on the audio thread.
///
/// Writes are queued as absolute-state messages; toggles are resolved here
/// against a local mirror so they can answer with the new state right away.
/// Meter reads go straight to the shared atomics.
#[derive(Clone)]
pub struct MixerHandle {
  tx: Sender<EngineMsg>,
  meters: Arc<ChannelMeters>,
  mirror: Arc<Mutex<Mirror>>,
}

/// Creates a handle for `mixer` plus the receiver its renderer should drain.
pub fn control_pair(mixer: &Mixer, capacity: usize) -> (MixerHandle, Receiver<EngineMsg>) {
  let (tx, rx) = bounded(capacity.max(1));
  (MixerHandle::new(tx, mixer), rx)
}

impl MixerHandle {
  pub fn new(tx: Sender<EngineMsg>, mixer: &Mixer) -> Self {
    let mut mirror = Mirror {
      volume: [0.0; NUM_CHANNELS],
      muted: [false; NUM_CHANNELS],
      soloed: [false; NUM_CHANNELS],
      params: *mixer.params(),
      playing: true,
    };
    for ch in 0..NUM_CHANNELS {
      if let Some(s) = mixer.strip(ch) {
        mirror.volume[ch] = s.volume();
        mirror.muted[ch] = s.is_muted();
        mirror.soloed[ch] = s.is_soloed();
      }
    }
    Self { tx, meters: mixer.meters(), mirror: Arc::new(Mutex::new(mirror)) }
  }

  fn mirror(&self) -> MutexGuard<'_, Mirror> {
    self.mirror.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn send(&self, msg: EngineMsg) -> EngineResult<()> {
    self.tx.try_send(msg).map_err(|e| match e {
      TrySendError::Full(m) => {
        log::warn!("control queue full, dropped {:?}", m);
        EngineError::QueueFull
      }
      TrySendError::Disconnected(_) => EngineError::Disconnected,
    })
  }

  fn check(ch: usize) -> EngineResult<()> {
    if ch < NUM_CHANNELS { Ok(()) } else { Err(EngineError::ChannelOutOfRange(ch)) }
  }

  pub fn set_channel_volume(&self, ch: usize, volume: f32) -> EngineResult<()> {
    Self::check(ch)?;
    let volume = clamp_volume(volume);
    self.send(EngineMsg::SetVolume { ch, volume })?;
    self.mirror().volume[ch] = volume;
    Ok(())
  }

  pub fn toggle_mute(&self, ch: usize) -> EngineResult<bool> {
    Self::check(ch)?;
    let mut m = self.mirror();
    let on = !m.muted[ch];
    self.send(EngineMsg::SetMute { ch, on })?;
    m.muted[ch] = on;
    Ok(on)
  }

  pub fn toggle_solo(&self, ch: usize) -> EngineResult<bool> {
    Self::check(ch)?;
    let mut m = self.mirror();
    let on = !m.soloed[ch];
    self.send(EngineMsg::SetSolo { ch, on })?;
    m.soloed[ch] = on;
    Ok(on)
  }

  pub fn set_params(&self, patch: DspParamsPatch) -> EngineResult<()> {
    if patch.is_empty() { return Ok(()); }
    self.send(EngineMsg::SetParams(patch))?;
    self.mirror().params.apply(&patch);
    Ok(())
  }

  /// Path-addressed write: `dsp/<camelCaseName>` or `ch<N>/{volume,mute,solo}`.
  pub fn set_param(&self, path: &str, value: ParamValue) -> EngineResult<()> {
    let msg = EngineMsg::from_path(path, value).inspect_err(|e| log::warn!("rejected param write: {e}"))?;
    match msg {
      EngineMsg::SetVolume { ch, volume } => self.set_channel_volume(ch, volume),
      EngineMsg::SetParams(patch) => self.set_params(patch),
      EngineMsg::SetMute { ch, on } => {
        self.send(msg)?;
        self.mirror().muted[ch] = on;
        Ok(())
      }
      EngineMsg::SetSolo { ch, on } => {
        self.send(msg)?;
        self.mirror().soloed[ch] = on;
        Ok(())
      }
      EngineMsg::Transport { playing } => self.set_transport(playing),
    }
  }

  pub fn set_transport(&self, playing: bool) -> EngineResult<()> {
    self.send(EngineMsg::Transport { playing })?;
    self.mirror().playing = playing;
    Ok(())
  }

  /// Peak of the channel's last block, `[0, 1]`. Zero for unknown channels.
  pub fn channel_level(&self, ch: usize) -> f32 { self.meters.load(ch) }

  pub fn is_muted(&self, ch: usize) -> bool { self.mirror().muted.get(ch).copied().unwrap_or(false) }
  pub fn is_soloed(&self, ch: usize) -> bool { self.mirror().soloed.get(ch).copied().unwrap_or(false) }
  pub fn volume(&self, ch: usize) -> f32 { self.mirror().volume.get(ch).copied().unwrap_or(0.0) }
  pub fn params(&self) -> DspParams { self.mirror().params }
  pub fn is_playing(&self) -> bool { self.mirror().playing }

  /// Pushes the mirrored state onto a freshly built mixer (engine restart).
  pub fn restore_into(&self, mixer: &mut Mixer) {
    let m = self.mirror().clone();
    mixer.set_params(&m.params.to_patch());
    for ch in 0..NUM_CHANNELS {
      mixer.set_channel_volume(ch, m.volume[ch]);
      mixer.set_mute(ch, m.muted[ch]);
      mixer.set_solo(ch, m.soloed[ch]);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::engine::config::AudioContext;

  fn setup(cap: usize) -> (Mixer, MixerHandle, Receiver<EngineMsg>) {
    let mixer = Mixer::new(&AudioContext::new(48_000.0, 128));
    let (h, rx) = control_pair(&mixer, cap);
    (mixer, h, rx)
  }

  #[test]
  fn toggles_answer_immediately_and_queue_absolute_state() {
    let (_m, h, rx) = setup(8);
    assert_eq!(h.toggle_mute(2).unwrap(), true);
    assert_eq!(h.toggle_mute(2).unwrap(), false);
    assert_eq!(h.toggle_solo(0).unwrap(), true);
    let got: Vec<EngineMsg> = rx.try_iter().collect();
    assert_eq!(got, vec![
      EngineMsg::SetMute { ch: 2, on: true },
      EngineMsg::SetMute { ch: 2, on: false },
      EngineMsg::SetSolo { ch: 0, on: true },
    ]);
  }

  #[test]
  fn full_queue_leaves_mirror_untouched() {
    let (_m, h, _rx) = setup(1);
    h.toggle_mute(0).unwrap();
    assert!(matches!(h.toggle_mute(1), Err(EngineError::QueueFull)));
    assert!(!h.is_muted(1));
  }

  #[test]
  fn disconnected_engine_is_reported() {
    let (_m, h, rx) = setup(4);
    drop(rx);
    assert!(matches!(h.set_channel_volume(0, 0.5), Err(EngineError::Disconnected)));
  }

  #[test]
  fn bad_channel_is_an_error() {
    let (_m, h, _rx) = setup(4);
    assert!(matches!(h.toggle_solo(4), Err(EngineError::ChannelOutOfRange(4))));
    assert_eq!(h.channel_level(4), 0.0);
  }

  #[test]
  fn params_mirror_clamps_like_the_engine() {
    let (_m, h, rx) = setup(4);
    h.set_params(DspParamsPatch { delay_feedback: Some(3.0), ..Default::default() }).unwrap();
    assert_eq!(h.params().delay_feedback(), 0.95);
    assert_eq!(rx.len(), 1);
    h.set_params(DspParamsPatch::default()).unwrap();
    assert_eq!(rx.len(), 1);
  }

  #[test]
  fn path_writes_update_the_mirror() {
    let (_m, h, rx) = setup(8);
    h.set_param("ch1/mute", ParamValue::Bool(true)).unwrap();
    h.set_param("ch3/volume", ParamValue::F32(0.25)).unwrap();
    h.set_param("dsp/reverbMix", ParamValue::F32(0.5)).unwrap();
    assert!(h.is_muted(1));
    assert_eq!(h.volume(3), 0.25);
    assert_eq!(h.params().reverb_mix(), 0.5);
    assert_eq!(rx.len(), 3);
    assert!(h.set_param("dsp/nope", ParamValue::F32(0.5)).is_err());
  }

  #[test]
  fn non_finite_volume_is_sent_as_zero() {
    let (_m, h, rx) = setup(4);
    h.set_channel_volume(2, f32::INFINITY).unwrap();
    assert_eq!(h.volume(2), 0.0);
    assert_eq!(rx.try_recv().ok(), Some(EngineMsg::SetVolume { ch: 2, volume: 0.0 }));
  }

  #[test]
  fn restore_rebuilds_mixer_state() {
    let (_m, h, _rx) = setup(16);
    h.toggle_solo(1).unwrap();
    h.toggle_mute(3).unwrap();
    h.set_channel_volume(1, 0.4).unwrap();
    h.set_params(DspParamsPatch { bit_depth: Some(5), ..Default::default() }).unwrap();
    let mut fresh = Mixer::new(&AudioContext::new(48_000.0, 128));
    h.restore_into(&mut fresh);
    assert_eq!([0, 1, 2, 3].map(|c| fresh.effective_gain(c)), [0.0, 0.4, 0.0, 0.0]);
    assert!(fresh.strip(3).is_some_and(|s| s.is_muted()));
    assert_eq!(fresh.params().bit_depth(), 5);
  }
}
