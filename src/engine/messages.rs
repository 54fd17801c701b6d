use serde::Deserialize;

use super::error::{EngineError, EngineResult};
use super::mixer::NUM_CHANNELS;
use super::params::DspParamsPatch;

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub enum ParamValue {
  F32(f32),
  I32(i32),
  Bool(bool),
}

impl ParamValue {
  pub fn as_f32(&self) -> Option<f32> {
    match *self { ParamValue::F32(v) => Some(v), ParamValue::I32(v) => Some(v as f32), ParamValue::Bool(_) => None }
  }
  pub fn as_u32(&self) -> Option<u32> {
    match *self {
      ParamValue::I32(v) => Some(v.max(0) as u32),
      ParamValue::F32(v) if v.is_finite() => Some(v.round().max(0.0) as u32),
      _ => None,
    }
  }
  pub fn as_bool(&self) -> Option<bool> {
    match *self { ParamValue::Bool(b) => Some(b), ParamValue::I32(v) => Some(v != 0), ParamValue::F32(_) => None }
  }
}

/// Control-rate writes delivered to the render thread. All variants are
/// `Copy` so the audio side never frees anything when it drains them.
/// Mute and solo carry absolute state; toggling happens on the sender.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EngineMsg {
  SetVolume { ch: usize, volume: f32 },
  SetMute { ch: usize, on: bool },
  SetSolo { ch: usize, on: bool },
  SetParams(DspParamsPatch),
  Transport { playing: bool },
}

impl EngineMsg {
  /// Resolves a slash path such as `dsp/delayTime` or `ch2/mute` into a message.
  pub fn from_path(path: &str, value: ParamValue) -> EngineResult<Self> {
    let unknown = || EngineError::UnknownParam(path.to_string());
    let (scope, key) = path.split_once('/').ok_or_else(unknown)?;
    if scope == "dsp" {
      let mut p = DspParamsPatch::default();
      match key {
        "bitDepth" => p.bit_depth = Some(value.as_u32().ok_or_else(unknown)?),
        "sampleRateDiv" => p.sample_rate_div = Some(value.as_u32().ok_or_else(unknown)?),
        "delayTime" => p.delay_time = Some(value.as_f32().ok_or_else(unknown)?),
        "delayFeedback" => p.delay_feedback = Some(value.as_f32().ok_or_else(unknown)?),
        "delayMix" => p.delay_mix = Some(value.as_f32().ok_or_else(unknown)?),
        "reverbMix" => p.reverb_mix = Some(value.as_f32().ok_or_else(unknown)?),
        "reverbSize" => p.reverb_size = Some(value.as_f32().ok_or_else(unknown)?),
        _ => return Err(unknown()),
      }
      return Ok(EngineMsg::SetParams(p));
    }
    let ch = scope.strip_prefix("ch").and_then(|n| n.parse::<usize>().ok()).ok_or_else(unknown)?;
    if ch >= NUM_CHANNELS { return Err(EngineError::ChannelOutOfRange(ch)); }
    match key {
      "volume" => Ok(EngineMsg::SetVolume { ch, volume: value.as_f32().ok_or_else(unknown)? }),
      "mute" => Ok(EngineMsg::SetMute { ch, on: value.as_bool().ok_or_else(unknown)? }),
      "solo" => Ok(EngineMsg::SetSolo { ch, on: value.as_bool().ok_or_else(unknown)? }),
      _ => Err(unknown()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dsp_paths_become_single_field_patches() {
    let msg = EngineMsg::from_path("dsp/bitDepth", ParamValue::F32(7.6)).unwrap();
    assert_eq!(msg, EngineMsg::SetParams(DspParamsPatch { bit_depth: Some(8), ..Default::default() }));
    let msg = EngineMsg::from_path("dsp/delayMix", ParamValue::I32(1)).unwrap();
    assert_eq!(msg, EngineMsg::SetParams(DspParamsPatch { delay_mix: Some(1.0), ..Default::default() }));
  }

  #[test]
  fn channel_paths() {
    assert_eq!(EngineMsg::from_path("ch3/solo", ParamValue::Bool(true)).unwrap(), EngineMsg::SetSolo { ch: 3, on: true });
    assert_eq!(EngineMsg::from_path("ch0/volume", ParamValue::F32(0.5)).unwrap(), EngineMsg::SetVolume { ch: 0, volume: 0.5 });
  }

  #[test]
  fn rejects_bad_paths() {
    assert!(matches!(EngineMsg::from_path("ch4/mute", ParamValue::Bool(true)), Err(EngineError::ChannelOutOfRange(4))));
    assert!(matches!(EngineMsg::from_path("dsp/wobble", ParamValue::F32(1.0)), Err(EngineError::UnknownParam(_))));
    assert!(matches!(EngineMsg::from_path("volume", ParamValue::F32(1.0)), Err(EngineError::UnknownParam(_))));
    assert!(matches!(EngineMsg::from_path("ch1/mute", ParamValue::F32(1.0)), Err(EngineError::UnknownParam(_))));
  }
}
