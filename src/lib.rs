//! Mixer and master effect chain for a four-channel tracker.
//!
//! Four channel strips (volume, mute, solo) are summed into one bus which
//! runs through a fixed cascade: bitcrusher, sample-rate reducer, feedback
//! delay, comb/allpass reverb and a soft clipper. The `Mixer` is the
//! synchronous core; `AudioEngine` drives it from a cpal output stream and
//! `MixerHandle` is the control surface for the UI side.

pub mod engine {
  pub mod audio;
  pub mod buffer;
  pub mod config;
  pub mod control;
  pub mod dsp;
  pub mod error;
  pub mod messages;
  pub mod mixer;
  pub mod params;
  pub mod render;
}

pub use engine::audio::AudioEngine;
pub use engine::buffer::StereoBuffer;
pub use engine::config::{AudioContext, EngineConfig};
pub use engine::control::{control_pair, MixerHandle};
pub use engine::dsp::{DspChain, StereoStage};
pub use engine::error::{EngineError, EngineResult};
pub use engine::messages::{EngineMsg, ParamValue};
pub use engine::mixer::{ChannelMeters, Mixer, NUM_CHANNELS};
pub use engine::params::{DspParams, DspParamsPatch};
pub use engine::render::{bounce_to_wav, default_bounce_path, ChannelSource, Renderer, Silence};
