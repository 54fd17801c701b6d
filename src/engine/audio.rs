use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Receiver;

use super::config::EngineConfig;
use super::control::{control_pair, MixerHandle};
use super::error::{EngineError, EngineResult};
use super::messages::EngineMsg;
use super::mixer::Mixer;
use super::render::{ChannelSource, Renderer};

/// Live output: owns the cpal stream and hands the mixer to its callback.
///
/// Before `start` the mixer sits here; once started it lives on the audio
/// thread and is only reachable through the `MixerHandle`.
pub struct AudioEngine {
  config: EngineConfig,
  sr: f32,
  handle: MixerHandle,
  rx: Receiver<EngineMsg>,
  mixer: Option<Mixer>,
  stream: Option<cpal::Stream>,
}

// Stereo f32 output: preferred rate first, then 44.1k (more compatible), then 48k, then the device max
fn choose_config(device: &cpal::Device, preferred: Option<u32>) -> EngineResult<cpal::SupportedStreamConfig> {
  let rates: Vec<u32> = preferred.into_iter().chain([44_100, 48_000]).collect();
  if let Ok(supported) = device.supported_output_configs() {
    let stereo: Vec<cpal::SupportedStreamConfigRange> = supported
      .filter(|c| c.channels() == 2 && c.sample_format() == cpal::SampleFormat::F32)
      .collect();
    for sr in rates {
      if let Some(range) = stereo.iter().find(|c| c.min_sample_rate().0 <= sr && c.max_sample_rate().0 >= sr) {
        return Ok(range.clone().with_sample_rate(cpal::SampleRate(sr)));
      }
    }
    if let Some(range) = stereo.into_iter().next() {
      return Ok(range.with_max_sample_rate());
    }
  }
  Ok(device.default_output_config()?)
}

fn output_device() -> EngineResult<cpal::Device> {
  cpal::default_host().default_output_device().ok_or(EngineError::NoDevice)
}

impl AudioEngine {
  pub fn new(config: EngineConfig) -> EngineResult<Self> {
    let config = config.sanitized();
    let device = output_device()?;
    let chosen = choose_config(&device, config.sample_rate)?;
    let sr = chosen.sample_rate().0 as f32;
    log::info!("output device {:?} at {} Hz", device.name().ok(), sr);
    let mut mixer = Mixer::new(&config.context(sr));
    mixer.set_params(&config.dsp);
    let (handle, rx) = control_pair(&mixer, config.queue_capacity);
    Ok(Self { config, sr, handle, rx, mixer: Some(mixer), stream: None })
  }

  pub fn sample_rate(&self) -> f32 { self.sr }
  pub fn handle(&self) -> MixerHandle { self.handle.clone() }
  pub fn is_running(&self) -> bool { self.stream.is_some() }

  /// Opens the stream and starts pulling audio from `sources` (one per channel).
  pub fn start(&mut self, sources: Vec<Box<dyn ChannelSource>>) -> EngineResult<()> {
    if self.stream.is_some() { return Ok(()); }
    let device = output_device()?;
    let chosen = choose_config(&device, Some(self.sr as u32))?;
    let channels = chosen.channels() as usize;
    let mut cfg: cpal::StreamConfig = chosen.into();
    // Request a fixed buffer matching the DSP block to keep callbacks uniform
    cfg.buffer_size = cpal::BufferSize::Fixed(self.config.block_size as u32);
    if cfg.sample_rate.0 as f32 != self.sr {
      log::warn!("device now runs at {} Hz, engine was built for {} Hz", cfg.sample_rate.0, self.sr);
    }

    // Mixer moves into the callback; after a stop it is gone, so rebuild from the mirror
    let mixer = match self.mixer.take() {
      Some(m) => m,
      None => {
        let mut m = Mixer::new(&self.config.context(self.sr));
        self.handle.restore_into(&mut m);
        m
      }
    };
    let mut renderer = Renderer::new(mixer, sources).with_receiver(self.rx.clone());

    let err_fn = |e: cpal::StreamError| log::error!("stream error: {e}");
    let stream = device.build_output_stream(
      &cfg,
      move |data: &mut [f32], _: &cpal::OutputCallbackInfo| renderer.render_interleaved(data, channels),
      err_fn,
      None,
    )?;
    stream.play()?;
    log::info!("audio started: {} Hz, {} channels, block {}", cfg.sample_rate.0, channels, self.config.block_size);
    self.stream = Some(stream);
    Ok(())
  }

  pub fn stop(&mut self) {
    if self.stream.take().is_some() { log::info!("audio stopped"); }
  }
}
