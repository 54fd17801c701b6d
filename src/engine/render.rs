use std::fs;
use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, TryRecvError};

use super::buffer::StereoBuffer;
use super::error::{EngineError, EngineResult};
use super::messages::EngineMsg;
use super::mixer::{Mixer, NUM_CHANNELS};

/// Most control messages applied per callback; the rest wait for the next one
const MAX_MSGS_PER_CALLBACK: usize = 64;

/// Upstream audio for one mixer channel (sequencer voice, sample player, ...).
/// Called on the audio thread once per block, so it must not block or allocate.
pub trait ChannelSource: Send {
  fn render(&mut self, left: &mut [f32], right: &mut [f32]);
}

impl<F> ChannelSource for F
where
  F: FnMut(&mut [f32], &mut [f32]) + Send,
{
  fn render(&mut self, left: &mut [f32], right: &mut [f32]) { self(left, right) }
}

pub struct Silence;

impl ChannelSource for Silence {
  fn render(&mut self, left: &mut [f32], right: &mut [f32]) { left.fill(0.0); right.fill(0.0); }
}

/// Everything the audio callback owns: the mixer, the channel sources and
/// the scratch buffers they render into. Shared by the live stream and
/// offline bounces.
pub struct Renderer {
  mixer: Mixer,
  sources: Vec<Box<dyn ChannelSource>>,
  inputs: Vec<StereoBuffer>,
  out: StereoBuffer,
  block: usize,
  rx: Option<Receiver<EngineMsg>>,
  playing: bool,
}

impl Renderer {
  pub fn new(mixer: Mixer, mut sources: Vec<Box<dyn ChannelSource>>) -> Self {
    if sources.len() > NUM_CHANNELS {
      log::warn!("{} channel sources given, only the first {} are mixed", sources.len(), NUM_CHANNELS);
      sources.truncate(NUM_CHANNELS);
    }
    while sources.len() < NUM_CHANNELS { sources.push(Box::new(Silence)); }
    let block = mixer.context().block_size;
    Self {
      mixer,
      sources,
      inputs: (0..NUM_CHANNELS).map(|_| StereoBuffer::silence(block)).collect(),
      out: StereoBuffer::silence(block),
      block,
      rx: None,
      playing: true,
    }
  }

  /// Attaches the control queue drained at the top of every callback.
  pub fn with_receiver(mut self, rx: Receiver<EngineMsg>) -> Self { self.rx = Some(rx); self }

  pub fn mixer(&self) -> &Mixer { &self.mixer }
  pub fn mixer_mut(&mut self) -> &mut Mixer { &mut self.mixer }
  pub fn block_size(&self) -> usize { self.block }
  pub fn sample_rate(&self) -> f32 { self.mixer.context().sample_rate }
  pub fn is_playing(&self) -> bool { self.playing }

  pub fn apply(&mut self, msg: EngineMsg) {
    match msg {
      EngineMsg::SetVolume { ch, volume } => self.mixer.set_channel_volume(ch, volume),
      EngineMsg::SetMute { ch, on } => self.mixer.set_mute(ch, on),
      EngineMsg::SetSolo { ch, on } => self.mixer.set_solo(ch, on),
      EngineMsg::SetParams(patch) => self.mixer.set_params(&patch),
      EngineMsg::Transport { playing } => self.playing = playing,
    }
  }

  // Drain without blocking, with a cap so a flood of writes can't starve audio
  fn drain(&mut self) {
    let Some(rx) = self.rx.take() else { return };
    for _ in 0..MAX_MSGS_PER_CALLBACK {
      match rx.try_recv() {
        Ok(msg) => self.apply(msg),
        Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
      }
    }
    self.rx = Some(rx);
  }

  /// Renders interleaved frames into `data` with `channels` samples per frame.
  /// Left/right land on the first two slots; extra slots are zeroed and a
  /// mono device gets the left side.
  pub fn render_interleaved(&mut self, data: &mut [f32], channels: usize) {
    self.drain();
    if !self.playing || channels == 0 {
      data.fill(0.0);
      self.mixer.clear_meters();
      return;
    }
    for chunk in data.chunks_mut(self.block * channels) {
      let frames = chunk.len() / channels;
      self.render_frames(frames);
      for (n, frame) in chunk.chunks_mut(channels).enumerate() {
        if n >= frames { frame.fill(0.0); continue; }
        frame[0] = self.out.left[n];
        if frame.len() > 1 { frame[1] = self.out.right[n]; }
        for extra in frame.iter_mut().skip(2) { *extra = 0.0; }
      }
    }
  }

  /// Renders at most one block into the internal output buffer and returns it.
  pub fn render_block(&mut self, frames: usize) -> (&[f32], &[f32]) {
    self.drain();
    let frames = frames.min(self.block);
    if !self.playing {
      self.out.fill_silence();
      self.mixer.clear_meters();
    } else {
      self.render_frames(frames);
    }
    (&self.out.left[..frames], &self.out.right[..frames])
  }

  fn render_frames(&mut self, frames: usize) {
    for (src, buf) in self.sources.iter_mut().zip(self.inputs.iter_mut()) {
      let (l, r) = buf.split_mut(frames);
      src.render(l, r);
    }
    let (l, r) = self.out.split_mut(frames);
    self.mixer.process(&self.inputs, l, r);
  }
}

/// Renders `frames` frames offline and writes them as a 32-bit float stereo WAV.
pub fn bounce_to_wav(renderer: &mut Renderer, frames: usize, path: &Path) -> EngineResult<()> {
  let spec = hound::WavSpec {
    channels: 2,
    sample_rate: renderer.sample_rate().round() as u32,
    bits_per_sample: 32,
    sample_format: hound::SampleFormat::Float,
  };
  let mut writer = hound::WavWriter::create(path, spec)?;
  let block = renderer.block_size();
  let mut data = vec![0.0f32; block * 2];
  let mut left = frames;
  while left > 0 {
    let n = left.min(block);
    let chunk = &mut data[..n * 2];
    renderer.render_interleaved(chunk, 2);
    for &s in chunk.iter() { writer.write_sample(s)?; }
    left -= n;
  }
  writer.finalize()?;
  log::info!("bounced {} frames to {}", frames, path.display());
  Ok(())
}

/// First unused `bounceN.wav` inside `dir`, creating the directory if needed.
pub fn next_bounce_path(dir: &Path) -> EngineResult<PathBuf> {
  fs::create_dir_all(dir)?;
  let mut n = 1;
  loop {
    let p = dir.join(format!("bounce{n}.wav"));
    if !p.exists() { return Ok(p); }
    n += 1;
  }
}

/// `~/Documents/trackerstudio/bounces/bounceN.wav`
pub fn default_bounce_path() -> EngineResult<PathBuf> {
  let documents = dirs::document_dir().ok_or(EngineError::NoDocumentsDir)?;
  next_bounce_path(&documents.join("trackerstudio").join("bounces"))
}
