use thiserror::Error;

/// Errors from the control side of the engine: device setup, config loading,
/// bounces and rejected control writes. The render path itself never fails.
#[derive(Error, Debug)]
pub enum EngineError {
  #[error("no output device")]
  NoDevice,

  #[error("failed to query output config: {0}")]
  DeviceConfig(#[from] cpal::DefaultStreamConfigError),

  #[error("failed to build output stream: {0}")]
  StreamBuild(#[from] cpal::BuildStreamError),

  #[error("failed to start output stream: {0}")]
  StreamPlay(#[from] cpal::PlayStreamError),

  #[error("unknown parameter: {0}")]
  UnknownParam(String),

  #[error("channel {0} out of range")]
  ChannelOutOfRange(usize),

  #[error("control queue full")]
  QueueFull,

  #[error("engine is gone")]
  Disconnected,

  #[error("invalid config: {0}")]
  Config(#[from] serde_json::Error),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error("wav write failed: {0}")]
  Wav(#[from] hound::Error),

  #[error("could not find Documents directory")]
  NoDocumentsDir,
}

pub type EngineResult<T> = Result<T, EngineError>;
