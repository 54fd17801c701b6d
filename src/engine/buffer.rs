/// Planar stereo block: one `Vec` per side, same length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StereoBuffer {
  pub left: Vec<f32>,
  pub right: Vec<f32>,
}

impl StereoBuffer {
  pub fn silence(frames: usize) -> Self { Self { left: vec![0.0; frames], right: vec![0.0; frames] } }

  /// Builds a buffer from two sides; the longer one is cut to match.
  pub fn from_channels(mut left: Vec<f32>, mut right: Vec<f32>) -> Self {
    let n = left.len().min(right.len());
    left.truncate(n); right.truncate(n);
    Self { left, right }
  }

  pub fn mono(samples: &[f32]) -> Self { Self { left: samples.to_vec(), right: samples.to_vec() } }

  #[inline] pub fn len(&self) -> usize { self.left.len().min(self.right.len()) }
  #[inline] pub fn is_empty(&self) -> bool { self.len() == 0 }

  pub fn fill_silence(&mut self) { self.left.fill(0.0); self.right.fill(0.0); }

  /// Both sides, cut to `frames` (or the buffer length if shorter).
  #[inline]
  pub fn split_mut(&mut self, frames: usize) -> (&mut [f32], &mut [f32]) {
    let n = frames.min(self.len());
    (&mut self.left[..n], &mut self.right[..n])
  }

  /// Infinite when any sample is NaN or infinite.
  pub fn peak(&self) -> f32 {
    self.left.iter().chain(self.right.iter()).fold(0.0f32, |m, x| if x.is_finite() { m.max(x.abs()) } else { f32::INFINITY })
  }
}
