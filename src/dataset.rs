use thiserror::Error;

pub mod mnist;
pub mod download;
pub mod loader;

pub use mnist::{ MnistDataset, Split };
pub use loader::{ Batch, BatchLoader };

pub const WIDTH: usize = 28;
pub const HEIGHT: usize = 28;


/// A single handwritten digit.

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
  /// Normalized pixel intensities in `[-1, 1]`, row by row.
  pub image: [[f32; WIDTH]; HEIGHT],
  pub label: u8,
}


/// A finite, indexable collection of items.

pub trait Dataset<I> {
  fn get(&self, index: usize) -> Option<I>;

  fn len(&self) -> usize;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }
}


/// Dataset holding all of its items in memory.

#[derive(Debug, Clone)]
pub struct InMemDataset<I> {
  items: Vec<I>,
}

impl<I> InMemDataset<I> {
  pub fn new(items: Vec<I>) -> Self {
    Self { items }
  }
}

impl<I: Clone> Dataset<I> for InMemDataset<I> {
  fn get(&self, index: usize) -> Option<I> {
    self.items.get(index).cloned()
  }

  fn len(&self) -> usize {
    self.items.len()
  }
}


#[derive(Debug, Error)]
pub enum DatasetError {
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("Could not download {name} from any mirror")]
  Unavailable { name: String },

  #[error("{name}: expected magic number {expected}, found {found}")]
  Magic { name: String, expected: u32, found: u32 },

  #[error("{name}: expected 28x28 images, found {rows}x{cols}")]
  ImageSize { name: String, rows: u32, cols: u32 },

  #[error("{name}: expected {expected} bytes of data, found {found}")]
  Truncated { name: String, expected: u64, found: u64 },

  #[error("Found {images} images but {labels} labels")]
  CountMismatch { images: usize, labels: usize },

  #[error("Label {label} of sample {index} is not a digit")]
  Label { index: usize, label: u8 },
}


/// Learnable stand-in for MNIST: each class lights up its own band of rows.
#[cfg(test)]
pub(crate) fn synthetic(count: usize, seed: u64) -> InMemDataset<Sample> {
  use rand::Rng;

  let mut rng = crate::internal::make_rng(Some(seed));
  let items = (0..count).map(|i| {
    let label = (i % 10) as u8;
    let mut image = [[-1.0; WIDTH]; HEIGHT];
    for (y, row) in image.iter_mut().enumerate() {
      let lit = y / 2 == label as usize;
      for pixel in row.iter_mut() {
        let noise: f32 = rng.gen_range(0.0, 0.3);
        *pixel = if lit { 1.0 - noise } else { -1.0 + noise };
      }
    }
    Sample { image, label }
  }).collect();
  InMemDataset::new(items)
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn in_memory() {
    let dataset = InMemDataset::new(vec![3, 1, 4]);
    assert_eq!(dataset.len(), 3);
    assert_eq!(dataset.get(2), Some(4));
    assert_eq!(dataset.get(3), None);
    assert!(InMemDataset::<u8>::new(vec![]).is_empty());
  }

  #[test]
  fn synthetic_samples() {
    let dataset = synthetic(20, 1);
    assert_eq!(dataset.len(), 20);
    let sample = dataset.get(13).unwrap();
    assert_eq!(sample.label, 3);
    assert!(sample.image[6][0] > 0.5);
    assert!(sample.image[0][0] < -0.5);
    assert!(sample.image.iter().flatten().all(|&p| (-1.0..=1.0).contains(&p) ));
  }
}
