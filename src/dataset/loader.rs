use rand::{ rngs::StdRng, seq::SliceRandom };

use crate::{
  tensor::Tensor,
  dataset::{ Dataset, Sample, WIDTH, HEIGHT },
};


/// A group of samples stacked for one step.

#[derive(Debug, Clone)]
pub struct Batch {
  /// Images of shape `[N, 1, 28, 28]`
  pub images: Tensor<f32>,
  pub labels: Vec<usize>,
}

impl Batch {
  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }
}


/// Splits a [Dataset] into batches.
///
/// Every call to [iter](BatchLoader::iter) starts a new epoch. With
/// shuffling enabled, each epoch visits the samples in a fresh order.

#[derive(Debug)]
pub struct BatchLoader<D> {
  dataset: D,
  batch_size: usize,
  shuffle: bool,
  rng: StdRng,
}

impl<D: Dataset<Sample>> BatchLoader<D> {
  pub fn new(dataset: D, batch_size: usize, shuffle: bool, rng: StdRng) -> Self {
    assert!(batch_size > 0, "Batch size must be positive");
    Self { dataset, batch_size, shuffle, rng }
  }

  pub fn dataset(&self) -> &D {
    &self.dataset
  }

  pub fn batch_size(&self) -> usize {
    self.batch_size
  }

  /// Batches per epoch, counting a shorter final batch.

  pub fn num_batches(&self) -> usize {
    (self.dataset.len() + self.batch_size - 1) / self.batch_size
  }

  pub fn iter(&mut self) -> BatchIter<'_, D> {
    let mut order: Vec<usize> = (0..self.dataset.len()).collect();
    if self.shuffle {
      order.shuffle(&mut self.rng);
    }
    BatchIter {
      dataset: &self.dataset,
      batch_size: self.batch_size,
      order,
      cursor: 0,
    }
  }
}


/// One epoch's worth of batches.

pub struct BatchIter<'a, D> {
  dataset: &'a D,
  batch_size: usize,
  order: Vec<usize>,
  cursor: usize,
}

impl<D: Dataset<Sample>> Iterator for BatchIter<'_, D> {
  type Item = Batch;

  fn next(&mut self) -> Option<Self::Item> {
    if self.cursor >= self.order.len() { return None }
    let end = (self.cursor + self.batch_size).min(self.order.len());
    let indices = &self.order[self.cursor..end];
    self.cursor = end;

    let mut images = Vec::with_capacity(indices.len() * WIDTH * HEIGHT);
    let mut labels = Vec::with_capacity(indices.len());
    for &index in indices {
      let sample = self.dataset.get(index)
        .unwrap_or_else(|| panic!("Dataset has no sample {index}") );
      images.extend(sample.image.iter().flatten());
      labels.push(sample.label as usize);
    }

    Some(Batch {
      images: Tensor::new(&[labels.len(), 1, HEIGHT, WIDTH], images),
      labels,
    })
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    let remaining = (self.order.len() - self.cursor + self.batch_size - 1) / self.batch_size;
    (remaining, Some(remaining))
  }
}

impl<D: Dataset<Sample>> ExactSizeIterator for BatchIter<'_, D> {}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::{ dataset::InMemDataset, internal::make_rng };

  // Samples whose first pixel records their index
  fn numbered(count: usize) -> InMemDataset<Sample> {
    InMemDataset::new((0..count).map(|i| {
      let mut image = [[0.0; WIDTH]; HEIGHT];
      image[0][0] = i as f32;
      Sample { image, label: (i % 10) as u8 }
    }).collect())
  }

  fn indices(batch: &Batch) -> Vec<usize> {
    batch.images.raw()
      .chunks(WIDTH * HEIGHT)
      .map(|image| image[0] as usize )
      .collect()
  }

  fn epoch<D: Dataset<Sample>>(loader: &mut BatchLoader<D>) -> Vec<usize> {
    loader.iter().flat_map(|batch| indices(&batch) ).collect()
  }

  #[test]
  fn shapes() {
    let mut loader = BatchLoader::new(numbered(250), 100, false, make_rng(Some(0)));
    assert_eq!(loader.num_batches(), 3);
    let batches: Vec<_> = loader.iter().collect();
    assert_eq!(batches.len(), 3);
    assert_eq!(batches[0].images.dims(), &[100, 1, 28, 28]);
    assert_eq!(batches[2].images.dims(), &[50, 1, 28, 28]);
    assert_eq!(batches[2].labels.len(), 50);
    assert_eq!(batches[1].labels[3], 3);
  }

  #[test]
  fn sequential_order() {
    let mut loader = BatchLoader::new(numbered(30), 7, false, make_rng(Some(0)));
    assert_eq!(epoch(&mut loader), (0..30).collect::<Vec<_>>());
    assert_eq!(epoch(&mut loader), (0..30).collect::<Vec<_>>());
  }

  #[test]
  fn every_sample_once_per_epoch() {
    let mut loader = BatchLoader::new(numbered(250), 100, true, make_rng(Some(5)));
    for _ in 0..3 {
      let mut seen = epoch(&mut loader);
      seen.sort_unstable();
      assert_eq!(seen, (0..250).collect::<Vec<_>>());
    }
  }

  #[test]
  fn reshuffles_between_epochs() {
    let mut loader = BatchLoader::new(numbered(100), 10, true, make_rng(Some(5)));
    let first = epoch(&mut loader);
    let second = epoch(&mut loader);
    assert_ne!(first, (0..100).collect::<Vec<_>>());
    assert_ne!(first, second);
  }

  #[test]
  fn empty_dataset() {
    let mut loader = BatchLoader::new(numbered(0), 100, true, make_rng(Some(5)));
    assert_eq!(loader.num_batches(), 0);
    assert!(loader.iter().next().is_none());
  }
}
