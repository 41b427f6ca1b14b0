use log::debug;

use crate::{
  tensor::Tensor,
  model::Mlp,
  dataset::{ BatchLoader, Dataset, Sample },
};


/// Anything that scores a batch of `[N, 1, 28, 28]` images
/// with one row of class scores per image.

pub trait Classifier {
  fn scores(&self, images: &Tensor<f32>) -> Tensor<f32>;

  /// Index of the highest score of each image.

  fn predict(&self, images: &Tensor<f32>) -> Vec<usize> {
    self.scores(images).argmax(-1)
  }
}

impl Classifier for Mlp {
  fn scores(&self, images: &Tensor<f32>) -> Tensor<f32> {
    self.infer(images)
  }
}


/// Counts of correctly classified samples.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accuracy {
  pub correct: usize,
  pub total: usize,
}

impl Accuracy {
  pub fn record(&mut self, predictions: &[usize], labels: &[usize]) {
    assert_eq!(predictions.len(), labels.len(), "Every prediction needs a label");
    self.correct += predictions.iter().zip(labels).filter(|(p, l)| p == l ).count();
    self.total += labels.len();
  }

  /// Share of correct predictions in percent. Zero when nothing was classified.

  pub fn percent(&self) -> f64 {
    if self.total == 0 { return 0.0 }
    100.0 * self.correct as f64 / self.total as f64
  }
}

impl std::fmt::Display for Accuracy {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "Accuracy: {:.2}%", self.percent())
  }
}


/// Classify every sample of the loader once, without touching any parameters.

pub fn evaluate<C, D>(classifier: &C, loader: &mut BatchLoader<D>) -> Accuracy
where
  C: Classifier,
  D: Dataset<Sample>,
{
  let mut accuracy = Accuracy::default();
  for batch in loader.iter() {
    accuracy.record(&classifier.predict(&batch.images), &batch.labels);
  }
  debug!("{} of {} test samples correct", accuracy.correct, accuracy.total);
  accuracy
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    dataset::{ synthetic, InMemDataset, WIDTH, HEIGHT },
    internal::make_rng,
  };

  // Always votes for the same digit
  struct Constant(usize);

  impl Classifier for Constant {
    fn scores(&self, images: &Tensor<f32>) -> Tensor<f32> {
      let rows = images.dims()[0];
      let mut scores = vec![0.0; rows * 10];
      for row in 0..rows {
        scores[row * 10 + self.0] = 1.0;
      }
      Tensor::new(&[rows, 10], scores)
    }
  }

  fn labelled(labels: &[u8]) -> InMemDataset<Sample> {
    InMemDataset::new(labels.iter().map(|&label| {
      Sample { image: [[0.0; WIDTH]; HEIGHT], label }
    }).collect())
  }

  #[test]
  fn majority_class() {
    let mut loader = BatchLoader::new(labelled(&[7, 7, 7, 1, 7, 2, 7, 7]), 3, false, make_rng(Some(0)));
    let accuracy = evaluate(&Constant(7), &mut loader);
    assert_eq!(accuracy, Accuracy { correct: 6, total: 8 });
    assert_eq!(accuracy.to_string(), "Accuracy: 75.00%");
  }

  #[test]
  fn empty_test_set() {
    let mut loader = BatchLoader::new(labelled(&[]), 100, false, make_rng(Some(0)));
    let accuracy = evaluate(&Constant(0), &mut loader);
    assert_eq!(accuracy.percent(), 0.0);
    assert_eq!(accuracy.to_string(), "Accuracy: 0.00%");
  }

  #[test]
  fn invariant_to_batch_order() {
    let model = Mlp::new(&mut make_rng(Some(1)));
    let mut ordered = BatchLoader::new(synthetic(230, 2), 100, false, make_rng(Some(0)));
    let mut shuffled = BatchLoader::new(synthetic(230, 2), 100, true, make_rng(Some(9)));
    let expected = evaluate(&model, &mut ordered);
    assert_eq!(expected.total, 230);
    assert_eq!(evaluate(&model, &mut shuffled), expected);
  }

  #[test]
  fn leaves_parameters_alone() {
    let model = Mlp::new(&mut make_rng(Some(1)));
    let before: Vec<_> = model.parameters().iter().map(|p| p.detach() ).collect();
    let mut loader = BatchLoader::new(synthetic(50, 2), 20, false, make_rng(Some(0)));
    evaluate(&model, &mut loader);
    for (param, old) in model.parameters().iter().zip(&before) {
      assert_eq!(param.tensor(), old);
      assert!(param.grad().unwrap().values().all(|g| g == 0.0 ));
    }
  }
}
