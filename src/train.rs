use log::{ debug, warn };

use crate::{
  model::Mlp,
  ops::RealOps,
  optimize::{ Optimizer, Adam },
  dataset::{ Batch, BatchLoader, Dataset, Sample },
};


/// Fits an [Mlp] to batches of samples using [Adam] and
/// cross-entropy on the model's log-probabilities.

#[derive(Debug)]
pub struct Trainer {
  model: Mlp,
  optimizer: Optimizer<f32, Adam<f32>>,
}

impl Trainer {
  pub fn new(model: Mlp, learning_rate: f32) -> Self {
    let optimizer = Optimizer::new(model.parameters(), learning_rate, Adam::default());
    Self { model, optimizer }
  }

  pub fn model(&self) -> &Mlp {
    &self.model
  }

  pub fn into_model(self) -> Mlp {
    self.model
  }

  /// Run `num_epochs` epochs, printing each epoch's average
  /// loss, and return those averages.

  pub fn fit<D: Dataset<Sample>>(&mut self, loader: &mut BatchLoader<D>, num_epochs: usize) -> Vec<f32> {
    (1..=num_epochs).map(|epoch| {
      let loss = self.train_epoch(loader);
      println!("Epoch [{epoch}/{num_epochs}], Loss: {loss:.4}");
      loss
    }).collect()
  }

  /// One pass over the loader. Returns the mean of all batch losses.

  pub fn train_epoch<D: Dataset<Sample>>(&mut self, loader: &mut BatchLoader<D>) -> f32 {
    let num_batches = loader.num_batches();
    let mut total = 0.0;
    let mut count = 0;
    for batch in loader.iter() {
      total += self.train_step(&batch);
      count += 1;
      if count % 100 == 0 {
        debug!("Batch {count}/{num_batches}, running loss {:.4}", total / count as f32);
      }
    }
    if count == 0 {
      warn!("Training loader yielded no batches");
      return 0.0
    }
    total / count as f32
  }

  /// Clear gradients, forward, backward and update the parameters once.
  /// Returns the loss before the update.

  pub fn train_step(&mut self, batch: &Batch) -> f32 {
    self.optimizer.zero_grad();
    let output = self.model.forward(&batch.images.tracked());
    let loss = output.nll(&batch.labels);
    loss.backward();
    self.optimizer.step();
    loss.item()
  }
}

/// Loss of `model` on a single batch, without tracking gradients.

pub fn batch_loss(model: &Mlp, batch: &Batch) -> f32 {
  model.infer(&batch.images).nll(&batch.labels).item()
}

/// Mean batch loss over a whole loader, leaving the model untouched.

pub fn dataset_loss<D: Dataset<Sample>>(model: &Mlp, loader: &mut BatchLoader<D>) -> f32 {
  let losses: Vec<f32> = loader.iter().map(|batch| batch_loss(model, &batch) ).collect();
  if losses.is_empty() { return 0.0 }
  losses.iter().sum::<f32>() / losses.len() as f32
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::{ dataset::synthetic, internal::make_rng };

  #[test]
  fn step_decreases_batch_loss() {
    let mut loader = BatchLoader::new(synthetic(100, 1), 100, false, make_rng(Some(0)));
    let batch = loader.iter().next().unwrap();
    let mut trainer = Trainer::new(Mlp::new(&mut make_rng(Some(2))), 0.001);
    let before = batch_loss(trainer.model(), &batch);
    let reported = trainer.train_step(&batch);
    assert!((reported - before).abs() < 1e-4);
    assert!(batch_loss(trainer.model(), &batch) < before);
  }

  #[test]
  fn one_epoch_lowers_loss() {
    let mut loader = BatchLoader::new(synthetic(500, 3), 100, true, make_rng(Some(4)));
    let mut trainer = Trainer::new(Mlp::new(&mut make_rng(Some(5))), 0.001);
    let before = dataset_loss(trainer.model(), &mut loader);
    let losses = trainer.fit(&mut loader, 1);
    assert_eq!(losses.len(), 1);
    assert!(losses[0].is_finite());
    assert!(losses[0] < before);
    assert!(dataset_loss(trainer.model(), &mut loader) < before);
  }

  #[test]
  fn empty_loader_reports_zero() {
    let mut loader = BatchLoader::new(synthetic(0, 1), 100, true, make_rng(Some(0)));
    let mut trainer = Trainer::new(Mlp::new(&mut make_rng(Some(2))), 0.001);
    assert_eq!(trainer.train_epoch(&mut loader), 0.0);
    assert_eq!(dataset_loss(trainer.model(), &mut loader), 0.0);
  }
}
