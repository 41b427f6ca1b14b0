use std::ops::Add;

use rand::Rng;

use crate::{
  tensor::Tensor,
  variable::Variable,
  scalar::Real,
  ops::{ BaseOps, RealOps },
};


/// Fully connected layer computing `x * W + b`.

#[derive(Debug, Clone)]
pub struct Linear<T: Real> {
  pub weights: Variable<T>,
  pub bias: Variable<T>,
}

impl<T: Real> Linear<T> {
  /// Weights and biases get drawn from `U(-k, k)` with `k = 1 / sqrt(inputs)`.

  pub fn new<R: Rng>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
    let bound = T::one() / T::from(inputs).unwrap().sqrt();
    Self {
      weights: Tensor::uniform(&[inputs, outputs], -bound, bound, rng).trained(),
      bias: Tensor::uniform(&[outputs], -bound, bound, rng).trained(),
    }
  }

  pub fn inputs(&self) -> usize {
    self.weights.dims()[0]
  }

  pub fn outputs(&self) -> usize {
    self.weights.dims()[1]
  }

  pub fn num_params(&self) -> usize {
    self.weights.size() + self.bias.size()
  }

  pub fn parameters(&self) -> [Variable<T>; 2] {
    [self.weights.clone(), self.bias.clone()]
  }

  pub fn run<O>(&self, input: &O) -> O
  where
    O: RealOps<T>,
    for<'a> &'a O: Add<&'a O, Output = O>,
  {
    &input.mm(&O::from_param(&self.weights)) + &O::from_param(&self.bias)
  }
}


/// Three layer perceptron classifying flattened 28x28 images into 10 digits.
///
/// The network maps `[N, 1, 28, 28]` images to `[N, 10]` log-probabilities
/// through `784 -> 512 -> ReLU -> 256 -> ReLU -> 10 -> log-softmax`.

#[derive(Debug, Clone)]
pub struct Mlp {
  fc1: Linear<f32>,
  fc2: Linear<f32>,
  fc3: Linear<f32>,
}

impl Mlp {
  pub const INPUTS: usize = 28 * 28;
  pub const CLASSES: usize = 10;

  pub fn new<R: Rng>(rng: &mut R) -> Self {
    Self {
      fc1: Linear::new(Self::INPUTS, 512, rng),
      fc2: Linear::new(512, 256, rng),
      fc3: Linear::new(256, Self::CLASSES, rng),
    }
  }

  /// Forward pass that records the graph for backpropagation.

  pub fn forward(&self, images: &Variable<f32>) -> Variable<f32> {
    self.run(images)
  }

  /// Forward pass on plain tensors, without recording anything.

  pub fn infer(&self, images: &Tensor<f32>) -> Tensor<f32> {
    self.run(images)
  }

  fn run<O>(&self, images: &O) -> O
  where
    O: RealOps<f32>,
    for<'a> &'a O: Add<&'a O, Output = O>,
  {
    let x = images.flatten();
    let x = self.fc1.run(&x).relu();
    let x = self.fc2.run(&x).relu();
    self.fc3.run(&x).log_softmax(-1)
  }

  pub fn layers(&self) -> [&Linear<f32>; 3] {
    [&self.fc1, &self.fc2, &self.fc3]
  }

  pub fn parameters(&self) -> Vec<Variable<f32>> {
    self.layers().iter().flat_map(|layer| layer.parameters() ).collect()
  }

  pub fn num_params(&self) -> usize {
    self.layers().iter().map(|layer| layer.num_params() ).sum()
  }
}

impl std::fmt::Display for Mlp {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    let rule = "-".repeat(48);
    writeln!(f, "{rule}")?;
    writeln!(f, "{:<20}{:<16}{:>12}", "Layer (type)", "Output Shape", "Param #")?;
    writeln!(f, "{}", "=".repeat(48))?;
    let mut index = 1;
    for (i, layer) in self.layers().iter().enumerate() {
      let shape = format!("[-1, {}]", layer.outputs());
      writeln!(f, "{:<20}{:<16}{:>12}", format!("Linear-{index}"), shape, grouped(layer.num_params()))?;
      let activation = if i < 2 { "ReLU" } else { "LogSoftmax" };
      writeln!(f, "{:<20}{:<16}{:>12}", format!("{activation}-{}", index + 1), shape, 0)?;
      index += 2;
    }
    writeln!(f, "{}", "=".repeat(48))?;
    writeln!(f, "Total params: {}", grouped(self.num_params()))?;
    writeln!(f, "Trainable params: {}", grouped(self.num_params()))?;
    write!(f, "{rule}")
  }
}

// 535818 -> 535,818
fn grouped(n: usize) -> String {
  let digits = n.to_string();
  let mut out = String::with_capacity(digits.len() * 4 / 3);
  for (i, digit) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 { out.push(',') }
    out.push(digit);
  }
  out
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::internal::make_rng;

  fn model() -> Mlp {
    Mlp::new(&mut make_rng(Some(1)))
  }

  #[test]
  fn output_is_log_probabilities() {
    let images = Tensor::uniform(&[3, 1, 28, 28], -1.0, 1.0, &mut make_rng(Some(2)));
    let output = model().infer(&images);
    assert_eq!(output.dims(), &[3, 10]);
    for total in output.exp().sum(-1).values() {
      assert!((total - 1.0).abs() < 1e-5);
    }
  }

  #[test]
  fn tracked_and_untracked_agree() {
    let model = model();
    let images = Tensor::uniform(&[2, 1, 28, 28], -1.0, 1.0, &mut make_rng(Some(2)));
    let tracked = model.forward(&images.tracked());
    assert!(tracked.tensor().approx_eq(&model.infer(&images), 1e-6));
    assert_eq!(tracked.parameters().len(), 6);
  }

  #[test]
  fn parameter_count() {
    let model = model();
    assert_eq!(model.num_params(), 535_818);
    let dims: Vec<Vec<usize>> = model.parameters().iter().map(|p| p.dims().to_vec() ).collect();
    assert_eq!(dims, vec![
      vec![784, 512], vec![512],
      vec![512, 256], vec![256],
      vec![256, 10], vec![10],
    ]);
  }

  #[test]
  fn initialization_bounds() {
    let layer = Linear::<f32>::new(400, 3, &mut make_rng(Some(4)));
    assert!(layer.weights.values().chain(layer.bias.values()).all(|w| w.abs() <= 0.05 ));
  }

  #[test]
  fn seeded_models_match() {
    let (a, b) = (model(), model());
    for (p, q) in a.parameters().iter().zip(b.parameters()) {
      assert_eq!(p.tensor(), q.tensor());
    }
  }

  #[test]
  fn summary() {
    let summary = model().to_string();
    assert!(summary.contains("Linear-1"));
    assert!(summary.contains("401,920"));
    assert!(summary.contains("LogSoftmax-6"));
    assert!(summary.contains("Total params: 535,818"));
    assert_eq!(grouped(7), "7");
    assert_eq!(grouped(2570), "2,570");
  }
}
