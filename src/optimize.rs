use std::collections::HashMap;

use crate::{
  scalar::Real,
  tensor::Tensor,
  variable::Variable,
};


/// An optimization strategy to be used with [Optimizer].
///
/// Strategies get called once per parameter and step and return
/// the change to be added to that parameter.

pub trait Strategy<R: Real> {
  fn update(&mut self, id: usize, grad: &Tensor<R>, rate: R, step: usize) -> Tensor<R>;
}


/// Generic optimizer that applies an optimization [Strategy]
/// to a fixed list of trainable parameters.

#[derive(Debug)]
pub struct Optimizer<R: Real, S: Strategy<R>> {
  params: Vec<Variable<R>>,
  strategy: S,
  pub learning_rate: R,
  step: usize,
}

impl<R: Real, S: Strategy<R>> Optimizer<R, S> {
  pub fn new(params: Vec<Variable<R>>, learning_rate: R, strategy: S) -> Self {
    for param in &params {
      assert!(param.is_trainable(), "Only trainable variables can be optimized, got {param}");
    }
    Self { params, strategy, learning_rate, step: 1 }
  }

  pub fn parameters(&self) -> &[Variable<R>] {
    &self.params
  }

  /// Number of steps taken so far.

  pub fn steps(&self) -> usize {
    self.step - 1
  }

  pub fn zero_grad(&self) {
    for param in &self.params {
      if let Some(grad) = param.grad() {
        grad.refill(R::zero());
      }
    }
  }

  /// Update all parameters in place from their accumulated gradients.

  pub fn step(&mut self) {
    for param in &self.params {
      let Some(grad) = param.grad() else { continue };
      let change = self.strategy.update(param.id(), grad, self.learning_rate, self.step);
      let weights = param.tensor();
      weights.assign(&(weights + &change));
    }
    self.step += 1;
  }
}


/// Stochastic Gradient Descent strategy

#[derive(Debug, Clone, Default)]
pub struct Sgd;

impl<R: Real> Strategy<R> for Sgd {
  fn update(&mut self, _id: usize, grad: &Tensor<R>, rate: R, _step: usize) -> Tensor<R> {
    grad * -rate
  }
}


/// Adaptive Moment Estimation strategy (Adam)

#[derive(Debug, Clone)]
pub struct Adam<R: Real> {
  pub beta1: R,
  pub beta2: R,
  pub epsilon: R,
  m: HashMap<usize, Tensor<R>>,
  v: HashMap<usize, Tensor<R>>,
}

impl<R: Real> Adam<R> {
  pub fn new(beta1: R, beta2: R, epsilon: R) -> Self {
    Self {
      beta1,
      beta2,
      epsilon,
      m: HashMap::new(),
      v: HashMap::new(),
    }
  }
}

impl<R: Real> Default for Adam<R> {
  fn default() -> Self {
    Self::new(R::from(0.9).unwrap(), R::from(0.999).unwrap(), R::from(1e-8).unwrap())
  }
}

impl<R: Real> Strategy<R> for Adam<R> {
  fn update(&mut self, id: usize, grad: &Tensor<R>, rate: R, step: usize) -> Tensor<R> {
    let m = self.m.entry(id).or_insert_with(|| Tensor::zeros(grad.dims()) );
    m.assign(&(&*m * self.beta1 + grad * (R::one() - self.beta1)));
    let v = self.v.entry(id).or_insert_with(|| Tensor::zeros(grad.dims()) );
    v.assign(&(&*v * self.beta2 + grad.vectorize(|g| g * g ) * (R::one() - self.beta2)));

    let step = R::from(step).unwrap();
    let mt = &self.m[&id] / (R::one() - self.beta1.powf(step));
    let vt = &self.v[&id] / (R::one() - self.beta2.powf(step));
    mt * -rate / (vt.sqrt() + self.epsilon)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::ops::*;

  #[test]
  fn sgd() {
    let w = Tensor::vec(&[1.0f32, -1.0]).trained();
    let mut optimizer = Optimizer::new(vec![w.clone()], 0.5, Sgd);
    (&w * &w).backward();
    optimizer.step();
    assert_eq!(w.tensor(), &Tensor::vec(&[0.0, 0.0]));
    assert_eq!(optimizer.steps(), 1);
  }

  #[test]
  fn adam_first_step_moves_by_learning_rate() {
    let w = Tensor::vec(&[0.5f64, -2.0, 3.0]).trained();
    let before = w.detach();
    let mut optimizer = Optimizer::new(vec![w.clone()], 0.001, Adam::default());
    (&w * &w).backward();
    optimizer.step();
    let moved = (w.tensor() - &before).to_vec();
    for (delta, start) in moved.iter().zip(before.values()) {
      assert!((delta.abs() - 0.001).abs() < 1e-6);
      assert!(delta.signum() == -start.signum());
    }
  }

  #[test]
  fn zero_grad_clears_parameters() {
    let w = Tensor::vec(&[1.0f32, 2.0]).trained();
    let optimizer = Optimizer::new(vec![w.clone()], 0.1, Sgd);
    (&w * &w).backward();
    assert_eq!(w.grad(), Some(&Tensor::vec(&[2.0, 4.0])));
    optimizer.zero_grad();
    assert_eq!(w.grad(), Some(&Tensor::vec(&[0.0, 0.0])));
  }

  #[test]
  fn parameters_update_in_place() {
    let w = Tensor::<f32>::ones(&[2,2]).trained();
    let x = Tensor::<f32>::ones(&[1,2]).tracked();
    let mut optimizer = Optimizer::new(w.parameters(), 0.1, Sgd);
    x.mm(&w).backward();
    optimizer.step();
    // The handle held outside the optimizer sees the update
    assert!(w.tensor().approx_eq(&Tensor::fill(&[2,2], 0.9), 1e-6));
  }

  #[test]
  #[should_panic(expected = "Only trainable")]
  fn rejects_constants() {
    Optimizer::new(vec![Tensor::<f32>::zeros(&[1]).tracked()], 0.1, Sgd);
  }
}
