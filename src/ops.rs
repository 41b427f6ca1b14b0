use crate::{
  shape::Shape,
  scalar::Real,
  variable::Variable,
};


/// Shape related operations, implemented for both [Tensor](crate::Tensor)
/// and [Variable].

pub trait BaseOps<T: Real>: Clone + Sized {
  fn shape(&self) -> &Shape;

  /// Reshape into new dimensions. A single `0` is a placeholder for
  /// whatever size remains.
  fn reshape(&self, dims: &[usize]) -> Self;

  /// Use a trainable parameter as an operand. Tensors take its current
  /// value without recording anything, Variables join its graph.
  fn from_param(param: &Variable<T>) -> Self;

  /// Collapse all but the leading dimension, in row-major order.
  fn flatten(&self) -> Self {
    let dims = &self.shape().dims;
    let batch = dims.first().copied().unwrap_or(1);
    let rest = dims.iter().skip(1).product();
    self.reshape(&[batch, rest])
  }
}


/// Differentiable operations. On a [Tensor](crate::Tensor) these just compute
/// their result, on a [Variable] they also record how to backpropagate it.

pub trait RealOps<T: Real>: BaseOps<T> {
  /// Multiply two matrices.
  fn mm(&self, rhs: &Self) -> Self;

  fn relu(&self) -> Self;

  /// Logarithm of the softmax along `dim`. Only the last dimension is supported.
  fn log_softmax(&self, dim: isize) -> Self;

  /// Mean negative log-likelihood of `targets`, given a `[N, C]`
  /// matrix of log-probabilities.
  fn nll(&self, targets: &[usize]) -> Self;
}
