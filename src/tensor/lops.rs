use crate::{
  internal::*,
  shape::Shape,
  tensor::Tensor,
  scalar::Real,
  variable::Variable,
  ops::{ BaseOps, RealOps },
};


impl<T: Real> BaseOps<T> for Tensor<T> {
  fn shape(&self) -> &Shape {
    &self.shape
  }

  fn reshape(&self, dims: &[usize]) -> Self {
    self.contiguous().view(dims)
  }

  fn from_param(param: &Variable<T>) -> Self {
    param.tensor().clone()
  }
}

impl<T: Real> RealOps<T> for Tensor<T> {
  fn mm(&self, rhs: &Self) -> Self {
    assert!(self.rank() == 2 && rhs.rank() == 2,
      "Can only multiply matrices, got {} & {}", self.shape, rhs.shape);
    let (rows, inner) = (self.shape.dims[0], self.shape.dims[1]);
    let cols = rhs.shape.dims[1];
    assert_eq!(inner, rhs.shape.dims[0],
      "Cannot multiply {} by {}", self.shape, rhs.shape);

    let mut data = vec![T::zero(); rows * cols];
    {
      let lhs_raw = self.raw();
      let rhs_raw = rhs.raw();
      T::gemm(
        [rows, inner, cols],
        &lhs_raw, [self.shape.strides[0], self.shape.strides[1]],
        &rhs_raw, [rhs.shape.strides[0], rhs.shape.strides[1]],
        &mut data,
      );
    }
    Self::new(&[rows, cols], data)
  }

  fn relu(&self) -> Self {
    self.vectorize(|a| a.max(T::zero()) )
  }

  fn log_softmax(&self, dim: isize) -> Self {
    assert!(self.rank() > 0, "Cannot take log-softmax of a scalar");
    assert_eq!(negative_index(dim, self.rank()), self.rank() - 1,
      "Log-softmax is only supported along the last dimension");
    let data = self.lanes(-1, |lane| {
      // Shift by the maximum for numerical stability
      let max = lane.iter().copied().fold(T::neg_infinity(), T::max);
      let sum: T = lane.iter().map(|&a| (a - max).exp() ).sum();
      let normalizer = max + sum.ln();
      lane.iter().map(|&a| a - normalizer ).collect::<Vec<_>>()
    }).concat();
    Self::new(&self.shape.dims, data)
  }

  fn nll(&self, targets: &[usize]) -> Self {
    assert_eq!(self.rank(), 2, "Expected [N, C] log-probabilities, got {}", self.shape);
    let (rows, classes) = (self.shape.dims[0], self.shape.dims[1]);
    assert_eq!(rows, targets.len(), "{} rows but {} targets", rows, targets.len());
    let picked: T = self.lanes(-1, |lane| lane.to_vec())
      .iter()
      .zip(targets)
      .map(|(row, &target)| {
        assert!(target < classes, "Target {target} out of range for {classes} classes");
        row[target]
      })
      .sum();
    Self::scalar(-picked / T::from(rows.max(1)).unwrap())
  }
}

impl<T: Real> std::ops::Neg for &Tensor<T> {
  type Output = Tensor<T>;

  fn neg(self) -> Self::Output {
    self.vectorize(|a| -a )
  }
}

impl<T: Real> std::ops::Neg for Tensor<T> {
  type Output = Tensor<T>;

  fn neg(self) -> Self::Output {
    -&self
  }
}

macro_rules! add_operator {
  ($trait:ident, $meth:ident, $symbol:tt) => {
    impl<T: Real> std::ops::$trait for &Tensor<T> { // &tensor * &other
      type Output = Tensor<T>;

      fn $meth(self, rhs: Self) -> Tensor<T> {
        self.zip(rhs, |a, b| a $symbol b )
      }
    }

    impl<T: Real> std::ops::$trait for Tensor<T> { // tensor * other
      type Output = Tensor<T>;

      fn $meth(self, rhs: Self) -> Tensor<T> {
        &self $symbol &rhs
      }
    }

    impl<T: Real> std::ops::$trait<Tensor<T>> for &Tensor<T> { // &tensor * other
      type Output = Tensor<T>;

      fn $meth(self, rhs: Tensor<T>) -> Tensor<T> {
        self $symbol &rhs
      }
    }

    impl<T: Real> std::ops::$trait<&Tensor<T>> for Tensor<T> { // tensor * &other
      type Output = Tensor<T>;

      fn $meth(self, rhs: &Tensor<T>) -> Tensor<T> {
        &self $symbol rhs
      }
    }

    impl<T: Real> std::ops::$trait<T> for &Tensor<T> { // &tensor * T
      type Output = Tensor<T>;

      fn $meth(self, rhs: T) -> Tensor<T> {
        self.vectorize(|a| a $symbol rhs )
      }
    }

    impl<T: Real> std::ops::$trait<T> for Tensor<T> { // tensor * T
      type Output = Tensor<T>;

      fn $meth(self, rhs: T) -> Tensor<T> {
        &self $symbol rhs
      }
    }
  };
}

add_operator!(Add, add, +);
add_operator!(Sub, sub, -);
add_operator!(Mul, mul, *);
add_operator!(Div, div, /);
