use crate::{
  shape::Shape,
  tensor::Tensor,
  variable::{ Variable, BinaryOp, UnaryOp },
  scalar::Real,
  ops::{ BaseOps, RealOps },
};


impl<T: Real> BaseOps<T> for Variable<T> {
  fn shape(&self) -> &Shape {
    self.tensor().shape()
  }

  fn reshape(&self, dims: &[usize]) -> Self {
    self.unary_op(Reshape { dims: dims.to_vec() })
  }

  fn from_param(param: &Variable<T>) -> Self {
    param.clone()
  }
}

impl<T: Real> RealOps<T> for Variable<T> {
  fn mm(&self, rhs: &Self) -> Self {
    self.binary_op(MatMul, rhs)
  }

  fn relu(&self) -> Self {
    self.unary_op(ReLU)
  }

  fn log_softmax(&self, dim: isize) -> Self {
    self.unary_op(LogSoftmax { dim })
  }

  fn nll(&self, targets: &[usize]) -> Self {
    self.unary_op(Nll { targets: targets.to_vec() })
  }
}

macro_rules! add_operator {
  ($op:ident, $meth:ident, $symbol:tt) => {
    impl<T: Real> std::ops::$op for &Variable<T> { // &var * &other
      type Output = Variable<T>;

      fn $meth(self, rhs: Self) -> Variable<T> {
        self.binary_op($op, rhs)
      }
    }

    impl<T: Real> std::ops::$op for Variable<T> { // var * other
      type Output = Variable<T>;

      fn $meth(self, rhs: Self) -> Variable<T> {
        &self $symbol &rhs
      }
    }

    impl<T: Real> std::ops::$op<Variable<T>> for &Variable<T> { // &var * other
      type Output = Variable<T>;

      fn $meth(self, rhs: Variable<T>) -> Variable<T> {
        self $symbol &rhs
      }
    }

    impl<T: Real> std::ops::$op<&Variable<T>> for Variable<T> { // var * &other
      type Output = Variable<T>;

      fn $meth(self, rhs: &Variable<T>) -> Variable<T> {
        &self $symbol rhs
      }
    }
  };
}

add_operator!(Add, add, +);
add_operator!(Sub, sub, -);
add_operator!(Mul, mul, *);


// Elementwise ops broadcast their operands in the forward pass,
// so gradients get summed back down to each operand's shape.

#[derive(Debug, Clone)]
pub struct Add;

impl<T: Real> BinaryOp<T> for Add {
  fn run(&self, lhs: &Tensor<T>, rhs: &Tensor<T>) -> Tensor<T> {
    lhs + rhs
  }

  fn derive(&self, lhs: &Tensor<T>, rhs: &Tensor<T>, grad: &Tensor<T>) -> (Tensor<T>, Tensor<T>) {
    (grad.sum_to(lhs.dims()), grad.sum_to(rhs.dims()))
  }
}


#[derive(Debug, Clone)]
pub struct Sub;

impl<T: Real> BinaryOp<T> for Sub {
  fn run(&self, lhs: &Tensor<T>, rhs: &Tensor<T>) -> Tensor<T> {
    lhs - rhs
  }

  fn derive(&self, lhs: &Tensor<T>, rhs: &Tensor<T>, grad: &Tensor<T>) -> (Tensor<T>, Tensor<T>) {
    (grad.sum_to(lhs.dims()), (-grad).sum_to(rhs.dims()))
  }
}


#[derive(Debug, Clone)]
pub struct Mul;

impl<T: Real> BinaryOp<T> for Mul {
  fn run(&self, lhs: &Tensor<T>, rhs: &Tensor<T>) -> Tensor<T> {
    lhs * rhs
  }

  fn derive(&self, lhs: &Tensor<T>, rhs: &Tensor<T>, grad: &Tensor<T>) -> (Tensor<T>, Tensor<T>) {
    ((grad * rhs).sum_to(lhs.dims()), (grad * lhs).sum_to(rhs.dims()))
  }
}


#[derive(Debug, Clone)]
pub struct MatMul;

impl<T: Real> BinaryOp<T> for MatMul {
  fn run(&self, lhs: &Tensor<T>, rhs: &Tensor<T>) -> Tensor<T> {
    lhs.mm(rhs)
  }

  fn derive(&self, lhs: &Tensor<T>, rhs: &Tensor<T>, grad: &Tensor<T>) -> (Tensor<T>, Tensor<T>) {
    let grad_l = grad.mm(&rhs.transpose(0, 1));
    let grad_r = lhs.transpose(0, 1).mm(grad);
    (grad_l, grad_r)
  }
}


#[derive(Debug, Clone)]
pub struct Reshape {
  dims: Vec<usize>,
}

impl<T: Real> UnaryOp<T> for Reshape {
  fn run(&self, lhs: &Tensor<T>) -> Tensor<T> {
    lhs.reshape(&self.dims)
  }

  fn derive(&self, lhs: &Tensor<T>, _out: &Tensor<T>, grad: &Tensor<T>) -> Tensor<T> {
    grad.reshape(lhs.dims())
  }
}


#[derive(Debug, Clone)]
pub struct ReLU;

impl<T: Real> UnaryOp<T> for ReLU {
  fn run(&self, lhs: &Tensor<T>) -> Tensor<T> {
    lhs.relu()
  }

  fn derive(&self, lhs: &Tensor<T>, _out: &Tensor<T>, grad: &Tensor<T>) -> Tensor<T> {
    lhs.zip(grad, |x, g| if x > T::zero() { g } else { T::zero() } )
  }
}


#[derive(Debug, Clone)]
pub struct LogSoftmax {
  dim: isize,
}

impl<T: Real> UnaryOp<T> for LogSoftmax {
  fn run(&self, lhs: &Tensor<T>) -> Tensor<T> {
    lhs.log_softmax(self.dim)
  }

  // dx = g - softmax(x) * sum(g)
  fn derive(&self, _lhs: &Tensor<T>, out: &Tensor<T>, grad: &Tensor<T>) -> Tensor<T> {
    let mut keep = grad.dims().to_vec();
    if let Some(last) = keep.last_mut() { *last = 1 }
    let totals = Tensor::new(&keep, grad.lanes(-1, |lane| lane.iter().copied().sum() ));
    grad - &(&out.exp() * &totals)
  }
}


#[derive(Debug, Clone)]
pub struct Nll {
  targets: Vec<usize>,
}

impl<T: Real> UnaryOp<T> for Nll {
  fn run(&self, lhs: &Tensor<T>) -> Tensor<T> {
    lhs.nll(&self.targets)
  }

  fn derive(&self, lhs: &Tensor<T>, _out: &Tensor<T>, grad: &Tensor<T>) -> Tensor<T> {
    let classes = lhs.dims()[1];
    let rows = T::from(self.targets.len().max(1)).unwrap();
    let change = -grad.item() / rows;
    let mut data = vec![T::zero(); lhs.size()];
    for (i, &target) in self.targets.iter().enumerate() {
      data[i * classes + target] = change;
    }
    Tensor::new(lhs.dims(), data)
  }
}
