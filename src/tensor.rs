use std::rc::Rc;
use std::cell::{ Ref, RefMut, RefCell };
use std::fmt::Debug;

use rand::Rng;

mod lops;

use crate::{
  shape::{ Shape, ShapeIterator },
  variable::Variable,
  scalar::Real,
};


/// Multidimensional array of [Real] values.
///
/// Cloning a tensor is cheap: clones share their storage, so writing
/// through one handle with [assign](Tensor::assign) is visible in all
/// others. Use [detach](Tensor::detach) to get an independent copy.
///
/// Tensors can be wrapped in a [Variable] by calling
/// [tracked](Tensor::tracked) or [trained](Tensor::trained).

#[derive(Debug, Clone)]
pub struct Tensor<T: Real> {
  shape: Shape,
  data: Rc<RefCell<Vec<T>>>,
}

impl<T: Real> PartialEq for Tensor<T> {
  fn eq(&self, rhs: &Self) -> bool {
    self.shape.dims == rhs.shape.dims
      && self.values().zip(rhs.values()).all(|(a, b)| a == b )
  }
}

impl<T: Real> Tensor<T> {
  pub fn from_shape(shape: Shape, data: Vec<T>) -> Self {
    assert_eq!(shape.size(), data.len(),
      "{} doesn't match data length {}", shape, data.len());
    Self { shape, data: Rc::new(RefCell::new(data)) }
  }

  pub fn new(dims: &[usize], data: Vec<T>) -> Self {
    Self::from_shape(Shape::new(dims), data)
  }

  pub fn vec(vec: &[T]) -> Self {
    Self::new(&[vec.len()], vec.to_vec())
  }

  pub fn scalar(item: T) -> Self {
    Self::new(&[], vec![item])
  }

  pub fn fill(dims: &[usize], filler: T) -> Self {
    Self::new(dims, vec![filler; dims.iter().product()])
  }

  pub fn zeros(dims: &[usize]) -> Self {
    Self::fill(dims, T::zero())
  }

  pub fn ones(dims: &[usize]) -> Self {
    Self::fill(dims, T::one())
  }

  pub fn arrange(dims: &[usize], start: T, step: T) -> Self {
    Self::new(dims, (0..dims.iter().product::<usize>())
      .map(|i| T::from(i).unwrap() * step + start )
      .collect())
  }

  /// Values drawn uniformly from `[low, high)`.

  pub fn uniform<R: Rng>(dims: &[usize], low: T, high: T, rng: &mut R) -> Self {
    Self::new(dims, (0..dims.iter().product::<usize>())
      .map(|_| rng.gen_range(low, high) )
      .collect())
  }

  pub fn dims(&self) -> &[usize] {
    &self.shape.dims
  }

  pub fn size(&self) -> usize {
    self.shape.size()
  }

  pub fn rank(&self) -> usize {
    self.shape.rank()
  }

  pub fn raw(&self) -> Ref<Vec<T>> {
    self.data.borrow()
  }

  pub fn raw_mut(&self) -> RefMut<Vec<T>> {
    self.data.borrow_mut()
  }

  pub fn shared_with(&self, other: &Self) -> bool {
    Rc::ptr_eq(&self.data, &other.data)
  }

  /// Values in row-major order of this tensor's dimensions.

  pub fn values(&self) -> TensorIterator<T> {
    TensorIterator::new(self)
  }

  pub fn to_vec(&self) -> Vec<T> {
    self.values().collect()
  }

  pub fn item(&self) -> T {
    assert!(self.size() == 1, "Can't extract item from non-scalar {}", self.shape);
    self.values().next().unwrap()
  }

  pub fn detach(&self) -> Self {
    Self::new(&self.shape.dims, self.to_vec())
  }

  pub fn contiguous(&self) -> Self {
    if self.shape.contiguous() {
      self.clone()
    } else {
      self.detach()
    }
  }

  pub fn view(&self, dims: &[usize]) -> Self {
    Self { shape: self.shape.view(dims), data: self.data.clone() }
  }

  pub fn transpose(&self, dim1: isize, dim2: isize) -> Self {
    Self { shape: self.shape.transpose(dim1, dim2), data: self.data.clone() }
  }

  pub fn broadcast_to(&self, dims: &[usize]) -> Self {
    Self { shape: self.shape.broadcast_to(dims), data: self.data.clone() }
  }

  /// Overwrite this tensor's values in place. `other` gets broadcasted
  /// to this tensor's shape.

  pub fn assign(&self, other: &Self) {
    // Avoid clashing borrows when both tensors share storage
    let other = if self.shared_with(other) { other.detach() } else { other.clone() };
    let source = other.broadcast_to(&self.shape.dims);
    let mut data = self.data.borrow_mut();
    for (i, value) in self.shape.iter().zip(source.values()) {
      data[i] = value;
    }
  }

  pub fn refill(&self, filler: T) {
    let mut data = self.data.borrow_mut();
    for i in self.shape.iter() {
      data[i] = filler;
    }
  }

  pub fn vectorize<F>(&self, cb: F) -> Self
  where
    F: FnMut(T) -> T,
  {
    Self::new(&self.shape.dims, self.values().map(cb).collect())
  }

  /// Combine two tensors elementwise, broadcasting them to a common shape.

  pub fn zip<F>(&self, rhs: &Self, cb: F) -> Self
  where
    F: Fn(T, T) -> T,
  {
    let dims = self.shape.broadcast(&rhs.shape);
    let lhs = self.broadcast_to(&dims);
    let rhs = rhs.broadcast_to(&dims);
    let data = lhs.values()
      .zip(rhs.values())
      .map(|(a, b)| cb(a, b) )
      .collect();
    Self::new(&dims, data)
  }

  /// Run `cb` over every lane along `dim`, in row-major
  /// order of the remaining dimensions.

  pub fn lanes<O, F>(&self, dim: isize, mut cb: F) -> Vec<O>
  where
    F: FnMut(&[T]) -> O,
  {
    let lane = self.shape[dim];
    if lane == 0 {
      return (0..self.shape.without(dim).iter().product()).map(|_| cb(&[]) ).collect();
    }
    let moved = Self { shape: self.shape.move_to_end(dim), data: self.data.clone() };
    moved.to_vec().chunks(lane).map(|chunk| cb(chunk) ).collect()
  }

  /// Reduce dimension `dim` away using `cb`.

  pub fn collapse<F>(&self, dim: isize, cb: F) -> Self
  where
    F: FnMut(&[T]) -> T,
  {
    let dims = self.shape.without(dim);
    Self::new(&dims, self.lanes(dim, cb))
  }

  pub fn sum(&self, dim: isize) -> Self {
    self.collapse(dim, |lane| lane.iter().copied().sum() )
  }

  pub fn max(&self, dim: isize) -> Self {
    self.collapse(dim, |lane| lane.iter().copied().fold(T::neg_infinity(), T::max) )
  }

  pub fn sum_all(&self) -> T {
    self.values().sum()
  }

  pub fn mean_all(&self) -> T {
    self.sum_all() / T::from(self.size()).unwrap()
  }

  /// Index of the greatest value along `dim`. Ties go to the first index.

  pub fn argmax(&self, dim: isize) -> Vec<usize> {
    self.lanes(dim, |lane| {
      let mut index = 0;
      for (i, &value) in lane.iter().enumerate() {
        if value > lane[index] { index = i }
      }
      index
    })
  }

  /// Sum over all dimensions that broadcasting `dims` up
  /// to this tensor's shape would have expanded.

  pub fn sum_to(&self, dims: &[usize]) -> Self {
    if self.shape.dims == dims { return self.clone() }
    let mut data = vec![T::zero(); dims.iter().product()];
    let target = Shape::new(dims).broadcast_to(&self.shape.dims);
    for (i, value) in target.iter().zip(self.values()) {
      data[i] += value;
    }
    Self::new(dims, data)
  }

  pub fn exp(&self) -> Self {
    self.vectorize(|a| a.exp() )
  }

  pub fn log(&self) -> Self {
    self.vectorize(|a| a.ln() )
  }

  pub fn sqrt(&self) -> Self {
    self.vectorize(|a| a.sqrt() )
  }

  pub fn approx_eq(&self, rhs: &Self, tolerance: T) -> bool {
    self.shape.dims == rhs.shape.dims
      && self.values().zip(rhs.values()).all(|(a, b)| (a - b).abs() <= tolerance )
  }

  pub fn trained(&self) -> Variable<T> {
    Variable::from_tensor(self.clone(), true)
  }

  pub fn tracked(&self) -> Variable<T> {
    Variable::from_tensor(self.clone(), false)
  }
}

impl<T: Real> std::fmt::Display for Tensor<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "Tensor{:?} ", self.shape.dims)?;
    print_chunks(0, &self.shape.dims, &self.to_vec(), f)
  }
}

fn print_chunks<T: Debug>(idx: usize, dims: &[usize], vec: &[T], f: &mut std::fmt::Formatter) -> std::fmt::Result {
  let indent = " ".repeat(idx * 2);
  if dims.is_empty() {
    write!(f, "{indent}{:?}", vec[0])?;
  } else if idx == dims.len() - 1 || vec.is_empty() {
    writeln!(f, "{indent}{:?}", vec)?;
  } else {
    writeln!(f, "{indent}[")?;
    for chunk in vec.chunks(vec.len() / dims[idx]) {
      print_chunks(idx + 1, dims, chunk, f)?;
    }
    writeln!(f, "{indent}]")?;
  }
  Ok(())
}


pub struct TensorIterator<'a, T: Real> {
  data: Ref<'a, Vec<T>>,
  offsets: ShapeIterator,
}

impl<'a, T: Real> TensorIterator<'a, T> {
  fn new(tensor: &'a Tensor<T>) -> Self {
    Self {
      data: tensor.data.borrow(),
      offsets: tensor.shape.iter(),
    }
  }
}

impl<T: Real> Iterator for TensorIterator<'_, T> {
  type Item = T;

  fn next(&mut self) -> Option<Self::Item> {
    self.offsets.next().map(|i| self.data[i] )
  }
}
