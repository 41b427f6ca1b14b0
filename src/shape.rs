use crate::internal::*;


/// The shape of a [Tensor](crate::Tensor).
///
/// Besides its dimensions, a shape records the stride of every dimension
/// into the tensor's storage. Views like [transpose](Shape::transpose) and
/// [broadcast_to](Shape::broadcast_to) only rewrite strides.

#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
  pub dims: Vec<usize>,
  pub(crate) strides: Vec<isize>,
}

impl Shape {
  pub fn new(dims: &[usize]) -> Self {
    Self {
      dims: dims.to_vec(),
      strides: Self::make_strides(dims),
    }
  }

  pub fn strided(dims: &[usize], strides: &[isize]) -> Self {
    assert_eq!(dims.len(), strides.len(), "Every dimension needs a stride");
    Self {
      dims: dims.to_vec(),
      strides: strides.to_vec(),
    }
  }

  fn make_strides(dims: &[usize]) -> Vec<isize> {
    let mut strides = vec![1; dims.len()];
    for i in (1..dims.len()).rev() {
      strides[i - 1] = dims[i] as isize * strides[i];
    }
    strides
  }

  pub fn size(&self) -> usize {
    self.dims.iter().product()
  }

  pub fn rank(&self) -> usize {
    self.dims.len()
  }

  pub fn contiguous(&self) -> bool {
    self.strides == Self::make_strides(&self.dims)
  }

  /// Storage offsets of all elements, in row-major order of [dims](Shape::dims).

  pub fn iter(&self) -> ShapeIterator {
    ShapeIterator::new(self)
  }

  /// Reinterpret a contiguous shape with new dimensions.
  /// A single `0` acts as placeholder for whatever size remains.

  pub fn view(&self, dims: &[usize]) -> Self {
    assert!(self.contiguous(), "Cannot view non-contiguous {self}");
    let known: usize = dims.iter().filter(|&&n| n != 0 ).product();
    let dims: Vec<usize> = dims.iter()
      .map(|&n| if n == 0 {
        if known == 0 { 0 } else { self.size() / known }
      } else {
        n
      })
      .collect();
    let shape = Self::new(&dims);
    assert_eq!(shape.size(), self.size(), "Cannot view {self} as {shape}");
    shape
  }

  pub fn transpose(&self, dim1: isize, dim2: isize) -> Self {
    let dim1 = negative_index(dim1, self.rank());
    let dim2 = negative_index(dim2, self.rank());
    let mut shape = self.clone();
    shape.dims.swap(dim1, dim2);
    shape.strides.swap(dim1, dim2);
    shape
  }

  /// Move a dimension behind all others, keeping the order of the rest.

  pub fn move_to_end(&self, dim: isize) -> Self {
    let dim = negative_index(dim, self.rank());
    let mut shape = self.clone();
    let n = shape.dims.remove(dim);
    let stride = shape.strides.remove(dim);
    shape.dims.push(n);
    shape.strides.push(stride);
    shape
  }

  /// Dimensions that result from broadcasting two shapes against each other.

  pub fn broadcast(&self, other: &Self) -> Vec<usize> {
    let rank = self.rank().max(other.rank());
    let mut dims: Vec<usize> = self.dims.iter().rev()
      .chain(std::iter::repeat(&1))
      .zip(other.dims.iter().rev().chain(std::iter::repeat(&1)))
      .take(rank)
      .map(|(&a, &b)| {
        assert!(a == b || a == 1 || b == 1, "Could not broadcast {self} & {other}");
        if a == 1 { b } else { a }
      })
      .collect();
    dims.reverse();
    dims
  }

  /// Expand to the given dimensions without copying, by giving
  /// all broadcasted dimensions a stride of zero.

  pub fn broadcast_to(&self, dims: &[usize]) -> Self {
    assert!(self.rank() <= dims.len(), "Could not broadcast {self} to Shape{dims:?}");
    let lead = dims.len() - self.rank();
    let strides = dims.iter()
      .enumerate()
      .map(|(d, &n)| {
        if d < lead { return 0 }
        let own = self.dims[d - lead];
        assert!(own == n || own == 1, "Could not broadcast {self} to Shape{dims:?}");
        if own == 1 && n != 1 { 0 } else { self.strides[d - lead] }
      })
      .collect();
    Self { dims: dims.to_vec(), strides }
  }

  pub fn without(&self, dim: isize) -> Vec<usize> {
    let dim = negative_index(dim, self.rank());
    let mut dims = self.dims.clone();
    dims.remove(dim);
    dims
  }
}

impl std::ops::Index<isize> for Shape {
  type Output = usize;

  fn index(&self, i: isize) -> &usize {
    &self.dims[negative_index(i, self.rank())]
  }
}

impl std::fmt::Display for Shape {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "Shape{:?}", self.dims)
  }
}


/// Iterate through a [Shape]'s storage offsets.

pub struct ShapeIterator {
  dims: Vec<usize>,
  strides: Vec<isize>,
  counter: Vec<usize>,
  offset: isize,
  remaining: usize,
}

impl ShapeIterator {
  fn new(shape: &Shape) -> Self {
    Self {
      dims: shape.dims.clone(),
      strides: shape.strides.clone(),
      counter: vec![0; shape.rank()],
      offset: 0,
      remaining: shape.size(),
    }
  }
}

impl Iterator for ShapeIterator {
  type Item = usize;

  fn next(&mut self) -> Option<Self::Item> {
    if self.remaining == 0 { return None }
    self.remaining -= 1;
    let out = self.offset as usize;
    // Odometer over dimensions, rightmost turning fastest
    for d in (0..self.dims.len()).rev() {
      self.counter[d] += 1;
      self.offset += self.strides[d];
      if self.counter[d] < self.dims[d] { break }
      self.offset -= self.dims[d] as isize * self.strides[d];
      self.counter[d] = 0;
    }
    Some(out)
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    (self.remaining, Some(self.remaining))
  }
}

impl ExactSizeIterator for ShapeIterator {}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strides() {
    let shape = Shape::new(&[3,2,2]);
    assert_eq!(shape.strides, vec![4,2,1]);

    let shape = Shape::new(&[2,3,2]);
    assert_eq!(shape.strides, vec![6,2,1]);

    assert!(Shape::new(&[]).strides.is_empty());
  }

  #[test]
  fn iterate() {
    let shape = Shape::new(&[2,3]);
    assert_eq!(shape.iter().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4, 5]);

    let scalar = Shape::new(&[]);
    assert_eq!(scalar.iter().collect::<Vec<_>>(), vec![0]);

    let empty = Shape::new(&[0, 3]);
    assert_eq!(empty.iter().count(), 0);
  }

  #[test]
  fn transpose() {
    let shape = Shape::new(&[2,3]).transpose(0,1);
    assert_eq!(shape.dims, vec![3,2]);
    assert_eq!(shape.strides, vec![1,3]);
    assert!(!shape.contiguous());
    assert_eq!(shape.iter().collect::<Vec<_>>(), vec![0, 3, 1, 4, 2, 5]);
  }

  #[test]
  fn view() {
    let shape = Shape::new(&[4,1,28,28]).view(&[4,0]);
    assert_eq!(shape.dims, vec![4,784]);

    let shape = Shape::new(&[0,1,28,28]).view(&[0,784]);
    assert_eq!(shape.dims, vec![0,784]);
  }

  #[test]
  #[should_panic(expected = "Cannot view")]
  fn view_size_mismatch() {
    Shape::new(&[2,3]).view(&[4,2]);
  }

  #[test]
  fn move_to_end() {
    let shape = Shape::new(&[2,3,4]).move_to_end(0);
    assert_eq!(shape.dims, vec![3,4,2]);
    assert_eq!(shape.strides, vec![4,1,12]);
  }

  #[test]
  fn broadcast() {
    let dims = Shape::new(&[2,1,2]).broadcast(&Shape::new(&[3,1]));
    assert_eq!(dims, vec![2,3,2]);

    let shape = Shape::new(&[2,1,2]).broadcast_to(&dims);
    assert_eq!(shape.strides, vec![2,0,1]);
    assert_eq!(shape.iter().collect::<Vec<_>>(), vec![0, 1, 0, 1, 0, 1, 2, 3, 2, 3, 2, 3]);

    let bias = Shape::new(&[3]).broadcast_to(&[2,3]);
    assert_eq!(bias.strides, vec![0,1]);
  }

  #[test]
  #[should_panic(expected = "Could not broadcast")]
  fn broadcast_incompatible() {
    Shape::new(&[2,3]).broadcast(&Shape::new(&[4]));
  }
}
