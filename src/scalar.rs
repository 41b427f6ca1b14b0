use rand::distributions::uniform::SampleUniform;
use num_traits::{ Float, NumAssignOps };


/// All continuous numeric types that may be stored in a [Tensor](crate::Tensor)
/// and differentiated through a [Variable](crate::Variable).
///
/// Implemented for `f32` and `f64`, which are the types matrix
/// multiplication can be dispatched to.

pub trait Real: Float + NumAssignOps + SampleUniform + std::iter::Sum
  + Send + Sync + std::fmt::Debug + std::fmt::Display + 'static
{
  /// Compute `c = a * b`, where `a` is `m x k`, `b` is `k x n` and `c` is a
  /// dense row-major `m x n` buffer. `a` and `b` are read through
  /// the given (row, column) strides.
  fn gemm(
    dims: [usize; 3],
    a: &[Self], a_strides: [isize; 2],
    b: &[Self], b_strides: [isize; 2],
    c: &mut [Self],
  );
}


// Largest storage index touched by a strided rows x cols matrix
fn reach(rows: usize, cols: usize, strides: [isize; 2]) -> usize {
  assert!(strides[0] >= 0 && strides[1] >= 0, "Negative strides are not supported by gemm");
  (rows - 1) * strides[0] as usize + (cols - 1) * strides[1] as usize
}

fn check_bounds<T>(dims: [usize; 3], a: &[T], a_strides: [isize; 2], b: &[T], b_strides: [isize; 2], c: &[T]) -> bool {
  let [m, k, n] = dims;
  assert!(c.len() >= m * n, "Output buffer too small for {m}x{n} product");
  if m == 0 || n == 0 { return false }
  if k > 0 {
    assert!(reach(m, k, a_strides) < a.len(), "Left matrix exceeds its storage");
    assert!(reach(k, n, b_strides) < b.len(), "Right matrix exceeds its storage");
  }
  true
}


#[cfg(feature = "unsafe")]
macro_rules! impl_real {
  ($type:ty, $gemm:path) => {
    impl Real for $type {
      fn gemm(
        dims: [usize; 3],
        a: &[Self], a_strides: [isize; 2],
        b: &[Self], b_strides: [isize; 2],
        c: &mut [Self],
      ) {
        if !check_bounds(dims, a, a_strides, b, b_strides, c) { return }
        let [m, k, n] = dims;
        // Bounds of all three buffers were checked above
        unsafe {
          $gemm(
            m, k, n,
            1.0,
            a.as_ptr(), a_strides[0], a_strides[1],
            b.as_ptr(), b_strides[0], b_strides[1],
            0.0,
            c.as_mut_ptr(), n as isize, 1,
          );
        }
      }
    }
  };
}

#[cfg(feature = "unsafe")]
impl_real!(f32, matrixmultiply::sgemm);

#[cfg(feature = "unsafe")]
impl_real!(f64, matrixmultiply::dgemm);


#[cfg(not(feature = "unsafe"))]
fn gemm_strided<T: Float + NumAssignOps>(
  dims: [usize; 3],
  a: &[T], a_strides: [isize; 2],
  b: &[T], b_strides: [isize; 2],
  c: &mut [T],
) {
  if !check_bounds(dims, a, a_strides, b, b_strides, c) { return }
  let [m, k, n] = dims;
  let (ar, ac) = (a_strides[0] as usize, a_strides[1] as usize);
  let (br, bc) = (b_strides[0] as usize, b_strides[1] as usize);
  for i in 0..m {
    let row = &mut c[i * n..(i + 1) * n];
    row.iter_mut().for_each(|v| *v = T::zero() );
    for p in 0..k {
      let lhs = a[i * ar + p * ac];
      for (j, out) in row.iter_mut().enumerate() {
        *out += lhs * b[p * br + j * bc];
      }
    }
  }
}

#[cfg(not(feature = "unsafe"))]
macro_rules! impl_real {
  ($type:ty) => {
    impl Real for $type {
      fn gemm(
        dims: [usize; 3],
        a: &[Self], a_strides: [isize; 2],
        b: &[Self], b_strides: [isize; 2],
        c: &mut [Self],
      ) {
        gemm_strided(dims, a, a_strides, b, b_strides, c)
      }
    }
  };
}

#[cfg(not(feature = "unsafe"))]
impl_real!(f32);

#[cfg(not(feature = "unsafe"))]
impl_real!(f64);


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn gemm_row_major() {
    let a = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
    let b = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
    let mut c = [0.0f32; 4];
    f32::gemm([2, 3, 2], &a, [3, 1], &b, [2, 1], &mut c);
    assert_eq!(c, [22.0, 28.0, 49.0, 64.0]);
  }

  #[test]
  fn gemm_transposed_operand() {
    // Reading `a` column-major multiplies by its transpose
    let a = [1.0f64, 2.0, 3.0, 4.0];
    let b = [1.0f64, 0.0, 0.0, 1.0];
    let mut c = [0.0f64; 4];
    f64::gemm([2, 2, 2], &a, [1, 2], &b, [2, 1], &mut c);
    assert_eq!(c, [1.0, 3.0, 2.0, 4.0]);
  }

  #[test]
  #[should_panic(expected = "exceeds its storage")]
  fn gemm_checks_bounds() {
    let a = [1.0f32; 3];
    let b = [1.0f32; 4];
    let mut c = [0.0f32; 4];
    f32::gemm([2, 2, 2], &a, [2, 1], &b, [2, 1], &mut c);
  }
}
