//! Multilayer perceptron for the MNIST handwritten digits, built on a
//! tiny reverse-mode autograd. CPU only.
//!
//! # Overview
//!
//! - **Tensors** share their storage, so parameters can be updated in place
//! through any handle. Elementwise operations broadcast NumPy style.
//!
//! - **Auto-grad**: Calling [tracked](Tensor::tracked) or [trained](Tensor::trained)
//! wraps a tensor in a [Variable], which records the operations applied to it.
//! [backward](Variable::backward) then fills in the gradients of all trainable inputs.
//!
//! - **Write once**: Models are written against the [ops] traits, so the same code
//! runs a tracked forward pass for training and a plain one for evaluation.
//!
//! - **Data**: The [dataset] module downloads, parses and batches MNIST.
//!
//! # Examples
//!
//! Minimizing a small function with Adam:
//! ```
//! use mnist_mlp::{ ops::*, Tensor, optimize::{ Optimizer, Adam } };
//!
//! let w = Tensor::vec(&[0.5f32, -1.0]).trained();
//! let mut optimizer = Optimizer::new(vec![w.clone()], 0.01, Adam::default());
//!
//! for _ in 0..10 {
//!   optimizer.zero_grad();
//!   let x = Tensor::new(&[1, 2], vec![1.0, 2.0]).tracked();
//!   let loss = x.mm(&w.reshape(&[2, 1]));
//!   loss.backward();
//!   optimizer.step();
//! }
//! assert!(w.tensor().to_vec()[0] < 0.5);
//! ```
//!
//! # Optional features
//!
//! - `unsafe` *(default)*: Accelerated matrix math using the [matrixmultiply] crate.
//! - `threading`: Let [matrixmultiply] use multiple threads.

mod internal;
mod shape;
mod tensor;
mod variable;

pub mod ops;
pub mod scalar;
pub mod optimize;
pub mod config;
pub mod dataset;
pub mod model;
pub mod train;
pub mod evaluate;

pub use shape::Shape;
pub use tensor::Tensor;
pub use variable::{ Variable, UnaryOp, BinaryOp };
