//! Stridegrad is a strided N-dimensional array engine with a tape-based
//! reverse-mode autograd layer on top.
//!
//! Arrays are thin views: an [`NArray`] is a shared [`Storage`] buffer plus a
//! [`StrideLayout`] (shape, offset, strides). Slicing, permuting, unfolding
//! and most reshapes only build a new layout, so views alias their source.
//!
//! Elementwise kernels walk layouts through loop descriptors: the innermost
//! contiguous run is processed in lane-sized blocks, then the remainder.
//!
//! ## A quick guide
//! - Create arrays with a [`Manager`] for the element type (`u8`, `i32`, `f32`, `f64`).
//! - Build a [`ComputeGraph`], register inputs with [`ComputeGraph::leaf`] or
//!   [`ComputeGraph::param`], and compose operations on the returned [`Tensor`] handles.
//! - Call [`ComputeGraph::backward`] on a scalar loss and read gradients with [`ComputeGraph::grad`].
//! - Update parameters with an [`optim::Optimizer`], then [`ComputeGraph::reset_grad`] before the next pass.
//!
//! ## What can you do with it?
//! ```
//! use stridegrad_core::{ComputeGraph, Manager, Order};
//!
//! let m = Manager::<f32>::new();
//! let a = m.seq([2, 3], Order::C);
//! let col = a.narrow(1, 1, 2).unwrap();
//! assert_eq!(col.to_vec(Order::C), vec![1.0, 4.0]);
//!
//! let mut graph = ComputeGraph::new();
//! let x = graph.param(a);
//! let y = graph.pow(x, 2.0).unwrap();
//! let loss = graph.sum(y).unwrap();
//! graph.backward(loss).unwrap();
//!
//! let grad = graph.grad(x).unwrap().unwrap();
//! assert_eq!(grad.to_vec(Order::C), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
//! ```

mod autograd;
pub mod dtype;
mod error;
pub mod iterators;
mod layout;
mod manager;
mod narray;
pub mod optim;
mod shape;
mod storage;

pub use autograd::{ComputeGraph, Op, TapeEntry, Tensor};
pub use dtype::{BinaryOpType, DType, DTypeOps, ElemType, FloatDType, UnaryOpType};
pub use error::{Error, Result};
pub use layout::StrideLayout;
pub use manager::{seq_of, zeros_of, Manager};
pub use narray::{AnyNArray, NArray};
pub use shape::{Order, Shape};
pub use storage::Storage;
