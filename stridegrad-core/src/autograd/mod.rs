//! Tape-based reverse-mode differentiation.
//!
//! A [`ComputeGraph`] owns every tensor value and gradient. Operations are
//! methods on the graph: each computes its value eagerly and, when one of
//! its inputs requires gradients, appends a [`TapeEntry`] describing itself.
//! [`ComputeGraph::backward`] walks the tape in reverse and accumulates
//! gradients into the inputs.
//!
//! ```
//! use stridegrad_core::{ComputeGraph, Manager, Order};
//!
//! let m = Manager::<f64>::new();
//! let mut graph = ComputeGraph::new();
//! let x = graph.param(m.seq([3], Order::C));
//! let y = graph.mul(x, x).unwrap();
//! let loss = graph.sum(y).unwrap();
//! graph.backward(loss).unwrap();
//! assert_eq!(graph.grad(x).unwrap().unwrap().to_vec(Order::C), vec![0., 2., 4.]);
//! ```

mod backward;
mod graph;
mod op;
mod ops;

pub use graph::{ComputeGraph, TapeEntry, Tensor};
pub use op::Op;
