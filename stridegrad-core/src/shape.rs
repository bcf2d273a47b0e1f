use std::fmt::Display;

use crate::{Error, Result};

/// Immutable list of dimensions. A rank 0 shape describes a scalar.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    pub fn scalar() -> Self {
        Self { dims: Vec::new() }
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Number of elements: the product of all dims, 1 for a scalar.
    pub fn size(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn dim(&self, axis: usize) -> Result<usize> {
        self.dims.get(axis).copied().ok_or_else(|| {
            Error::out_of_bounds(
                "dim",
                format!("axis {axis} for shape of rank {}", self.rank()),
            )
        })
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    pub fn unit_dim_count(&self) -> usize {
        self.dims.iter().filter(|d| **d == 1).count()
    }

    /// Checks that `axis` addresses one of the dims.
    pub(crate) fn check_axis(&self, op: &'static str, axis: usize) -> Result<()> {
        if axis >= self.rank() {
            return Err(Error::out_of_bounds(
                op,
                format!("axis {axis} for shape of rank {}", self.rank()),
            ));
        }
        Ok(())
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self { dims }
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self {
            dims: dims.to_vec(),
        }
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self {
            dims: dims.to_vec(),
        }
    }
}

impl From<&Shape> for Shape {
    fn from(shape: &Shape) -> Self {
        shape.clone()
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, ")")
    }
}

/// Traversal and allocation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Order {
    /// Row-major: the last axis varies fastest.
    #[default]
    C,
    /// Column-major: the first axis varies fastest.
    F,
    /// Whatever order walks the backing buffer fastest. Only meaningful for
    /// traversals where the visiting order does not matter.
    Storage,
    /// C or F, whichever matches the layout at hand, else the default order.
    Auto,
}

impl Order {
    /// The order used when allocating: `Storage` and `Auto` fall back to the default.
    pub fn alloc_order(self) -> Order {
        match self {
            Order::F => Order::F,
            _ => Order::C,
        }
    }
}
