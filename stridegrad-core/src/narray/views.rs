use tracing::debug;

use super::NArray;
use crate::{DType, Error, Order, Result, Shape, StrideLayout};

impl<T: DType> NArray<T> {
    pub fn narrow(&self, axis: usize, start: usize, end: usize) -> Result<Self> {
        Ok(self.with_layout(self.layout().narrow(axis, start, end)?))
    }

    pub fn permute(&self, axes: &[usize]) -> Result<Self> {
        Ok(self.with_layout(self.layout().permute(axes)?))
    }

    /// Reverses the axes; the transpose of a matrix.
    pub fn t(&self) -> Self {
        self.with_layout(self.layout().revert())
    }

    pub fn swap_axes(&self, a: usize, b: usize) -> Result<Self> {
        Ok(self.with_layout(self.layout().swap_axes(a, b)?))
    }

    pub fn move_axis(&self, src: usize, dst: usize) -> Result<Self> {
        Ok(self.with_layout(self.layout().move_axis(src, dst)?))
    }

    pub fn squeeze(&self) -> Self {
        self.with_layout(self.layout().squeeze())
    }

    pub fn squeeze_axis(&self, axis: usize) -> Result<Self> {
        Ok(self.with_layout(self.layout().squeeze_axis(axis)?))
    }

    pub fn unsqueeze(&self, axis: usize) -> Result<Self> {
        Ok(self.with_layout(self.layout().unsqueeze(axis)?))
    }

    /// Broadcasts a unit axis to `size` without copying.
    pub fn expand(&self, axis: usize, size: usize) -> Result<Self> {
        Ok(self.with_layout(self.layout().expand(axis, size)?))
    }

    /// Every `step`-th element along `axis`.
    pub fn step(&self, axis: usize, step: usize) -> Result<Self> {
        Ok(self.with_layout(self.layout().step(axis, step)?))
    }

    /// Sliding windows along `axis`, appended as a trailing axis of length `size`.
    pub fn unfold(&self, axis: usize, size: usize, step: usize, dilation: usize) -> Result<Self> {
        Ok(self.with_layout(self.layout().unfold(axis, size, step, dilation)?))
    }

    pub fn reshape(&self, shape: impl Into<Shape>) -> Result<Self> {
        self.reshape_with(shape, Order::Auto)
    }

    fn reshape_order(&self, order: Order) -> Order {
        match order {
            Order::Storage => self.layout().resolve(Order::Auto),
            other => self.layout().resolve(other),
        }
    }

    /// Reshape reading the elements in `order`. Shares the storage when the
    /// layout allows it, copies otherwise.
    pub fn reshape_with(&self, shape: impl Into<Shape>, order: Order) -> Result<Self> {
        let shape = shape.into();
        if shape.size() != self.size() {
            return Err(Error::shape_mismatch("reshape", self.dims(), shape.dims()));
        }
        let order = self.reshape_order(order);
        if let Some(layout) = self.layout().attempt_reshape(&shape, order) {
            return Ok(self.with_layout(layout));
        }
        debug!(
            from = %self.shape(),
            to = %shape,
            ?order,
            "reshape needs a copy"
        );
        Self::from_vec(self.to_vec(order), shape, order)
    }

    /// Reshape that never copies; fails with `IllegalLayout` instead.
    pub fn reshape_view(&self, shape: impl Into<Shape>, order: Order) -> Result<Self> {
        let shape = shape.into();
        if shape.size() != self.size() {
            return Err(Error::shape_mismatch("reshape_view", self.dims(), shape.dims()));
        }
        let order = self.reshape_order(order);
        match self.layout().attempt_reshape(&shape, order) {
            Some(layout) => Ok(self.with_layout(layout)),
            None => Err(Error::IllegalLayout {
                op: "reshape_view",
                shape: self.dims().to_vec(),
                strides: self.layout().strides().to_vec(),
            }
            .bt()),
        }
    }

    pub fn flatten(&self, order: Order) -> Result<Self> {
        self.reshape_with([self.size()], order)
    }

    /// Views of consecutive chunks along `axis`. Chunk `i` spans
    /// `indices[i]..indices[i + 1]`, the last one runs to the end of the axis.
    pub fn split(&self, axis: usize, indices: &[usize]) -> Result<Vec<Self>> {
        let dim = self.dim(axis)?;
        if indices.is_empty() {
            return Err(Error::out_of_bounds("split", "no split indices"));
        }
        if indices.windows(2).any(|w| w[0] >= w[1]) || indices.iter().any(|i| *i > dim) {
            return Err(Error::out_of_bounds(
                "split",
                format!("indices {indices:?} must be increasing and within dim {dim}"),
            ));
        }
        indices
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = indices.get(i + 1).copied().unwrap_or(dim);
                self.narrow(axis, start, end)
            })
            .collect()
    }

    /// Copy with `before` zeros prepended and `after` zeros appended along `axis`.
    pub fn pad(&self, axis: usize, before: usize, after: usize) -> Result<Self> {
        let dim = self.dim(axis)?;
        let mut dims = self.dims().to_vec();
        dims[axis] = before + dim + after;
        let out = Self::zeros(dims, Order::C);
        out.narrow(axis, before, before + dim)?.assign_(self)?;
        Ok(out)
    }

    /// Copy padded on every axis, with the source elements spread `dilation`
    /// apart (zeros in between).
    pub fn pad_with(&self, pads: &[(usize, usize)], dilation: usize) -> Result<Self> {
        if pads.len() != self.rank() {
            return Err(Error::shape_mismatch(
                "pad_with",
                self.dims(),
                &pads.iter().map(|(b, a)| b + a).collect::<Vec<_>>(),
            ));
        }
        if dilation == 0 {
            return Err(Error::out_of_bounds("pad_with", "dilation must be positive"));
        }
        let spans: Vec<usize> = self
            .dims()
            .iter()
            .map(|&d| if d == 0 { 0 } else { (d - 1) * dilation + 1 })
            .collect();
        let dims: Vec<usize> = spans
            .iter()
            .zip(pads)
            .map(|(s, (b, a))| b + s + a)
            .collect();
        let out = Self::zeros(dims, Order::C);
        let mut layout: StrideLayout = out.layout().clone();
        for (axis, (span, (before, _))) in spans.iter().zip(pads).enumerate() {
            layout = layout
                .narrow(axis, *before, before + span)?
                .step(axis, dilation)?;
        }
        out.with_layout(layout).assign_(self)?;
        Ok(out)
    }
}
