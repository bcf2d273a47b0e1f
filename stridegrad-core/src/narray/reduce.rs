use super::NArray;
use crate::{DType, Error, Order, Result};

impl<T: DType> NArray<T> {
    /// Sum of all elements; integral types wrap.
    pub fn sum(&self) -> T {
        self.fold_rows(T::ZERO, |acc, data, row| acc.add_elem(T::sum_row(data, row)))
    }

    /// Mean with a second pass that corrects the rounding of the first, for
    /// floating point types.
    ///
    /// Computed in `f64` and converted back. An empty array gives NaN (0 for
    /// integral types).
    pub fn mean(&self) -> T {
        let n = self.size() as f64;
        let values = self.to_vec(Order::Storage);
        let mean = values.iter().map(|x| x.to_f64()).sum::<f64>() / n;
        if !T::ELEM.is_floating_point() {
            return T::from_f64(mean);
        }
        let correction = values.iter().map(|x| x.to_f64() - mean).sum::<f64>() / n;
        T::from_f64(mean + correction)
    }

    fn extreme(&self, op: &'static str, pick: impl Fn(T, T) -> T) -> Result<T> {
        let values = self.to_vec(Order::Storage);
        let mut it = values.into_iter();
        let first = it
            .next()
            .ok_or_else(|| Error::out_of_bounds(op, "reduction over an empty array"))?;
        Ok(it.fold(first, pick))
    }

    pub fn max(&self) -> Result<T> {
        self.extreme("max", T::max_elem)
    }

    pub fn min(&self) -> Result<T> {
        self.extreme("min", T::min_elem)
    }

    fn reduced_dims(&self, axis: usize) -> Result<Vec<usize>> {
        self.dim(axis)?;
        let mut dims = self.dims().to_vec();
        dims.remove(axis);
        Ok(dims)
    }

    /// Slice `i` along `axis` with the axis removed.
    fn axis_slice(&self, axis: usize, i: usize) -> Result<Self> {
        self.narrow(axis, i, i + 1)?.squeeze_axis(axis)
    }

    /// Sums along `axis`; the axis is removed from the result.
    pub fn sum_axis(&self, axis: usize) -> Result<Self> {
        let out = Self::zeros(self.reduced_dims(axis)?, Order::C);
        for i in 0..self.dims()[axis] {
            out.add_(&self.axis_slice(axis, i)?)?;
        }
        Ok(out)
    }

    pub fn mean_axis(&self, axis: usize) -> Result<Self> {
        let n = self.dim(axis)?;
        if n == 0 {
            return Err(Error::out_of_bounds("mean_axis", format!("axis {axis} is empty")));
        }
        let out = self.sum_axis(axis)?;
        out.div_scalar_(T::from_f64(n as f64));
        Ok(out)
    }

    fn extreme_axis(
        &self,
        op: &'static str,
        axis: usize,
        pick: impl Fn(&Self, &Self) -> Result<()>,
    ) -> Result<Self> {
        let dims = self.reduced_dims(axis)?;
        let n = self.dims()[axis];
        if n == 0 {
            return Err(Error::out_of_bounds(op, format!("axis {axis} is empty")));
        }
        let out = self.axis_slice(axis, 0)?.copy(Order::C);
        debug_assert_eq!(out.dims(), dims.as_slice());
        for i in 1..n {
            pick(&out, &self.axis_slice(axis, i)?)?;
        }
        Ok(out)
    }

    pub fn max_axis(&self, axis: usize) -> Result<Self> {
        self.extreme_axis("max_axis", axis, |out, s| out.max_(s).map(|_| ()))
    }

    pub fn min_axis(&self, axis: usize) -> Result<Self> {
        self.extreme_axis("min_axis", axis, |out, s| out.min_(s).map(|_| ()))
    }
}
