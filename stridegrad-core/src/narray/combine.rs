use super::NArray;
use crate::{DType, Error, Order, Result};

impl<T: DType> NArray<T> {
    /// Joins arrays along an existing axis into fresh C-ordered storage.
    ///
    /// All arrays must share the rank and every dim except `axis`.
    pub fn concat(axis: usize, arrays: &[&Self]) -> Result<Self> {
        let first = arrays
            .first()
            .ok_or_else(|| Error::out_of_bounds("concat", "no arrays to concatenate"))?;
        first.shape().check_axis("concat", axis)?;
        let mut dims = first.dims().to_vec();
        dims[axis] = 0;
        for a in arrays {
            let compatible = a.rank() == first.rank()
                && a
                    .dims()
                    .iter()
                    .zip(first.dims())
                    .enumerate()
                    .all(|(i, (x, y))| i == axis || x == y);
            if !compatible {
                return Err(Error::shape_mismatch("concat", first.dims(), a.dims()));
            }
            dims[axis] += a.dims()[axis];
        }

        let out = Self::zeros(dims, Order::C);
        let mut start = 0;
        for a in arrays {
            let end = start + a.dims()[axis];
            out.narrow(axis, start, end)?.assign_(a)?;
            start = end;
        }
        Ok(out)
    }

    /// Joins equally shaped arrays along a new axis inserted at `axis`.
    pub fn stack(axis: usize, arrays: &[&Self]) -> Result<Self> {
        let first = arrays
            .first()
            .ok_or_else(|| Error::out_of_bounds("stack", "no arrays to stack"))?;
        if axis > first.rank() {
            return Err(Error::out_of_bounds(
                "stack",
                format!("axis {axis} for arrays of rank {}", first.rank()),
            ));
        }
        for a in arrays {
            first.check_same_shape("stack", a)?;
        }
        let expanded = arrays
            .iter()
            .map(|a| a.unsqueeze(axis))
            .collect::<Result<Vec<_>>>()?;
        Self::concat(axis, &expanded.iter().collect::<Vec<_>>())
    }
}
