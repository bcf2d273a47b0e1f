use crate::{Error, Order, Result, Shape};

/// Maps a multi-index to a position in a flat buffer:
/// `offset + sum(index[k] * strides[k])`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StrideLayout {
    shape: Shape,
    offset: usize,
    strides: Vec<usize>,
}

fn c_strides(dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; dims.len()];
    for i in (0..dims.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * dims[i + 1].max(1);
    }
    strides
}

fn f_strides(dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; dims.len()];
    for i in 1..dims.len() {
        strides[i] = strides[i - 1] * dims[i - 1].max(1);
    }
    strides
}

impl StrideLayout {
    pub fn new(shape: impl Into<Shape>, offset: usize, strides: Vec<usize>) -> Result<Self> {
        let shape = shape.into();
        if shape.rank() != strides.len() {
            return Err(Error::IllegalLayout {
                op: "layout",
                shape: shape.dims().to_vec(),
                strides,
            }
            .bt());
        }
        Ok(Self {
            shape,
            offset,
            strides,
        })
    }

    /// Canonical layout for `order`. `Storage` and `Auto` use the default order.
    pub fn of_order(shape: impl Into<Shape>, offset: usize, order: Order) -> Self {
        let shape = shape.into();
        let strides = match order.alloc_order() {
            Order::F => f_strides(shape.dims()),
            _ => c_strides(shape.dims()),
        };
        Self {
            shape,
            offset,
            strides,
        }
    }

    fn from_parts(dims: Vec<usize>, offset: usize, strides: Vec<usize>) -> Self {
        debug_assert_eq!(dims.len(), strides.len());
        Self {
            shape: Shape::new(dims),
            offset,
            strides,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn dim(&self, axis: usize) -> Result<usize> {
        self.shape.dim(axis)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    pub fn size(&self) -> usize {
        self.shape.size()
    }

    pub fn pointer(&self, index: &[usize]) -> Result<usize> {
        if index.len() != self.rank() {
            return Err(Error::out_of_bounds(
                "pointer",
                format!("index of rank {} for layout of rank {}", index.len(), self.rank()),
            ));
        }
        let mut ptr = self.offset;
        for (axis, (&i, (&d, &s))) in index
            .iter()
            .zip(self.dims().iter().zip(&self.strides))
            .enumerate()
        {
            if i >= d {
                return Err(Error::out_of_bounds(
                    "pointer",
                    format!("index {i} on axis {axis} with dim {d}"),
                ));
            }
            ptr += i * s;
        }
        Ok(ptr)
    }

    /// Largest reachable buffer position, `None` when the layout has no elements.
    pub fn max_pointer(&self) -> Option<usize> {
        if self.size() == 0 {
            return None;
        }
        Some(
            self.offset
                + self
                    .dims()
                    .iter()
                    .zip(&self.strides)
                    .map(|(d, s)| (d - 1) * s)
                    .sum::<usize>(),
        )
    }

    fn non_unit(&self) -> (Vec<usize>, Vec<usize>) {
        self.dims()
            .iter()
            .zip(&self.strides)
            .filter(|(d, _)| **d != 1)
            .map(|(d, s)| (*d, *s))
            .unzip()
    }

    /// Row-major contiguous, ignoring unit axes.
    pub fn is_c_dense(&self) -> bool {
        if self.size() == 0 {
            return true;
        }
        let (dims, strides) = self.non_unit();
        let mut expected = 1;
        for (d, s) in dims.iter().zip(&strides).rev() {
            if *s != expected {
                return false;
            }
            expected *= d;
        }
        true
    }

    /// Column-major contiguous, ignoring unit axes.
    pub fn is_f_dense(&self) -> bool {
        if self.size() == 0 {
            return true;
        }
        let (dims, strides) = self.non_unit();
        let mut expected = 1;
        for (d, s) in dims.iter().zip(&strides) {
            if *s != expected {
                return false;
            }
            expected *= d;
        }
        true
    }

    pub fn is_dense(&self) -> bool {
        self.is_c_dense() || self.is_f_dense()
    }

    /// The fastest order to walk this layout's buffer.
    pub fn storage_fast_order(&self) -> Order {
        if self.rank() < 2 {
            return Order::default();
        }
        if self.is_f_dense() {
            return Order::F;
        }
        if self.is_c_dense() {
            return Order::C;
        }
        Order::Storage
    }

    /// Resolves `Auto` into C or F. Other orders are returned unchanged.
    pub fn resolve(&self, order: Order) -> Order {
        match order {
            Order::Auto => {
                if self.is_c_dense() {
                    Order::C
                } else if self.is_f_dense() {
                    Order::F
                } else {
                    Order::default()
                }
            }
            other => other,
        }
    }

    fn check_axis(&self, op: &'static str, axis: usize) -> Result<()> {
        self.shape.check_axis(op, axis)
    }

    pub fn narrow(&self, axis: usize, start: usize, end: usize) -> Result<Self> {
        self.check_axis("narrow", axis)?;
        let dim = self.dims()[axis];
        if start > end || end > dim {
            return Err(Error::out_of_bounds(
                "narrow",
                format!("range {start}..{end} on axis {axis} with dim {dim}"),
            ));
        }
        let mut dims = self.dims().to_vec();
        dims[axis] = end - start;
        let offset = if end > start {
            self.offset + start * self.strides[axis]
        } else {
            self.offset
        };
        Ok(Self::from_parts(dims, offset, self.strides.clone()))
    }

    pub fn permute(&self, axes: &[usize]) -> Result<Self> {
        if axes.len() != self.rank() {
            return Err(Error::shape_mismatch("permute", axes, self.dims()));
        }
        let mut seen = vec![false; self.rank()];
        for &a in axes {
            if a >= self.rank() || seen[a] {
                return Err(Error::out_of_bounds(
                    "permute",
                    format!("{axes:?} is not a permutation of 0..{}", self.rank()),
                ));
            }
            seen[a] = true;
        }
        let dims = axes.iter().map(|&a| self.dims()[a]).collect();
        let strides = axes.iter().map(|&a| self.strides[a]).collect();
        Ok(Self::from_parts(dims, self.offset, strides))
    }

    /// Reverses the axes.
    pub fn revert(&self) -> Self {
        let mut dims = self.dims().to_vec();
        let mut strides = self.strides.clone();
        dims.reverse();
        strides.reverse();
        Self::from_parts(dims, self.offset, strides)
    }

    pub fn swap_axes(&self, a: usize, b: usize) -> Result<Self> {
        self.check_axis("swap_axes", a)?;
        self.check_axis("swap_axes", b)?;
        let mut dims = self.dims().to_vec();
        let mut strides = self.strides.clone();
        dims.swap(a, b);
        strides.swap(a, b);
        Ok(Self::from_parts(dims, self.offset, strides))
    }

    /// Moves axis `src` to position `dst`, shifting the axes in between.
    pub fn move_axis(&self, src: usize, dst: usize) -> Result<Self> {
        self.check_axis("move_axis", src)?;
        self.check_axis("move_axis", dst)?;
        let mut dims = self.dims().to_vec();
        let mut strides = self.strides.clone();
        let d = dims.remove(src);
        let s = strides.remove(src);
        dims.insert(dst, d);
        strides.insert(dst, s);
        Ok(Self::from_parts(dims, self.offset, strides))
    }

    /// Drops every unit axis.
    pub fn squeeze(&self) -> Self {
        let (dims, strides) = self.non_unit();
        Self::from_parts(dims, self.offset, strides)
    }

    /// Drops `axis` if it has dim 1, otherwise returns the layout unchanged.
    pub fn squeeze_axis(&self, axis: usize) -> Result<Self> {
        self.check_axis("squeeze_axis", axis)?;
        if self.dims()[axis] != 1 {
            return Ok(self.clone());
        }
        let mut dims = self.dims().to_vec();
        let mut strides = self.strides.clone();
        dims.remove(axis);
        strides.remove(axis);
        Ok(Self::from_parts(dims, self.offset, strides))
    }

    /// Inserts a unit axis at position `axis` (which may equal the rank).
    pub fn unsqueeze(&self, axis: usize) -> Result<Self> {
        if axis > self.rank() {
            return Err(Error::out_of_bounds(
                "unsqueeze",
                format!("axis {axis} for layout of rank {}", self.rank()),
            ));
        }
        let mut dims = self.dims().to_vec();
        let mut strides = self.strides.clone();
        dims.insert(axis, 1);
        strides.insert(axis, 0);
        Ok(Self::from_parts(dims, self.offset, strides))
    }

    /// Repeats a unit axis `size` times by giving it a zero stride.
    pub fn expand(&self, axis: usize, size: usize) -> Result<Self> {
        self.check_axis("expand", axis)?;
        if self.dims()[axis] != 1 {
            return Err(Error::shape_mismatch("expand", self.dims(), &[axis, size]));
        }
        let mut dims = self.dims().to_vec();
        let mut strides = self.strides.clone();
        dims[axis] = size;
        strides[axis] = 0;
        Ok(Self::from_parts(dims, self.offset, strides))
    }

    /// Keeps every `step`-th element along `axis`.
    pub fn step(&self, axis: usize, step: usize) -> Result<Self> {
        self.check_axis("step", axis)?;
        if step == 0 {
            return Err(Error::out_of_bounds("step", "step must be positive"));
        }
        let mut dims = self.dims().to_vec();
        let mut strides = self.strides.clone();
        dims[axis] = dims[axis].div_ceil(step);
        strides[axis] *= step;
        Ok(Self::from_parts(dims, self.offset, strides))
    }

    /// Sliding windows along `axis`.
    ///
    /// The axis becomes the window count and a trailing axis of length `size`
    /// walks the window, `dilation` elements apart.
    pub fn unfold(&self, axis: usize, size: usize, step: usize, dilation: usize) -> Result<Self> {
        self.check_axis("unfold", axis)?;
        if size == 0 || step == 0 || dilation == 0 {
            return Err(Error::out_of_bounds(
                "unfold",
                format!("size {size}, step {step} and dilation {dilation} must be positive"),
            ));
        }
        let dim = self.dims()[axis];
        let span = dilation * (size - 1) + 1;
        if span > dim {
            return Err(Error::out_of_bounds(
                "unfold",
                format!("window span {span} exceeds dim {dim} on axis {axis}"),
            ));
        }
        let stride = self.strides[axis];
        let mut dims = self.dims().to_vec();
        let mut strides = self.strides.clone();
        dims[axis] = (dim - span) / step + 1;
        strides[axis] = step * stride;
        dims.push(size);
        strides.push(dilation * stride);
        Ok(Self::from_parts(dims, self.offset, strides))
    }

    /// Reshape without copying. Returns `None` when the elements cannot be
    /// addressed in `order` with a single set of strides.
    ///
    /// `order` must be C or F; sizes must already agree.
    pub fn attempt_reshape(&self, shape: &Shape, order: Order) -> Option<Self> {
        debug_assert_eq!(self.size(), shape.size());
        let is_f = matches!(order, Order::F);
        let new_dims = shape.dims();
        if self.size() == 0 {
            return Some(Self::of_order(shape.clone(), self.offset, order));
        }
        let (old_dims, old_strides) = self.non_unit();
        let new_nd = new_dims.len();
        let old_nd = old_dims.len();
        let mut new_strides = vec![0usize; new_nd];

        let (mut oi, mut oj, mut ni, mut nj) = (0, 1, 0, 1);
        while ni < new_nd && oi < old_nd {
            let mut np = new_dims[ni];
            let mut op = old_dims[oi];
            while np != op {
                if np < op {
                    np *= new_dims[nj];
                    nj += 1;
                } else {
                    op *= old_dims[oj];
                    oj += 1;
                }
            }
            for ok in oi..oj - 1 {
                let contiguous = if is_f {
                    old_strides[ok + 1] == old_dims[ok] * old_strides[ok]
                } else {
                    old_strides[ok] == old_dims[ok + 1] * old_strides[ok + 1]
                };
                if !contiguous {
                    return None;
                }
            }
            if is_f {
                new_strides[ni] = old_strides[oi];
                for nk in ni + 1..nj {
                    new_strides[nk] = new_strides[nk - 1] * new_dims[nk - 1];
                }
            } else {
                new_strides[nj - 1] = old_strides[oj - 1];
                for nk in (ni + 1..nj).rev() {
                    new_strides[nk - 1] = new_strides[nk] * new_dims[nk];
                }
            }
            ni = nj;
            nj += 1;
            oi = oj;
            oj += 1;
        }

        // Trailing unit dims.
        let mut last = if ni >= 1 { new_strides[ni - 1] } else { 1 };
        if is_f && ni >= 1 {
            last *= new_dims[ni - 1];
        }
        for s in new_strides.iter_mut().skip(ni) {
            *s = last;
        }
        Some(Self::from_parts(new_dims.to_vec(), self.offset, new_strides))
    }

    /// Dims and strides reordered so that axis 0 is the fastest for `order`.
    ///
    /// With `compact`, unit axes are dropped and neighbouring axes that are
    /// contiguous with each other are merged.
    pub fn compute_fortran_layout(&self, order: Order, compact: bool) -> Self {
        let (mut dims, mut strides) = match self.resolve(order) {
            Order::F => (self.dims().to_vec(), self.strides.clone()),
            Order::Storage => {
                let mut axes: Vec<usize> = (0..self.rank()).collect();
                axes.sort_by(|&i, &j| {
                    let (si, sj) = (self.strides[i], self.strides[j]);
                    let (di, dj) = (self.dims()[i], self.dims()[j]);
                    match (si == 0, sj == 0) {
                        (true, true) => di.cmp(&dj),
                        (true, false) => std::cmp::Ordering::Greater,
                        (false, true) => std::cmp::Ordering::Less,
                        (false, false) => si.cmp(&sj).then(di.cmp(&dj)),
                    }
                });
                (
                    axes.iter().map(|&a| self.dims()[a]).collect(),
                    axes.iter().map(|&a| self.strides[a]).collect(),
                )
            }
            _ => {
                let rev = self.revert();
                (rev.dims().to_vec(), rev.strides)
            }
        };
        if !compact || self.size() == 0 {
            return Self::from_parts(dims, self.offset, strides);
        }

        let keep: Vec<(usize, usize)> = dims
            .iter()
            .zip(&strides)
            .filter(|(d, _)| **d != 1)
            .map(|(d, s)| (*d, *s))
            .collect();
        if keep.is_empty() {
            return Self::from_parts(vec![1], self.offset, vec![1]);
        }
        dims.clear();
        strides.clear();
        for (d, s) in keep {
            if let (Some(ld), Some(ls)) = (dims.last_mut(), strides.last()) {
                if *ld * *ls == s {
                    *ld *= d;
                    continue;
                }
            }
            dims.push(d);
            strides.push(s);
        }
        Self::from_parts(dims, self.offset, strides)
    }
}
