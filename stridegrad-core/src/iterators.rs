use crate::{dtype::Row, Order, StrideLayout};

/// Traversal plan for a layout: one inner loop of `bound` elements `step`
/// apart, started from each of the precomputed `offsets`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StrideLoopDescriptor {
    pub bound: usize,
    pub step: usize,
    pub offsets: Vec<usize>,
    pub simd_len: usize,
    /// Largest multiple of `simd_len` not exceeding `bound`.
    pub simd_bound: usize,
}

impl StrideLoopDescriptor {
    pub fn of(layout: &StrideLayout, order: Order, simd_len: usize) -> Self {
        let simd_len = simd_len.max(1);
        if layout.size() == 0 {
            return Self {
                bound: 0,
                step: 1,
                offsets: Vec::new(),
                simd_len,
                simd_bound: 0,
            };
        }
        let compact = layout.compute_fortran_layout(order, true);
        let dims = compact.dims();
        let strides = compact.strides();
        let bound = dims[0];
        let step = strides[0];

        let outer_dims = &dims[1..];
        let outer_strides = &strides[1..];
        let count: usize = outer_dims.iter().product();
        let mut offsets = Vec::with_capacity(count);
        let mut index = vec![0usize; outer_dims.len()];
        let mut ptr = compact.offset();
        for _ in 0..count {
            offsets.push(ptr);
            // odometer, axis 0 of the outer dims turns fastest
            for k in 0..index.len() {
                index[k] += 1;
                ptr += outer_strides[k];
                if index[k] < outer_dims[k] {
                    break;
                }
                ptr -= outer_strides[k] * outer_dims[k];
                index[k] = 0;
            }
        }

        Self {
            bound,
            step,
            offsets,
            simd_len,
            simd_bound: bound - bound % simd_len,
        }
    }

    /// Total number of elements visited.
    pub fn size(&self) -> usize {
        self.bound * self.offsets.len()
    }

    pub fn rows(&self) -> impl Iterator<Item = Row> + '_ {
        self.offsets
            .iter()
            .map(move |&offset| Row::new(offset, self.step, self.bound))
    }
}

/// `offset, offset + step, ...` for `size` steps.
#[derive(Clone, Debug)]
pub struct DensePtrIter {
    ptr: usize,
    step: usize,
    remaining: usize,
}

impl DensePtrIter {
    pub fn new(offset: usize, step: usize, size: usize) -> Self {
        Self {
            ptr: offset,
            step,
            remaining: size,
        }
    }
}

impl Iterator for DensePtrIter {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let ptr = self.ptr;
        self.ptr += self.step;
        self.remaining -= 1;
        Some(ptr)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for DensePtrIter {}

/// Walks a loop descriptor row by row.
#[derive(Clone, Debug)]
pub struct StridePtrIter {
    desc: StrideLoopDescriptor,
    row: usize,
    col: usize,
}

impl StridePtrIter {
    pub fn new(desc: StrideLoopDescriptor) -> Self {
        Self {
            desc,
            row: 0,
            col: 0,
        }
    }

    fn remaining(&self) -> usize {
        if self.row >= self.desc.offsets.len() {
            return 0;
        }
        (self.desc.offsets.len() - self.row) * self.desc.bound - self.col
    }
}

impl Iterator for StridePtrIter {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.desc.bound == 0 {
            return None;
        }
        let base = *self.desc.offsets.get(self.row)?;
        let ptr = base + self.col * self.desc.step;
        self.col += 1;
        if self.col == self.desc.bound {
            self.col = 0;
            self.row += 1;
        }
        Some(ptr)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}

impl ExactSizeIterator for StridePtrIter {}

/// Pointer iterator over every element of a layout.
#[derive(Clone, Debug)]
pub enum PtrIter {
    Dense(DensePtrIter),
    Stride(StridePtrIter),
}

impl PtrIter {
    pub fn new(layout: &StrideLayout, order: Order) -> Self {
        if layout.size() == 0 {
            return Self::Dense(DensePtrIter::new(layout.offset(), 1, 0));
        }
        let compact = layout.compute_fortran_layout(order, true);
        if compact.rank() == 1 {
            return Self::Dense(DensePtrIter::new(
                compact.offset(),
                compact.strides()[0],
                compact.dims()[0],
            ));
        }
        Self::Stride(StridePtrIter::new(StrideLoopDescriptor::of(layout, order, 1)))
    }
}

impl Iterator for PtrIter {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        match self {
            Self::Dense(it) => it.next(),
            Self::Stride(it) => it.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Self::Dense(it) => it.size_hint(),
            Self::Stride(it) => it.size_hint(),
        }
    }
}

impl ExactSizeIterator for PtrIter {}
