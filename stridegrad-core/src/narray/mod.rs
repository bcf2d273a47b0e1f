//! Strided views over shared storage.
//!
//! An [`NArray`] pairs a [`Storage`] with a [`StrideLayout`]. Views created by
//! `narrow`, `permute`, `reshape` and friends share the storage of their
//! source, so writes through one alias are visible through all of them.
//! Operations that document a copy (`copy`, `pad`, `concat`, out-of-place
//! arithmetic) always allocate fresh C-ordered storage.

use std::fmt::Debug;

use crate::{
    dtype::{BinaryOpType, Row},
    iterators::{PtrIter, StrideLoopDescriptor},
    DType, ElemType, Error, Order, Result, Shape, Storage, StrideLayout,
};

mod any;
mod combine;
mod ops;
mod reduce;
mod views;

pub use any::AnyNArray;

pub struct NArray<T: DType> {
    storage: Storage<T>,
    layout: StrideLayout,
}

impl<T: DType> Clone for NArray<T> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            layout: self.layout.clone(),
        }
    }
}

impl<T: DType> Debug for NArray<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NArray")
            .field("dtype", &T::ELEM)
            .field("shape", &self.layout.dims())
            .field("offset", &self.layout.offset())
            .field("strides", &self.layout.strides())
            .finish()
    }
}

impl<T: DType> NArray<T> {
    /// Wraps `storage` with an explicit layout. Every reachable offset must be
    /// inside the storage.
    pub fn stride(layout: StrideLayout, storage: Storage<T>) -> Result<Self> {
        if let Some(max) = layout.max_pointer() {
            if max >= storage.len() {
                return Err(Error::out_of_bounds(
                    "stride",
                    format!(
                        "layout reaches offset {max}, storage has length {}",
                        storage.len()
                    ),
                ));
            }
        }
        Ok(Self { storage, layout })
    }

    /// Canonical layouts over a buffer of exactly their size.
    pub(crate) fn from_parts(storage: Storage<T>, layout: StrideLayout) -> Self {
        debug_assert_eq!(storage.len(), layout.size());
        Self { storage, layout }
    }

    /// A view derived from this one. Derived layouts never leave the storage.
    pub(crate) fn with_layout(&self, layout: StrideLayout) -> Self {
        Self {
            storage: self.storage.clone(),
            layout,
        }
    }

    /// Takes ownership of `data`, laid out canonically in `order`.
    pub fn from_vec(data: Vec<T>, shape: impl Into<Shape>, order: Order) -> Result<Self> {
        let shape = shape.into();
        if data.len() != shape.size() {
            return Err(Error::shape_mismatch("from_vec", shape.dims(), &[data.len()]));
        }
        Ok(Self {
            layout: StrideLayout::of_order(shape, 0, order),
            storage: Storage::from_vec(data),
        })
    }

    pub fn full(shape: impl Into<Shape>, value: T, order: Order) -> Self {
        let shape = shape.into();
        Self {
            storage: Storage::full(shape.size(), value),
            layout: StrideLayout::of_order(shape, 0, order),
        }
    }

    pub fn zeros(shape: impl Into<Shape>, order: Order) -> Self {
        Self::full(shape, T::ZERO, order)
    }

    pub fn ones(shape: impl Into<Shape>, order: Order) -> Self {
        Self::full(shape, T::ONE, order)
    }

    /// Rank 0 array holding one value.
    pub fn scalar(value: T) -> Self {
        Self::full(Shape::scalar(), value, Order::C)
    }

    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.shape().clone(), Order::C)
    }

    pub fn ones_like(&self) -> Self {
        Self::ones(self.shape().clone(), Order::C)
    }

    pub fn elem_type(&self) -> ElemType {
        T::ELEM
    }

    pub fn storage(&self) -> &Storage<T> {
        &self.storage
    }

    pub fn layout(&self) -> &StrideLayout {
        &self.layout
    }

    pub fn shape(&self) -> &Shape {
        self.layout.shape()
    }

    pub fn dims(&self) -> &[usize] {
        self.layout.dims()
    }

    pub fn dim(&self, axis: usize) -> Result<usize> {
        self.layout.dim(axis)
    }

    pub fn rank(&self) -> usize {
        self.layout.rank()
    }

    pub fn size(&self) -> usize {
        self.layout.size()
    }

    pub fn get(&self, index: &[usize]) -> Result<T> {
        let ptr = self.layout.pointer(index)?;
        self.storage.get(ptr)
    }

    pub fn set(&self, index: &[usize], value: T) -> Result<()> {
        let ptr = self.layout.pointer(index)?;
        self.storage.set(ptr, value)
    }

    /// The only element of a size 1 array.
    pub fn item(&self) -> Result<T> {
        if self.size() != 1 {
            return Err(Error::shape_mismatch("item", self.dims(), &[1]));
        }
        // every axis has dim 1, so the element sits at the offset
        self.storage.get(self.layout.offset())
    }

    /// Resolves `Auto` for this layout and picks C or F for `Storage`.
    fn logical_order(&self, order: Order) -> Order {
        match self.layout.resolve(order) {
            Order::Storage => self.layout.storage_fast_order().alloc_order(),
            other => other,
        }
    }

    pub fn iter_ptr(&self, order: Order) -> PtrIter {
        PtrIter::new(&self.layout, self.layout.resolve(order))
    }

    pub fn loop_descriptor(&self, order: Order) -> StrideLoopDescriptor {
        StrideLoopDescriptor::of(&self.layout, self.layout.resolve(order), T::LANES)
    }

    /// Every element, visited in `order`.
    pub fn to_vec(&self, order: Order) -> Vec<T> {
        let data = self.storage.read();
        self.iter_ptr(order).map(|p| data[p]).collect()
    }

    /// Fresh canonical storage holding the same values.
    pub fn copy(&self, order: Order) -> Self {
        let order = self.logical_order(order);
        Self {
            storage: Storage::from_vec(self.to_vec(order)),
            layout: StrideLayout::of_order(self.shape().clone(), 0, order),
        }
    }

    pub(crate) fn check_same_shape(&self, op: &'static str, other: &Self) -> Result<()> {
        if self.dims() != other.dims() {
            return Err(Error::shape_mismatch(op, self.dims(), other.dims()));
        }
        Ok(())
    }

    /// Visits the paired elements of `self` and `other` in the same logical
    /// order, with a write lock on `self`.
    ///
    /// Rows are handed to `rows` when both traversals split into the same row
    /// structure, otherwise single elements go through `elem`.
    pub(crate) fn zip_with(
        &self,
        other: &Self,
        rows: impl Fn(&mut [T], Row, &[T], Row),
        elem: impl Fn(T, T) -> T,
    ) {
        if self.size() == 0 {
            return;
        }
        // A shared buffer would need both locks at once.
        let other = if self.storage.ptr_eq(&other.storage) {
            other.copy(Order::C)
        } else {
            other.clone()
        };
        let order = self.layout.storage_fast_order().alloc_order();
        let ld = self.loop_descriptor(order);
        let rd = other.loop_descriptor(order);

        let mut dst = self.storage.write();
        let src = other.storage.read();
        if ld.bound == rd.bound && ld.offsets.len() == rd.offsets.len() {
            for (l, r) in ld.rows().zip(rd.rows()) {
                rows(&mut dst[..], l, &src[..], r);
            }
        } else {
            for (l, r) in self.iter_ptr(order).zip(other.iter_ptr(order)) {
                dst[l] = elem(dst[l], src[r]);
            }
        }
    }

    /// Runs `rows` over every row of this array, in storage order.
    pub(crate) fn for_each_row_mut(&self, rows: impl Fn(&mut [T], Row)) {
        let desc = self.loop_descriptor(Order::Storage);
        let mut data = self.storage.write();
        for row in desc.rows() {
            rows(&mut data[..], row);
        }
    }

    pub(crate) fn fold_rows<A>(&self, init: A, f: impl Fn(A, &[T], Row) -> A) -> A {
        let desc = self.loop_descriptor(Order::Storage);
        let data = self.storage.read();
        desc.rows().fold(init, |acc, row| f(acc, &data[..], row))
    }

    /// Elementwise copy of `src` into this view.
    pub fn assign_(&self, src: &Self) -> Result<()> {
        self.check_same_shape("assign_", src)?;
        self.zip_with(src, |d, dr, s, sr| T::assign_row(d, dr, s, sr), |_, y| y);
        Ok(())
    }

    pub fn fill_(&self, value: T) -> &Self {
        self.for_each_row_mut(|data, row| T::fill_row(data, row, value));
        self
    }

    pub(crate) fn binary_(
        &self,
        op_name: &'static str,
        other: &Self,
        op: BinaryOpType,
    ) -> Result<&Self> {
        self.check_same_shape(op_name, other)?;
        self.zip_with(
            other,
            |d, dr, s, sr| T::binary_row(d, dr, s, sr, op),
            |x, y| op.apply(x, y),
        );
        Ok(self)
    }

    /// Converts every element through `f64`.
    pub fn cast<U: DType>(&self) -> NArray<U> {
        let data = self
            .to_vec(Order::C)
            .into_iter()
            .map(|x| U::from_f64(x.to_f64()))
            .collect();
        NArray {
            storage: Storage::from_vec(data),
            layout: StrideLayout::of_order(self.shape().clone(), 0, Order::C),
        }
    }

    /// Same shape and equal elements. NaN is never equal to anything.
    pub fn deep_eq(&self, other: &Self) -> bool {
        self.dims() == other.dims()
            && self
                .to_vec(Order::C)
                .iter()
                .zip(other.to_vec(Order::C))
                .all(|(a, b)| *a == b)
    }

    /// Same shape and elements within `tol` of each other.
    pub fn allclose(&self, other: &Self, tol: f64) -> bool {
        self.dims() == other.dims()
            && self
                .to_vec(Order::C)
                .iter()
                .zip(other.to_vec(Order::C))
                .all(|(a, b)| *a == b || (a.to_f64() - b.to_f64()).abs() <= tol)
    }
}
