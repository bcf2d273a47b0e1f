use std::marker::PhantomData;

use rand::{distr::Distribution, Rng};

use crate::{AnyNArray, DType, ElemType, NArray, Order, Result, Shape, Storage, StrideLayout};

/// Array factory for one element type.
///
/// ```
/// use stridegrad_core::{Manager, Order};
///
/// let m = Manager::<f64>::new();
/// let a = m.seq([2, 3], Order::C);
/// assert_eq!(a.get(&[1, 0]).unwrap(), 3.0);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Manager<T: DType> {
    _ty: PhantomData<T>,
}

impl<T: DType> Manager<T> {
    pub fn new() -> Self {
        Self { _ty: PhantomData }
    }

    pub fn elem_type(&self) -> ElemType {
        T::ELEM
    }

    pub fn zeros(&self, shape: impl Into<Shape>, order: Order) -> NArray<T> {
        NArray::zeros(shape, order)
    }

    pub fn ones(&self, shape: impl Into<Shape>, order: Order) -> NArray<T> {
        NArray::ones(shape, order)
    }

    pub fn full(&self, shape: impl Into<Shape>, value: T, order: Order) -> NArray<T> {
        NArray::full(shape, value, order)
    }

    /// `0, 1, 2, ...` laid out in `order`. Bytes wrap after 255.
    pub fn seq(&self, shape: impl Into<Shape>, order: Order) -> NArray<T> {
        let shape = shape.into();
        let mut next = T::ZERO;
        let data = (0..shape.size())
            .map(|_| {
                let v = next;
                next = next.add_elem(T::ONE);
                v
            })
            .collect();
        self.layout_data(data, shape, order)
    }

    /// Uniform samples: `[0, 1)` for floating point types, the full value
    /// range for integral types.
    pub fn random<R: Rng + ?Sized>(
        &self,
        shape: impl Into<Shape>,
        rng: &mut R,
        order: Order,
    ) -> NArray<T> {
        let shape = shape.into();
        let data = (0..shape.size()).map(|_| T::sample_uniform(rng)).collect();
        self.layout_data(data, shape, order)
    }

    /// Samples from any `f64` distribution, converted to `T`.
    pub fn random_from<D, R>(
        &self,
        shape: impl Into<Shape>,
        distribution: &D,
        rng: &mut R,
        order: Order,
    ) -> NArray<T>
    where
        D: Distribution<f64> + ?Sized,
        R: Rng + ?Sized,
    {
        let shape = shape.into();
        let data = (0..shape.size())
            .map(|_| T::from_sample(distribution.sample(rng)))
            .collect();
        self.layout_data(data, shape, order)
    }

    fn layout_data(&self, data: Vec<T>, shape: Shape, order: Order) -> NArray<T> {
        NArray::from_parts(Storage::from_vec(data), StrideLayout::of_order(shape, 0, order))
    }

    /// Wraps an existing buffer with an explicit layout, without copying.
    pub fn stride(&self, layout: StrideLayout, storage: Storage<T>) -> Result<NArray<T>> {
        NArray::stride(layout, storage)
    }

    /// Takes ownership of `data` as a canonical array in `order`.
    pub fn wrap(&self, data: Vec<T>, shape: impl Into<Shape>, order: Order) -> Result<NArray<T>> {
        NArray::from_vec(data, shape, order)
    }

    pub fn concat(&self, axis: usize, arrays: &[&NArray<T>]) -> Result<NArray<T>> {
        NArray::concat(axis, arrays)
    }

    pub fn stack(&self, axis: usize, arrays: &[&NArray<T>]) -> Result<NArray<T>> {
        NArray::stack(axis, arrays)
    }
}

macro_rules! by_tag {
    ($elem:expr, $m:ident => $body:expr) => {
        match $elem {
            ElemType::Byte => {
                let $m = Manager::<u8>::new();
                AnyNArray::Byte($body)
            }
            ElemType::Int => {
                let $m = Manager::<i32>::new();
                AnyNArray::Int($body)
            }
            ElemType::Float => {
                let $m = Manager::<f32>::new();
                AnyNArray::Float($body)
            }
            ElemType::Double => {
                let $m = Manager::<f64>::new();
                AnyNArray::Double($body)
            }
        }
    };
}

/// Zeros of the element type named by `elem`.
pub fn zeros_of(elem: ElemType, shape: impl Into<Shape>, order: Order) -> AnyNArray {
    let shape = shape.into();
    by_tag!(elem, m => m.zeros(shape, order))
}

pub fn seq_of(elem: ElemType, shape: impl Into<Shape>, order: Order) -> AnyNArray {
    let shape = shape.into();
    by_tag!(elem, m => m.seq(shape, order))
}
