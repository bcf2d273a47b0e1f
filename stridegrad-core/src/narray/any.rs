use super::NArray;
use crate::{DType, ElemType, Order, Shape};

/// An array whose element type is only known at runtime.
#[derive(Clone, Debug)]
pub enum AnyNArray {
    Byte(NArray<u8>),
    Int(NArray<i32>),
    Float(NArray<f32>),
    Double(NArray<f64>),
}

macro_rules! dispatch {
    ($self:expr, $a:ident => $body:expr) => {
        match $self {
            AnyNArray::Byte($a) => $body,
            AnyNArray::Int($a) => $body,
            AnyNArray::Float($a) => $body,
            AnyNArray::Double($a) => $body,
        }
    };
}

impl AnyNArray {
    pub fn elem_type(&self) -> ElemType {
        dispatch!(self, a => a.elem_type())
    }

    pub fn shape(&self) -> &Shape {
        dispatch!(self, a => a.shape())
    }

    /// Every element in C order, widened to `f64`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        dispatch!(self, a => a.to_vec(Order::C).iter().map(|x| x.to_f64()).collect())
    }

    pub fn cast_f64(&self) -> NArray<f64> {
        dispatch!(self, a => a.cast::<f64>())
    }
}

macro_rules! any_from {
    ($t:ty, $variant:ident) => {
        impl From<NArray<$t>> for AnyNArray {
            fn from(a: NArray<$t>) -> Self {
                AnyNArray::$variant(a)
            }
        }
    };
}

any_from!(u8, Byte);
any_from!(i32, Int);
any_from!(f32, Float);
any_from!(f64, Double);
