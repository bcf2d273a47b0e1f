use std::fmt::{Debug, Display};

pub use self::gemm::{GemmDispatch, MatView};
pub use self::rand::RandDispatch;
pub use self::simd_ops::{Row, SimdSupported};

mod gemm;
mod rand;
mod simd_ops;

/// Runtime tag for the element type of an array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElemType {
    Byte,
    Int,
    Float,
    Double,
}

impl ElemType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Int => "int",
            Self::Float => "float",
            Self::Double => "double",
        }
    }

    /// Size of one element in bytes.
    pub fn size_of(&self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Int | Self::Float => 4,
            Self::Double => 8,
        }
    }

    pub fn is_floating_point(&self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }
}

impl Display for ElemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Type which can be square-rooted.
/// If self<0 and Self is integral, then the output is 0
pub trait Sqrtable {
    fn sqrt(&self) -> Self
    where
        Self: Sized;
}

impl Sqrtable for f32 {
    fn sqrt(&self) -> Self
    where
        Self: Sized,
    {
        f32::sqrt(*self)
    }
}

impl Sqrtable for f64 {
    fn sqrt(&self) -> Self
    where
        Self: Sized,
    {
        f64::sqrt(*self)
    }
}

macro_rules! sqrt_integral {
    ($t:ty) => {
        impl Sqrtable for $t {
            fn sqrt(&self) -> Self
            where
                Self: Sized,
            {
                (*self as f64).sqrt() as $t
            }
        }
    };
}

sqrt_integral!(u8);
sqrt_integral!(i32);

/// Scalar arithmetic for one element type.
///
/// Integral types wrap on overflow (bytes behave like unsigned 8-bit
/// registers); transcendental functions go through `f64` and truncate back.
pub trait DTypeOps: Copy + PartialOrd + Sqrtable {
    fn add_elem(self, rhs: Self) -> Self;
    fn sub_elem(self, rhs: Self) -> Self;
    fn mul_elem(self, rhs: Self) -> Self;
    /// Integral division by zero panics, as it does for Rust integers.
    fn div_elem(self, rhs: Self) -> Self;
    fn neg_elem(self) -> Self;
    fn abs_elem(self) -> Self;
    fn exp_elem(self) -> Self;
    fn ln_elem(self) -> Self;
    fn powf_elem(self, p: f64) -> Self;

    fn max_elem(self, rhs: Self) -> Self {
        if rhs > self {
            rhs
        } else {
            self
        }
    }

    fn min_elem(self, rhs: Self) -> Self {
        if rhs < self {
            rhs
        } else {
            self
        }
    }
}

macro_rules! dtype_ops_integral {
    ($t:ident, $abs:expr) => {
        impl DTypeOps for $t {
            #[inline(always)]
            fn add_elem(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }
            #[inline(always)]
            fn sub_elem(self, rhs: Self) -> Self {
                self.wrapping_sub(rhs)
            }
            #[inline(always)]
            fn mul_elem(self, rhs: Self) -> Self {
                self.wrapping_mul(rhs)
            }
            #[inline(always)]
            fn div_elem(self, rhs: Self) -> Self {
                self.wrapping_div(rhs)
            }
            #[inline(always)]
            fn neg_elem(self) -> Self {
                self.wrapping_neg()
            }
            #[inline(always)]
            fn abs_elem(self) -> Self {
                let abs: fn($t) -> $t = $abs;
                abs(self)
            }
            fn exp_elem(self) -> Self {
                (self as f64).exp() as $t
            }
            fn ln_elem(self) -> Self {
                (self as f64).ln() as $t
            }
            fn powf_elem(self, p: f64) -> Self {
                (self as f64).powf(p) as $t
            }
        }
    };
}

macro_rules! dtype_ops_float {
    ($t:ident) => {
        impl DTypeOps for $t {
            #[inline(always)]
            fn add_elem(self, rhs: Self) -> Self {
                self + rhs
            }
            #[inline(always)]
            fn sub_elem(self, rhs: Self) -> Self {
                self - rhs
            }
            #[inline(always)]
            fn mul_elem(self, rhs: Self) -> Self {
                self * rhs
            }
            #[inline(always)]
            fn div_elem(self, rhs: Self) -> Self {
                self / rhs
            }
            #[inline(always)]
            fn neg_elem(self) -> Self {
                -self
            }
            #[inline(always)]
            fn abs_elem(self) -> Self {
                self.abs()
            }
            fn exp_elem(self) -> Self {
                self.exp()
            }
            fn ln_elem(self) -> Self {
                self.ln()
            }
            fn powf_elem(self, p: f64) -> Self {
                (self as f64).powf(p) as $t
            }
        }
    };
}

dtype_ops_integral!(u8, |x| x);
dtype_ops_integral!(i32, |x: i32| x.wrapping_abs());
dtype_ops_float!(f32);
dtype_ops_float!(f64);

pub(crate) mod private {
    pub trait Sealed {}

    impl Sealed for u8 {}
    impl Sealed for i32 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// Marker trait for array element types: `u8`, `i32`, `f32` and `f64`.
pub trait DType:
    Debug
    + Display
    + Clone
    + Copy
    + PartialEq
    + DTypeOps
    + SimdSupported
    + GemmDispatch
    + RandDispatch
    + Send
    + Sync
    + private::Sealed
    + 'static
{
    const ZERO: Self;
    const ONE: Self;
    const NAME: &'static str;
    const ELEM: ElemType;
    const INTEGRAL: bool;

    fn to_f64(&self) -> f64;
    fn from_f64(x: f64) -> Self;
}

macro_rules! dtype {
    ($rt:ident, $zero:expr, $one:expr, $elem:expr, $integral:expr) => {
        impl DType for $rt {
            const ZERO: $rt = $zero;
            const ONE: $rt = $one;
            const NAME: &'static str = stringify!($rt);
            const ELEM: ElemType = $elem;
            const INTEGRAL: bool = $integral;

            fn to_f64(&self) -> f64 {
                *self as f64
            }
            fn from_f64(x: f64) -> Self {
                x as $rt
            }
        }
    };
}

dtype!(u8, 0u8, 1u8, ElemType::Byte, true);
dtype!(i32, 0i32, 1i32, ElemType::Int, true);
dtype!(f32, 0f32, 1f32, ElemType::Float, false);
dtype!(f64, 0f64, 1f64, ElemType::Double, false);

/// Floating point element types, the only ones optimizers accept.
pub trait FloatDType: DType {}

impl FloatDType for f32 {}
impl FloatDType for f64 {}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum BinaryOpType {
    Add,
    Div,
    Sub,
    Mul,
    Max,
    Min,
}

impl BinaryOpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Div => "/",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Max => "max",
            Self::Min => "min",
        }
    }

    #[inline(always)]
    pub fn apply<T: DTypeOps>(&self, x: T, y: T) -> T {
        match self {
            Self::Add => x.add_elem(y),
            Self::Div => x.div_elem(y),
            Self::Sub => x.sub_elem(y),
            Self::Mul => x.mul_elem(y),
            Self::Max => x.max_elem(y),
            Self::Min => x.min_elem(y),
        }
    }
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum UnaryOpType {
    Neg,
    Sqrt,
    Exp,
    Log,
    Abs,
    Pow(f64),
}

impl UnaryOpType {
    #[inline(always)]
    pub fn apply<T: DTypeOps>(&self, x: T) -> T {
        match self {
            Self::Neg => x.neg_elem(),
            Self::Sqrt => x.sqrt(),
            Self::Exp => x.exp_elem(),
            Self::Log => x.ln_elem(),
            Self::Abs => x.abs_elem(),
            Self::Pow(p) => x.powf_elem(*p),
        }
    }
}
