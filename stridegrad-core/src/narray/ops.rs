use super::NArray;
use crate::{
    dtype::{BinaryOpType, MatView, UnaryOpType},
    DType, Error, Order, Result,
};

macro_rules! binary_ops {
    ($($inplace:ident, $fresh:ident, $scalar_inplace:ident, $scalar_fresh:ident => $op:ident;)*) => {
        $(
            /// In place, elementwise. Shapes must be equal.
            pub fn $inplace(&self, other: &Self) -> Result<&Self> {
                self.binary_(stringify!($inplace), other, BinaryOpType::$op)
            }

            pub fn $fresh(&self, other: &Self) -> Result<Self> {
                self.check_same_shape(stringify!($fresh), other)?;
                let out = self.copy(Order::C);
                out.binary_(stringify!($fresh), other, BinaryOpType::$op)?;
                Ok(out)
            }

            pub fn $scalar_inplace(&self, value: T) -> &Self {
                self.for_each_row_mut(|data, row| {
                    T::binary_scalar_row(data, row, value, BinaryOpType::$op)
                });
                self
            }

            pub fn $scalar_fresh(&self, value: T) -> Self {
                let out = self.copy(Order::C);
                out.$scalar_inplace(value);
                out
            }
        )*
    };
}

macro_rules! unary_ops {
    ($($inplace:ident, $fresh:ident => $op:expr;)*) => {
        $(
            pub fn $inplace(&self) -> &Self {
                self.unary_($op)
            }

            pub fn $fresh(&self) -> Self {
                let out = self.copy(Order::C);
                out.unary_($op);
                out
            }
        )*
    };
}

impl<T: DType> NArray<T> {
    binary_ops! {
        add_, add, add_scalar_, add_scalar => Add;
        sub_, sub, sub_scalar_, sub_scalar => Sub;
        mul_, mul, mul_scalar_, mul_scalar => Mul;
        div_, div, div_scalar_, div_scalar => Div;
        max_, maximum, max_scalar_, max_scalar => Max;
        min_, minimum, min_scalar_, min_scalar => Min;
    }

    unary_ops! {
        sqrt_, sqrt => UnaryOpType::Sqrt;
        neg_, neg => UnaryOpType::Neg;
        exp_, exp => UnaryOpType::Exp;
        log_, log => UnaryOpType::Log;
        abs_, abs => UnaryOpType::Abs;
    }

    fn unary_(&self, op: UnaryOpType) -> &Self {
        self.for_each_row_mut(|data, row| T::unary_row(data, row, op));
        self
    }

    pub fn pow_(&self, p: f64) -> &Self {
        self.unary_(UnaryOpType::Pow(p))
    }

    pub fn pow(&self, p: f64) -> Self {
        let out = self.copy(Order::C);
        out.pow_(p);
        out
    }

    /// Matrix product of two rank 2 arrays into fresh C-ordered storage.
    pub fn mm(&self, other: &Self) -> Result<Self> {
        if self.rank() != 2 || other.rank() != 2 || self.dims()[1] != other.dims()[0] {
            return Err(Error::shape_mismatch("mm", self.dims(), other.dims()));
        }
        let (m, k, n) = (self.dims()[0], self.dims()[1], other.dims()[1]);
        let out = Self::zeros([m, n], Order::C);
        if m == 0 || n == 0 || k == 0 {
            return Ok(out);
        }
        // broadcast axes are materialized before reaching the kernel
        let lhs = if self.layout().strides().contains(&0) {
            self.copy(Order::C)
        } else {
            self.clone()
        };
        let rhs = if other.layout().strides().contains(&0) {
            other.copy(Order::C)
        } else {
            other.clone()
        };
        let view = |a: &Self| MatView {
            offset: a.layout().offset(),
            rs: a.layout().strides()[0],
            cs: a.layout().strides()[1],
        };
        let out_view = view(&out);
        let mut dst = out.storage().write();
        if lhs.storage().ptr_eq(rhs.storage()) {
            let src = lhs.storage().read();
            T::launch_gemm(&src, view(&lhs), &src, view(&rhs), m, n, k, &mut dst, out_view);
        } else {
            let l = lhs.storage().read();
            let r = rhs.storage().read();
            T::launch_gemm(&l, view(&lhs), &r, view(&rhs), m, n, k, &mut dst, out_view);
        }
        drop(dst);
        Ok(out)
    }
}
