use super::{BinaryOpType, DTypeOps, UnaryOpType};

/// One row of a traversal: `len` elements starting at `offset`, `step` apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Row {
    pub offset: usize,
    pub step: usize,
    pub len: usize,
}

impl Row {
    pub fn new(offset: usize, step: usize, len: usize) -> Self {
        Self { offset, step, len }
    }

    #[inline(always)]
    fn is_unit(&self) -> bool {
        self.step == 1
    }

    #[inline(always)]
    fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Lane-blocked row kernels.
///
/// Every kernel processes full blocks of `LANES` elements first and then the
/// scalar remainder, in index order. Unit-step rows work on contiguous
/// slices, other rows gather through the step.
pub trait SimdSupported: DTypeOps {
    const LANES: usize;

    /// `lhs[l] = op(lhs[l], rhs[r])` for the paired rows.
    fn binary_row(lhs: &mut [Self], l: Row, rhs: &[Self], r: Row, op: BinaryOpType);

    /// `buf[i] = op(buf[i], rhs)` along the row.
    fn binary_scalar_row(buf: &mut [Self], row: Row, rhs: Self, op: BinaryOpType);

    fn unary_row(buf: &mut [Self], row: Row, op: UnaryOpType);

    fn assign_row(dst: &mut [Self], d: Row, src: &[Self], s: Row);

    fn fill_row(buf: &mut [Self], row: Row, value: Self);

    fn sum_row(buf: &[Self], row: Row) -> Self;
}

#[inline(always)]
fn lanes_binary<T: DTypeOps, const L: usize, F: Fn(T, T) -> T>(lhs: &mut [T], rhs: &[T], f: F) {
    let mut l_chunks = lhs.chunks_exact_mut(L);
    let mut r_chunks = rhs.chunks_exact(L);
    for (lc, rc) in (&mut l_chunks).zip(&mut r_chunks) {
        for j in 0..L {
            lc[j] = f(lc[j], rc[j]);
        }
    }
    for (x, y) in l_chunks
        .into_remainder()
        .iter_mut()
        .zip(r_chunks.remainder())
    {
        *x = f(*x, *y);
    }
}

#[inline(always)]
fn lanes_binary_strided<T: DTypeOps, const L: usize, F: Fn(T, T) -> T>(
    lhs: &mut [T],
    l: Row,
    rhs: &[T],
    r: Row,
    f: F,
) {
    let blocks = l.len / L;
    for b in 0..blocks {
        let base = b * L;
        for j in 0..L {
            let li = l.offset + (base + j) * l.step;
            let ri = r.offset + (base + j) * r.step;
            lhs[li] = f(lhs[li], rhs[ri]);
        }
    }
    for i in blocks * L..l.len {
        let li = l.offset + i * l.step;
        let ri = r.offset + i * r.step;
        lhs[li] = f(lhs[li], rhs[ri]);
    }
}

#[inline(always)]
fn lanes_map<T: DTypeOps, const L: usize, F: Fn(T) -> T>(buf: &mut [T], row: Row, f: F) {
    if row.is_unit() {
        let mut chunks = buf[row.range()].chunks_exact_mut(L);
        for c in &mut chunks {
            for x in c.iter_mut() {
                *x = f(*x);
            }
        }
        for x in chunks.into_remainder() {
            *x = f(*x);
        }
    } else {
        for i in 0..row.len {
            let idx = row.offset + i * row.step;
            buf[idx] = f(buf[idx]);
        }
    }
}

#[inline(always)]
fn lanes_sum<T: DTypeOps, const L: usize>(buf: &[T], row: Row, zero: T) -> T {
    let mut acc = [zero; L];
    let blocks = row.len / L;
    if row.is_unit() {
        let slice = &buf[row.range()];
        for c in slice.chunks_exact(L) {
            for j in 0..L {
                acc[j] = acc[j].add_elem(c[j]);
            }
        }
    } else {
        for b in 0..blocks {
            for (j, a) in acc.iter_mut().enumerate() {
                *a = a.add_elem(buf[row.offset + (b * L + j) * row.step]);
            }
        }
    }
    let mut total = acc.iter().fold(zero, |s, x| s.add_elem(*x));
    for i in blocks * L..row.len {
        total = total.add_elem(buf[row.offset + i * row.step]);
    }
    total
}

fn binary_row_dispatch<T: DTypeOps, const L: usize>(
    lhs: &mut [T],
    l: Row,
    rhs: &[T],
    r: Row,
    op: BinaryOpType,
) {
    macro_rules! run {
        ($f:expr) => {
            if l.is_unit() && r.is_unit() {
                lanes_binary::<T, L, _>(&mut lhs[l.range()], &rhs[r.range()], $f)
            } else {
                lanes_binary_strided::<T, L, _>(lhs, l, rhs, r, $f)
            }
        };
    }
    match op {
        BinaryOpType::Add => run!(T::add_elem),
        BinaryOpType::Sub => run!(T::sub_elem),
        BinaryOpType::Mul => run!(T::mul_elem),
        BinaryOpType::Div => run!(T::div_elem),
        BinaryOpType::Max => run!(T::max_elem),
        BinaryOpType::Min => run!(T::min_elem),
    }
}

fn binary_scalar_dispatch<T: DTypeOps, const L: usize>(
    buf: &mut [T],
    row: Row,
    rhs: T,
    op: BinaryOpType,
) {
    match op {
        BinaryOpType::Add => lanes_map::<T, L, _>(buf, row, |x| x.add_elem(rhs)),
        BinaryOpType::Sub => lanes_map::<T, L, _>(buf, row, |x| x.sub_elem(rhs)),
        BinaryOpType::Mul => lanes_map::<T, L, _>(buf, row, |x| x.mul_elem(rhs)),
        BinaryOpType::Div => lanes_map::<T, L, _>(buf, row, |x| x.div_elem(rhs)),
        BinaryOpType::Max => lanes_map::<T, L, _>(buf, row, |x| x.max_elem(rhs)),
        BinaryOpType::Min => lanes_map::<T, L, _>(buf, row, |x| x.min_elem(rhs)),
    }
}

fn unary_dispatch<T: DTypeOps, const L: usize>(buf: &mut [T], row: Row, op: UnaryOpType) {
    match op {
        UnaryOpType::Neg => lanes_map::<T, L, _>(buf, row, T::neg_elem),
        UnaryOpType::Sqrt => lanes_map::<T, L, _>(buf, row, |x| x.sqrt()),
        UnaryOpType::Exp => lanes_map::<T, L, _>(buf, row, T::exp_elem),
        UnaryOpType::Log => lanes_map::<T, L, _>(buf, row, T::ln_elem),
        UnaryOpType::Abs => lanes_map::<T, L, _>(buf, row, T::abs_elem),
        UnaryOpType::Pow(p) => lanes_map::<T, L, _>(buf, row, |x| x.powf_elem(p)),
    }
}

fn assign_dispatch<T: DTypeOps, const L: usize>(dst: &mut [T], d: Row, src: &[T], s: Row) {
    if d.is_unit() && s.is_unit() {
        dst[d.range()].copy_from_slice(&src[s.range()]);
    } else {
        lanes_binary_strided::<T, L, _>(dst, d, src, s, |_, y| y);
    }
}

macro_rules! simd_supported {
    ($t:ident, $lanes:expr) => {
        impl SimdSupported for $t {
            const LANES: usize = $lanes;

            fn binary_row(lhs: &mut [Self], l: Row, rhs: &[Self], r: Row, op: BinaryOpType) {
                debug_assert_eq!(l.len, r.len);
                binary_row_dispatch::<$t, $lanes>(lhs, l, rhs, r, op)
            }

            fn binary_scalar_row(buf: &mut [Self], row: Row, rhs: Self, op: BinaryOpType) {
                binary_scalar_dispatch::<$t, $lanes>(buf, row, rhs, op)
            }

            fn unary_row(buf: &mut [Self], row: Row, op: UnaryOpType) {
                unary_dispatch::<$t, $lanes>(buf, row, op)
            }

            fn assign_row(dst: &mut [Self], d: Row, src: &[Self], s: Row) {
                debug_assert_eq!(d.len, s.len);
                assign_dispatch::<$t, $lanes>(dst, d, src, s)
            }

            fn fill_row(buf: &mut [Self], row: Row, value: Self) {
                if row.is_unit() {
                    buf[row.range()].fill(value);
                } else {
                    lanes_map::<$t, $lanes, _>(buf, row, |_| value)
                }
            }

            fn sum_row(buf: &[Self], row: Row) -> Self {
                lanes_sum::<$t, $lanes>(buf, row, <$t>::default())
            }
        }
    };
}

simd_supported!(u8, 32);
simd_supported!(i32, 8);
simd_supported!(f32, 8);
simd_supported!(f64, 4);
