use gemm::{gemm, Parallelism};

use super::SimdSupported;

/// Strided view of one rank-2 operand inside a flat buffer.
#[derive(Clone, Copy, Debug)]
pub struct MatView {
    pub offset: usize,
    /// Row stride.
    pub rs: usize,
    /// Column stride.
    pub cs: usize,
}

pub trait GemmDispatch {
    /// Matrix multiplication: (M x K) * (K x N) = (M x N).
    ///
    /// `out` is overwritten. The caller guarantees every addressed element is
    /// in bounds of its buffer.
    #[allow(clippy::too_many_arguments)]
    fn launch_gemm(
        lhs: &[Self],
        lhs_view: MatView,
        rhs: &[Self],
        rhs_view: MatView,
        m: usize,
        n: usize,
        k: usize,
        out: &mut [Self],
        out_view: MatView,
    ) where
        Self: Sized;
}

fn check_bounds(len: usize, view: MatView, rows: usize, cols: usize) {
    let last = view.offset + (rows - 1) * view.rs + (cols - 1) * view.cs;
    assert!(last < len, "gemm operand out of bounds: {last} >= {len}");
}

/// Naive kernel for integral types, blocked along `n` by the lane width.
#[allow(clippy::too_many_arguments)]
fn naive_gemm<T: SimdSupported>(
    lhs: &[T],
    l: MatView,
    rhs: &[T],
    r: MatView,
    m: usize,
    n: usize,
    k: usize,
    out: &mut [T],
    o: MatView,
    zero: T,
) {
    let lanes = T::LANES;
    for i in 0..m {
        let mut j0 = 0;
        while j0 < n {
            let width = lanes.min(n - j0);
            for j in j0..j0 + width {
                let mut acc = zero;
                for p in 0..k {
                    let a = lhs[l.offset + i * l.rs + p * l.cs];
                    let b = rhs[r.offset + p * r.rs + j * r.cs];
                    acc = acc.add_elem(a.mul_elem(b));
                }
                out[o.offset + i * o.rs + j * o.cs] = acc;
            }
            j0 += width;
        }
    }
}

macro_rules! instantiate_gemm {
    ($rt:ident, $zero:expr, NAIVE) => {
        impl GemmDispatch for $rt {
            fn launch_gemm(
                lhs: &[Self],
                lhs_view: MatView,
                rhs: &[Self],
                rhs_view: MatView,
                m: usize,
                n: usize,
                k: usize,
                out: &mut [Self],
                out_view: MatView,
            ) {
                naive_gemm::<$rt>(lhs, lhs_view, rhs, rhs_view, m, n, k, out, out_view, $zero)
            }
        }
    };

    ($rt:ident, $zero:expr, GEMM) => {
        impl GemmDispatch for $rt {
            fn launch_gemm(
                lhs: &[Self],
                lhs_view: MatView,
                rhs: &[Self],
                rhs_view: MatView,
                m: usize,
                n: usize,
                k: usize,
                out: &mut [Self],
                out_view: MatView,
            ) {
                if m == 0 || n == 0 {
                    return;
                }
                if k == 0 {
                    for i in 0..m {
                        for j in 0..n {
                            out[out_view.offset + i * out_view.rs + j * out_view.cs] = $zero;
                        }
                    }
                    return;
                }
                check_bounds(lhs.len(), lhs_view, m, k);
                check_bounds(rhs.len(), rhs_view, k, n);
                check_bounds(out.len(), out_view, m, n);

                let num_threads = num_cpus::get();
                let parallelism = if num_threads > 1 {
                    Parallelism::Rayon(num_threads)
                } else {
                    Parallelism::None
                };

                let lhs_p = &lhs[lhs_view.offset..];
                let rhs_p = &rhs[rhs_view.offset..];
                let out_p = &mut out[out_view.offset..];

                // SAFETY: every addressed element was bounds checked above.
                unsafe {
                    gemm(
                        /* m: usize = */ m,
                        /* n: usize = */ n,
                        /* k: usize = */ k,
                        /* dst: *mut T = */ out_p.as_mut_ptr(),
                        /* dst_cs: isize = */ out_view.cs as isize,
                        /* dst_rs: isize = */ out_view.rs as isize,
                        /* read_dst: bool = */ false,
                        /* lhs: *const T = */ lhs_p.as_ptr(),
                        /* lhs_cs: isize = */ lhs_view.cs as isize,
                        /* lhs_rs: isize = */ lhs_view.rs as isize,
                        /* rhs: *const T = */ rhs_p.as_ptr(),
                        /* rhs_cs: isize = */ rhs_view.cs as isize,
                        /* rhs_rs: isize = */ rhs_view.rs as isize,
                        /* alpha: T = */ $zero,
                        /* beta: T = */ 1 as $rt,
                        /* conj_dst: bool = */ false,
                        /* conj_lhs: bool = */ false,
                        /* conj_rhs: bool = */ false,
                        parallelism,
                    )
                }
            }
        }
    };
}

instantiate_gemm!(u8, 0u8, NAIVE);
instantiate_gemm!(i32, 0i32, NAIVE);
instantiate_gemm!(f32, 0f32, GEMM);
instantiate_gemm!(f64, 0f64, GEMM);
