use rand::Rng;

/// Dispatch random sampling based on the data type.
pub trait RandDispatch {
    /// One uniform sample: `[0, 1)` for floating point types, the whole value
    /// range for integral types.
    fn sample_uniform<R: Rng + ?Sized>(rng: &mut R) -> Self
    where
        Self: Sized;

    /// Convert a sample drawn from an `f64` distribution. Integral types truncate.
    fn from_sample(x: f64) -> Self
    where
        Self: Sized;
}

macro_rules! rand_dispatch {
    ($t:ident) => {
        impl RandDispatch for $t {
            fn sample_uniform<R: Rng + ?Sized>(rng: &mut R) -> Self {
                rng.random::<$t>()
            }

            fn from_sample(x: f64) -> Self {
                x as $t
            }
        }
    };
}

rand_dispatch!(u8);
rand_dispatch!(i32);
rand_dispatch!(f32);
rand_dispatch!(f64);
