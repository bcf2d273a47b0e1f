use rand::{rngs::StdRng, SeedableRng};
use rand_distr::Normal;
use stridegrad_core::{seq_of, zeros_of, ElemType, Manager, Order, Storage, StrideLayout};

macro_rules! test_for_dtype {
    ($t:ty, $elem:expr, $name:ident) => {
        mod $name {
            use super::*;

            #[test]
            fn constant_fills() {
                let m = Manager::<$t>::new();
                assert_eq!(m.elem_type(), $elem);
                assert_eq!(m.zeros([2, 3], Order::C).to_vec(Order::C), vec![0 as $t; 6]);
                assert_eq!(m.ones([4], Order::F).to_vec(Order::C), vec![1 as $t; 4]);
                assert_eq!(m.full([2, 2], 9 as $t, Order::C).to_vec(Order::C), vec![9 as $t; 4]);
            }

            #[test]
            fn seq_respects_order() {
                let m = Manager::<$t>::new();
                let c = m.seq([2, 3], Order::C);
                assert_eq!(c.get(&[1, 0]).unwrap(), 3 as $t);
                let f = m.seq([2, 3], Order::F);
                assert_eq!(f.get(&[1, 0]).unwrap(), 1 as $t);
                assert!(f.layout().is_f_dense());
                assert_eq!(f.to_vec(Order::F), (0..6).map(|x| x as $t).collect::<Vec<_>>());
            }

            #[test]
            fn random_is_reproducible() {
                let m = Manager::<$t>::new();
                let a = m.random([3, 4], &mut StdRng::seed_from_u64(7), Order::C);
                let b = m.random([3, 4], &mut StdRng::seed_from_u64(7), Order::C);
                assert_eq!(a.dims(), &[3, 4]);
                assert!(a.deep_eq(&b));
            }

            #[test]
            fn wrap_and_stride() {
                let m = Manager::<$t>::new();
                let a = m.wrap((0..6).map(|x| x as $t).collect(), [3, 2], Order::C).unwrap();
                assert_eq!(a.get(&[2, 1]).unwrap(), 5 as $t);
                assert!(m.wrap(vec![0 as $t; 5], [3, 2], Order::C).is_err());

                let storage = Storage::from_vec((0..8).map(|x| x as $t).collect());
                let layout = StrideLayout::new([2, 2], 1, vec![4, 2]).unwrap();
                let v = m.stride(layout, storage).unwrap();
                assert_eq!(v.to_vec(Order::C), vec![1 as $t, 3 as $t, 5 as $t, 7 as $t]);
            }

            #[test]
            fn joins() {
                let m = Manager::<$t>::new();
                let a = m.ones([2], Order::C);
                let b = m.zeros([2], Order::C);
                let c = m.concat(0, &[&a, &b]).unwrap();
                assert_eq!(c.to_vec(Order::C), vec![1 as $t, 1 as $t, 0 as $t, 0 as $t]);
                let s = m.stack(0, &[&a, &b]).unwrap();
                assert_eq!(s.dims(), &[2, 2]);
            }

            #[test]
            fn tagged_constructors() {
                let z = zeros_of($elem, [2, 2], Order::C);
                assert_eq!(z.elem_type(), $elem);
                assert_eq!(z.shape().dims(), &[2, 2]);
                assert_eq!(z.to_f64_vec(), vec![0.0; 4]);
                let s = seq_of($elem, [3], Order::C);
                assert_eq!(s.cast_f64().to_vec(Order::C), vec![0.0, 1.0, 2.0]);
            }
        }
    };
}

test_for_dtype!(u8, ElemType::Byte, manager_u8);
test_for_dtype!(i32, ElemType::Int, manager_i32);
test_for_dtype!(f32, ElemType::Float, manager_f32);
test_for_dtype!(f64, ElemType::Double, manager_f64);

#[test]
fn byte_seq_wraps() {
    let s = Manager::<u8>::new().seq([300], Order::C);
    assert_eq!(s.get(&[255]).unwrap(), 255);
    assert_eq!(s.get(&[256]).unwrap(), 0);
    assert_eq!(s.get(&[299]).unwrap(), 43);
}

#[test]
fn float_random_is_unit_interval() {
    let m = Manager::<f64>::new();
    let a = m.random([1000], &mut StdRng::seed_from_u64(0), Order::C);
    assert!(a.to_vec(Order::C).iter().all(|x| (0.0..1.0).contains(x)));
    assert!(a.max().unwrap() > 0.9);
}

#[test]
fn random_from_distribution() {
    let m = Manager::<f32>::new();
    let normal = Normal::new(5.0, 0.1).unwrap();
    let a = m.random_from([2000], &normal, &mut StdRng::seed_from_u64(3), Order::C);
    approx::assert_abs_diff_eq!(a.mean(), 5.0, epsilon = 0.05);
}

#[test]
fn elem_type_metadata() {
    assert_eq!(ElemType::Byte.size_of(), 1);
    assert_eq!(ElemType::Double.size_of(), 8);
    assert!(ElemType::Float.is_floating_point());
    assert!(!ElemType::Int.is_floating_point());
    assert_eq!(ElemType::Int.to_string(), "int");
}
