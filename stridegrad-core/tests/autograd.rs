use approx::assert_relative_eq;
use rand::{rngs::StdRng, SeedableRng};
use stridegrad_core::{ComputeGraph, Error, Manager, NArray, Order, Tensor};

fn arr(v: &[f64], dims: &[usize]) -> NArray<f64> {
    NArray::from_vec(v.to_vec(), dims, Order::C).unwrap()
}

fn grad_of(graph: &ComputeGraph<f64>, t: Tensor) -> Vec<f64> {
    graph.grad(t).unwrap().unwrap().to_vec(Order::C)
}

macro_rules! test_for_dtype {
    ($t:ty, $name:ident) => {
        mod $name {
            use super::*;

            #[test]
            fn add_and_mul_gradients() {
                let m = Manager::<$t>::new();
                let mut graph = ComputeGraph::new();
                let x = graph.param(m.seq([3], Order::C));
                let y = graph.param(m.full([3], 2 as $t, Order::C));
                let xy = graph.mul(x, y).unwrap();
                let s = graph.add(xy, x).unwrap();
                let loss = graph.sum(s).unwrap();
                graph.backward(loss).unwrap();
                assert_eq!(graph.grad(x).unwrap().unwrap().to_vec(Order::C), vec![3 as $t; 3]);
                assert_eq!(
                    graph.grad(y).unwrap().unwrap().to_vec(Order::C),
                    vec![0 as $t, 1 as $t, 2 as $t]
                );
            }

            #[test]
            fn matmul_gradients() {
                let m = Manager::<$t>::new();
                let mut graph = ComputeGraph::new();
                let a = graph.param(m.seq([2, 3], Order::C));
                let b = graph.param(m.seq([3, 2], Order::C));
                let ab = graph.matmul(a, b).unwrap();
                let loss = graph.sum(ab).unwrap();
                graph.backward(loss).unwrap();
                let ga: Vec<$t> = [1, 5, 9, 1, 5, 9].iter().map(|&x| x as $t).collect();
                let gb: Vec<$t> = [3, 3, 5, 5, 7, 7].iter().map(|&x| x as $t).collect();
                assert_eq!(graph.grad(a).unwrap().unwrap().to_vec(Order::C), ga);
                assert_eq!(graph.grad(b).unwrap().unwrap().to_vec(Order::C), gb);
            }

            #[test]
            fn leaves_without_grad_record_nothing() {
                let m = Manager::<$t>::new();
                let mut graph = ComputeGraph::new();
                let x = graph.leaf(m.ones([2], Order::C));
                let y = graph.leaf(m.ones([2], Order::C));
                let z = graph.add(x, y).unwrap();
                assert!(graph.tape().is_empty());
                assert!(!graph.requires_grad(z).unwrap());
                assert_eq!(graph.value(z).unwrap().to_vec(Order::C), vec![2 as $t; 2]);
            }
        }
    };
}

test_for_dtype!(u8, autograd_u8);
test_for_dtype!(i32, autograd_i32);
test_for_dtype!(f32, autograd_f32);
test_for_dtype!(f64, autograd_f64);

#[test]
fn sqrt_gradient_at_zero_is_infinite() {
    let mut graph = ComputeGraph::new();
    let x = graph.param(arr(&[0.0, 1.0, 2.0, 3.0], &[4]));
    let y = graph.sqrt(x).unwrap();
    let loss = graph.sum(y).unwrap();
    graph.backward(loss).unwrap();
    let g = grad_of(&graph, x);
    assert!(g[0].is_infinite() && g[0] > 0.0);
    assert_relative_eq!(g[1], 0.5);
    assert_relative_eq!(g[2], 0.5 / 2f64.sqrt());
    assert_relative_eq!(g[3], 0.5 / 3f64.sqrt());
}

#[test]
fn integral_sqrt_gradient_saturates() {
    let mut graph = ComputeGraph::new();
    let x = graph.param(NArray::from_vec(vec![0i32, 4], [2], Order::C).unwrap());
    let y = graph.sqrt(x).unwrap();
    let loss = graph.sum(y).unwrap();
    graph.backward(loss).unwrap();
    // 0.5 / 0 saturates, 0.25 truncates to 0
    assert_eq!(graph.grad(x).unwrap().unwrap().to_vec(Order::C), vec![i32::MAX, 0]);
}

#[test]
fn neg_gradient_is_minus_one() {
    let mut graph = ComputeGraph::new();
    let x = graph.param(Manager::<f64>::new().seq([2, 2], Order::C));
    let y = graph.neg(x).unwrap();
    let loss = graph.sum(y).unwrap();
    graph.backward(loss).unwrap();
    assert_eq!(grad_of(&graph, x), vec![-1.0; 4]);
}

#[test]
fn pow_exp_log_and_div() {
    let mut graph = ComputeGraph::new();
    let x = graph.param(arr(&[1.0, 2.0, 3.0], &[3]));
    let y = graph.param(arr(&[4.0, 5.0, 6.0], &[3]));

    let cube = graph.pow(x, 3.0).unwrap();
    let loss = graph.sum(cube).unwrap();
    graph.backward(loss).unwrap();
    assert_eq!(grad_of(&graph, x), vec![3.0, 12.0, 27.0]);
    graph.reset_grad();

    let q = graph.div(x, y).unwrap();
    let loss = graph.sum(q).unwrap();
    graph.backward(loss).unwrap();
    let gx = grad_of(&graph, x);
    let gy = grad_of(&graph, y);
    for i in 0..3 {
        let (a, b) = ((i + 1) as f64, (i + 4) as f64);
        assert_relative_eq!(gx[i], 1.0 / b);
        assert_relative_eq!(gy[i], -a / (b * b));
    }
    graph.reset_grad();

    let e = graph.exp(x).unwrap();
    let l = graph.log(e).unwrap();
    let loss = graph.sum(l).unwrap();
    graph.backward(loss).unwrap();
    for g in grad_of(&graph, x) {
        assert_relative_eq!(g, 1.0, epsilon = 1e-12);
    }
}

#[test]
fn scalar_ops_and_mean() {
    let mut graph = ComputeGraph::new();
    let x = graph.param(Manager::<f64>::new().seq([4], Order::C));
    let shifted = graph.add_scalar(x, 10.0).unwrap();
    let scaled = graph.mul_scalar(shifted, 3.0).unwrap();
    let loss = graph.mean(scaled).unwrap();
    assert_relative_eq!(graph.value(loss).unwrap().item().unwrap(), 34.5);
    graph.backward(loss).unwrap();
    assert_eq!(grad_of(&graph, x), vec![0.75; 4]);

    let empty = graph.param(Manager::<f64>::new().zeros([0], Order::C));
    assert!(graph.mean(empty).is_err());
}

#[test]
fn shape_ops_route_gradients_back() {
    let m = Manager::<f64>::new();
    let mut graph = ComputeGraph::new();
    let x = graph.param(m.seq([2, 3], Order::C));
    let w = graph.leaf(m.seq([3, 2], Order::C));
    let p = graph.permute(x, &[1, 0]).unwrap();
    let pw = graph.mul(p, w).unwrap();
    let loss = graph.sum(pw).unwrap();
    graph.backward(loss).unwrap();
    // x[a][b] meets w[b][a]
    assert_eq!(grad_of(&graph, x), vec![0.0, 2.0, 4.0, 1.0, 3.0, 5.0]);
    assert!(graph.grad(w).unwrap().is_none());
    graph.reset_grad();

    let r = graph.reshape(x, [3, 2]).unwrap();
    let rw = graph.mul(r, w).unwrap();
    let loss = graph.sum(rw).unwrap();
    graph.backward(loss).unwrap();
    assert_eq!(grad_of(&graph, x), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    graph.reset_grad();

    let s = graph.sum_axis(x, 1).unwrap();
    let s2 = graph.mul(s, s).unwrap();
    let loss = graph.sum(s2).unwrap();
    graph.backward(loss).unwrap();
    // row sums are 3 and 12
    assert_eq!(grad_of(&graph, x), vec![6.0, 6.0, 6.0, 24.0, 24.0, 24.0]);
}

#[test]
fn reshape_follows_the_input_layout() {
    let m = Manager::<f64>::new();
    let mut graph = ComputeGraph::new();
    let x = graph.param(m.seq([2, 3], Order::C));
    let w = graph.leaf(m.seq([6], Order::C));
    // the transpose is F-dense, so the reshape reads it in F order
    let p = graph.permute(x, &[1, 0]).unwrap();
    let r = graph.reshape(p, [6]).unwrap();
    assert_eq!(
        graph.value(r).unwrap().to_vec(Order::C),
        vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]
    );
    let rw = graph.mul(r, w).unwrap();
    let loss = graph.sum(rw).unwrap();
    graph.backward(loss).unwrap();
    assert_eq!(grad_of(&graph, x), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    graph.reset_grad();

    // transpose, flatten and back again is the identity on gradients
    let p = graph.permute(x, &[1, 0]).unwrap();
    let r = graph.reshape(p, [2, 3]).unwrap();
    let back = graph.permute(r, &[1, 0]).unwrap();
    let back = graph.reshape(back, [6]).unwrap();
    let bw = graph.mul(back, w).unwrap();
    let loss = graph.sum(bw).unwrap();
    graph.backward(loss).unwrap();
    let value = graph.value(back).unwrap().to_vec(Order::C);
    let mut expected = vec![0.0; 6];
    for (i, v) in value.iter().enumerate() {
        expected[*v as usize] = i as f64;
    }
    assert_eq!(grad_of(&graph, x), expected);
    graph.reset_grad();

    // a narrowed view is not dense and is read in C order
    let y = graph.param(m.seq([2, 4], Order::C));
    let n = graph.narrow(y, 1, 0, 3).unwrap();
    let r = graph.reshape(n, [6]).unwrap();
    assert_eq!(
        graph.value(r).unwrap().to_vec(Order::C),
        vec![0.0, 1.0, 2.0, 4.0, 5.0, 6.0]
    );
    let rw = graph.mul(r, w).unwrap();
    let loss = graph.sum(rw).unwrap();
    graph.backward(loss).unwrap();
    assert_eq!(
        grad_of(&graph, y),
        vec![0.0, 1.0, 2.0, 0.0, 3.0, 4.0, 5.0, 0.0]
    );
}

#[test]
fn split_and_narrow() {
    let mut graph = ComputeGraph::new();
    let x = graph.param(Manager::<f64>::new().seq([5], Order::C));
    let parts = graph.split(x, 0, &[0, 2]).unwrap();
    assert_eq!(parts.len(), 2);
    let loss = graph.sum(parts[1]).unwrap();
    graph.backward(loss).unwrap();
    assert_eq!(grad_of(&graph, x), vec![0.0, 0.0, 1.0, 1.0, 1.0]);
    graph.reset_grad();

    let mid = graph.narrow(x, 0, 1, 3).unwrap();
    let sq = graph.mul(mid, mid).unwrap();
    let loss = graph.sum(sq).unwrap();
    graph.backward(loss).unwrap();
    assert_eq!(grad_of(&graph, x), vec![0.0, 2.0, 4.0, 0.0, 0.0]);
}

#[test]
fn stack_gradients() {
    let m = Manager::<f64>::new();
    let mut graph = ComputeGraph::new();
    let a = graph.param(m.ones([3], Order::C));
    let b = graph.param(m.ones([3], Order::C));
    let s = graph.stack(0, &[a, b]).unwrap();
    let w = graph.leaf(m.seq([2, 3], Order::C));
    let sw = graph.mul(s, w).unwrap();
    let loss = graph.sum(sw).unwrap();
    graph.backward(loss).unwrap();
    assert_eq!(grad_of(&graph, a), vec![0.0, 1.0, 2.0]);
    assert_eq!(grad_of(&graph, b), vec![3.0, 4.0, 5.0]);
}

#[test]
fn concat_gradients_split_back() {
    let m = Manager::<f64>::new();
    let mut rng = StdRng::seed_from_u64(42);
    for axis in 0..3 {
        let mut graph = ComputeGraph::new();
        let a = graph.param(m.random([4, 3, 2], &mut rng, Order::C));
        let b = graph.param(m.random([4, 3, 2], &mut rng, Order::C));
        let c = graph.cat(axis, &[a, b]).unwrap();
        let dims = graph.value(c).unwrap().dims().to_vec();
        let seed = m.random(dims, &mut rng, Order::C);
        graph.set_grad(c, seed.clone()).unwrap();
        graph.backward(c).unwrap();

        let split = [4, 3, 2][axis];
        assert!(graph
            .grad(a)
            .unwrap()
            .unwrap()
            .deep_eq(&seed.narrow(axis, 0, split).unwrap()));
        assert!(graph
            .grad(b)
            .unwrap()
            .unwrap()
            .deep_eq(&seed.narrow(axis, split, 2 * split).unwrap()));
    }
}

#[test]
fn unreached_branch_is_untouched() {
    let mut graph = ComputeGraph::new();
    let x = graph.param(Manager::<f64>::new().ones([3], Order::C));
    let y = graph.mul_scalar(x, 2.0).unwrap();
    let unused = graph.add_scalar(x, 1.0).unwrap();
    let loss = graph.sum(y).unwrap();
    graph.backward(loss).unwrap();
    assert_eq!(grad_of(&graph, x), vec![2.0; 3]);
    assert!(graph.grad(unused).unwrap().is_none());
}

#[test]
fn repeated_backward_accumulates_into_leaves() {
    let mut graph = ComputeGraph::new();
    let x = graph.param(arr(&[1.0, 2.0], &[2]));
    let sq = graph.mul(x, x).unwrap();
    let loss = graph.sum(sq).unwrap();
    graph.backward(loss).unwrap();
    assert_eq!(grad_of(&graph, x), vec![2.0, 4.0]);
    graph.backward(loss).unwrap();
    assert_eq!(grad_of(&graph, x), vec![4.0, 8.0]);
    // derived gradients are recomputed, not accumulated
    assert_eq!(grad_of(&graph, sq), vec![1.0, 1.0]);
}

#[test]
fn earlier_gradient_is_not_reused_as_seed() {
    let mut graph = ComputeGraph::new();
    let x = graph.param(Manager::<f64>::new().ones([3], Order::C));
    let y = graph.sum(x).unwrap();
    let z = graph.mul_scalar(y, 3.0).unwrap();
    graph.backward(z).unwrap();
    assert_eq!(grad_of(&graph, y), vec![3.0]);
    graph.zero_grad(x).unwrap();
    graph.backward(y).unwrap();
    assert_eq!(grad_of(&graph, x), vec![1.0; 3]);

    // an explicit seed is used once
    graph.zero_grad(x).unwrap();
    graph.set_grad(y, arr(&[2.0], &[1])).unwrap();
    graph.backward(y).unwrap();
    assert_eq!(grad_of(&graph, x), vec![2.0; 3]);
    graph.zero_grad(x).unwrap();
    graph.backward(y).unwrap();
    assert_eq!(grad_of(&graph, x), vec![1.0; 3]);
}

fn smooth_loss(graph: &mut ComputeGraph<f64>, a: Tensor, b: Tensor) {
    let ab = graph.matmul(a, b).unwrap();
    let e = graph.exp(ab).unwrap();
    let d = graph.add_scalar(e, 1.0).unwrap();
    let q = graph.div(ab, d).unwrap();
    let loss = graph.mean(q).unwrap();
    graph.backward(loss).unwrap();
}

#[test]
fn reset_grad_is_idempotent() {
    let m = Manager::<f64>::new();
    let av = m.random([3, 4], &mut StdRng::seed_from_u64(1), Order::C);
    let bv = m.random([4, 2], &mut StdRng::seed_from_u64(2), Order::C);

    let mut graph = ComputeGraph::new();
    let a = graph.param(av.copy(Order::C));
    let b = graph.param(bv.copy(Order::C));
    smooth_loss(&mut graph, a, b);
    graph.reset_grad();
    smooth_loss(&mut graph, a, b);

    let mut fresh = ComputeGraph::new();
    let fa = fresh.param(av);
    let fb = fresh.param(bv);
    smooth_loss(&mut fresh, fa, fb);

    assert_eq!(grad_of(&graph, a), grad_of(&fresh, fa));
    assert_eq!(grad_of(&graph, b), grad_of(&fresh, fb));
    assert_eq!(graph.tape().len(), fresh.tape().len());
}

#[test]
fn reset_releases_derived_tensors() {
    let mut graph = ComputeGraph::new();
    let x = graph.param(arr(&[1.0, 2.0], &[2]));
    let y = graph.mul(x, x).unwrap();
    let loss = graph.sum(y).unwrap();
    graph.backward(loss).unwrap();
    assert_eq!(graph.len(), 3);

    graph.reset_grad();
    assert!(graph.tape().is_empty());
    assert!(graph.grad(x).unwrap().is_none());
    assert_eq!(graph.len(), 1);
    assert!(graph.requires_grad(x).unwrap());
    let err = graph.value(y).unwrap_err();
    assert!(matches!(err.inner(), Error::IllegalGraphState(_)));

    // freed slots are reused, stale handles stay invalid
    let z = graph.add(x, x).unwrap();
    assert!(graph.value(z).is_ok());
    assert!(graph.value(y).is_err());
    assert!(graph.value(loss).is_err());

    graph.reset_grad();
    graph.reset_grad();
    assert_eq!(graph.parameters(), vec![x]);
}

#[test]
fn handles_are_bound_to_their_graph() {
    let m = Manager::<f64>::new();
    let mut g1 = ComputeGraph::new();
    let mut g2 = ComputeGraph::new();
    let x = g1.param(m.ones([2], Order::C));
    let _ = g2.param(m.ones([2], Order::C));
    let err = g2.value(x).unwrap_err();
    assert!(matches!(err.inner(), Error::IllegalGraphState(_)));
    assert!(g2.add(x, x).is_err());
}

#[test]
fn non_scalar_root_needs_a_seed() {
    let mut graph = ComputeGraph::new();
    let x = graph.param(Manager::<f64>::new().ones([3], Order::C));
    let y = graph.mul_scalar(x, 2.0).unwrap();
    let err = graph.backward(y).unwrap_err();
    assert!(matches!(err.inner(), Error::MissingGradient(_)));

    let seed = arr(&[1.0, 0.0, -1.0], &[3]);
    assert!(graph.backward_with(y, arr(&[1.0], &[1])).is_err());
    graph.backward_with(y, seed).unwrap();
    assert_eq!(grad_of(&graph, x), vec![2.0, 0.0, -2.0]);
}

#[test]
fn set_grad_checks_shape() {
    let mut graph = ComputeGraph::new();
    let x = graph.param(Manager::<f64>::new().ones([3], Order::C));
    let err = graph.set_grad(x, arr(&[1.0], &[1])).unwrap_err();
    assert!(matches!(err.inner(), Error::ShapeMismatch { .. }));
    graph.set_grad(x, arr(&[1.0, 1.0, 1.0], &[3])).unwrap();
    graph.zero_grad(x).unwrap();
    assert!(graph.grad(x).unwrap().is_none());
}

#[test]
fn dot_export_names_ops_and_tensors() {
    let mut graph = ComputeGraph::new();
    let x = graph.param(Manager::<f64>::new().ones([2], Order::C));
    graph.set_name(x, "weights").unwrap();
    let y = graph.exp(x).unwrap();
    let _ = graph.sum(y).unwrap();
    assert_eq!(graph.name(x).unwrap(), Some("weights"));

    let pg = graph.to_petgraph();
    // x, exp, y, sum, loss
    assert_eq!(pg.node_count(), 5);
    assert_eq!(pg.edge_count(), 4);
    let dot = graph.to_dot();
    assert!(dot.contains("weights"));
    assert!(dot.contains("Exp"));
    assert!(dot.contains("Sum"));
}
