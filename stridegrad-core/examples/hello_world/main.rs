use stridegrad_core::{ComputeGraph, Manager, Order};

fn main() {
    let m = Manager::<f32>::new();
    let seq = m.seq([10], Order::C);
    dbg!(seq.to_vec(Order::C));

    // views share storage with their source
    let a = m.seq([3, 4], Order::C);
    let col = a.narrow(1, 1, 2).unwrap();
    col.fill_(-1.0);
    dbg!(a.t().to_vec(Order::C));

    let b = m.full([3, 4], 2.0, Order::C);
    let c = m.full([3, 4], 3.0, Order::C);
    let d = m.full([3, 4], 4.0, Order::C);
    let res = m.ones([3, 4], Order::C).mul(&b).unwrap().add(&c).unwrap();
    res.add_(&d).unwrap();
    assert_eq!(res.to_vec(Order::C), vec![9.0; 12]);

    let mut graph = ComputeGraph::new();
    let x = graph.param(m.seq([2, 3], Order::C));
    let w = graph.leaf(m.ones([3, 1], Order::C));
    let y = graph.matmul(x, w).unwrap();
    let y = graph.pow(y, 2.0).unwrap();
    let loss = graph.sum(y).unwrap();
    graph.backward(loss).unwrap();

    println!("{}", graph.to_dot());
    let grad = graph.grad(x).unwrap().unwrap();
    // row sums are 3 and 12, so each row gets 2 * sum
    assert_eq!(grad.to_vec(Order::C), vec![6.0, 6.0, 6.0, 24.0, 24.0, 24.0]);
}
