use rand::{rngs::StdRng, SeedableRng};
use rand_distr::Normal;
use stridegrad_core::{
    optim::{Adam, AdamConfig, Optimizer},
    ComputeGraph, Manager, Order, Result,
};

/// Fits `y = x * w + b` to noisy samples of a known line.
fn main() -> Result<()> {
    const SAMPLES: usize = 256;
    const FEATURES: usize = 3;
    let m = Manager::<f64>::new();
    let mut rng = StdRng::seed_from_u64(0);

    let true_w = m.wrap(vec![2.0, -1.0, 0.5], [FEATURES, 1], Order::C)?;
    let x = m.random([SAMPLES, FEATURES], &mut rng, Order::C);
    let noise = Normal::new(0.0, 0.01).map_err(stridegrad_core::Error::wrap)?;
    let y = x.mm(&true_w)?.add_scalar(0.25);
    y.add_(&m.random_from([SAMPLES, 1], &noise, &mut rng, Order::C))?;

    let mut graph = ComputeGraph::new();
    let xs = graph.leaf(x);
    let ys = graph.leaf(y);
    let w = graph.param(m.zeros([FEATURES, 1], Order::C));
    let b = graph.param(m.zeros([1], Order::C));
    graph.set_name(w, "w")?;
    graph.set_name(b, "b")?;

    let mut opt = Adam::new(vec![w, b], AdamConfig::default().with_lr(0.05));
    for epoch in 0..500 {
        graph.reset_grad();
        let pred = graph.matmul(xs, w)?;
        let bias = graph.reshape(b, [1, 1])?;
        let bias = graph.cat(0, &vec![bias; SAMPLES])?;
        let pred = graph.add(pred, bias)?;
        let diff = graph.sub(pred, ys)?;
        let sq = graph.pow(diff, 2.0)?;
        let loss = graph.mean(sq)?;
        graph.backward(loss)?;
        opt.step(&mut graph)?;

        if epoch % 100 == 0 {
            println!("epoch {epoch}: loss {:.6}", graph.value(loss)?.item()?);
        }
    }

    println!("w = {:?}", graph.value(w)?.to_vec(Order::C));
    println!("b = {:?}", graph.value(b)?.to_vec(Order::C));
    Ok(())
}
