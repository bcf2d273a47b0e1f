use rayon::prelude::*;
use tracing::debug;

use super::{check_disjoint, collect_params, Optimizer};
use crate::{ComputeGraph, FloatDType, NArray, Order, Result, Tensor};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdamConfig {
    pub lr: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
    pub weight_decay: f64,
    pub amsgrad: bool,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            lr: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            weight_decay: 0.0,
            amsgrad: false,
        }
    }
}

impl AdamConfig {
    pub fn with_lr(mut self, lr: f64) -> Self {
        self.lr = lr;
        self
    }

    pub fn with_betas(mut self, beta1: f64, beta2: f64) -> Self {
        self.beta1 = beta1;
        self.beta2 = beta2;
        self
    }

    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    pub fn with_weight_decay(mut self, weight_decay: f64) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    pub fn with_amsgrad(mut self, amsgrad: bool) -> Self {
        self.amsgrad = amsgrad;
        self
    }
}

/// Moment estimates of one parameter.
#[derive(Clone)]
struct Moments<T: FloatDType> {
    m: NArray<T>,
    v: NArray<T>,
    v_max: Option<NArray<T>>,
}

/// Adam (adaptive moment estimation), optionally with the AMSGrad variant.
pub struct Adam<T: FloatDType> {
    config: AdamConfig,
    params: Vec<Tensor>,
    moments: Vec<Option<Moments<T>>>,
    steps: u64,
}

impl<T: FloatDType> Adam<T> {
    pub fn new(params: Vec<Tensor>, config: AdamConfig) -> Self {
        let moments = vec![None; params.len()];
        Self {
            config,
            params,
            moments,
            steps: 0,
        }
    }

    pub fn config(&self) -> &AdamConfig {
        &self.config
    }

    /// Number of completed steps.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Forgets the moment estimates and the step count.
    pub fn reset(&mut self) {
        self.moments.iter_mut().for_each(|m| *m = None);
        self.steps = 0;
    }
}

fn update<T: FloatDType>(
    c: &AdamConfig,
    t: u64,
    value: &NArray<T>,
    grad: &NArray<T>,
    state: &mut Option<Moments<T>>,
) -> Result<()> {
    let f = T::from_f64;
    let g = grad.copy(Order::C);
    if c.weight_decay != 0.0 {
        g.add_(&value.mul_scalar(f(c.weight_decay)))?;
    }
    let s = state.get_or_insert_with(|| Moments {
        m: g.zeros_like(),
        v: g.zeros_like(),
        v_max: c.amsgrad.then(|| g.zeros_like()),
    });

    s.m.mul_scalar_(f(c.beta1))
        .add_(&g.mul_scalar(f(1.0 - c.beta1)))?;
    s.v.mul_scalar_(f(c.beta2))
        .add_(g.mul_(&g)?.mul_scalar_(f(1.0 - c.beta2)))?;

    let second = match &s.v_max {
        Some(v_max) => {
            v_max.max_(&s.v)?;
            v_max
        }
        None => &s.v,
    };

    let bias1 = 1.0 - c.beta1.powi(t as i32);
    let bias2 = 1.0 - c.beta2.powi(t as i32);
    let denom = second.div_scalar(f(bias2));
    denom.sqrt_().add_scalar_(f(c.eps));
    let step = s.m.div_scalar(f(bias1));
    step.div_(&denom)?.mul_scalar_(f(c.lr));
    value.sub_(&step)?;
    Ok(())
}

impl<T: FloatDType> Optimizer<T> for Adam<T> {
    fn step(&mut self, graph: &mut ComputeGraph<T>) -> Result<()> {
        check_disjoint(graph, &self.params)?;
        let params = collect_params(graph, &self.params)?;
        let config = self.config;
        // bias correction of the step in flight
        let t = self.steps + 1;

        params
            .par_iter()
            .zip(self.moments.par_iter_mut())
            .try_for_each(|(param, state)| match param {
                Some((value, grad)) => update(&config, t, value, grad, state),
                None => Ok(()),
            })?;

        self.steps = t;
        debug!(step = self.steps, params = self.params.len(), lr = config.lr, "adam step");
        Ok(())
    }

    fn params(&self) -> &[Tensor] {
        &self.params
    }
}
