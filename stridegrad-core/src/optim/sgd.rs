use rayon::prelude::*;
use tracing::debug;

use super::{check_disjoint, collect_params, Optimizer};
use crate::{ComputeGraph, FloatDType, NArray, Order, Result, Tensor};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SgdConfig {
    pub lr: f64,
    pub momentum: f64,
    pub weight_decay: f64,
    pub nesterov: bool,
}

impl Default for SgdConfig {
    fn default() -> Self {
        Self {
            lr: 0.01,
            momentum: 0.0,
            weight_decay: 0.0,
            nesterov: false,
        }
    }
}

impl SgdConfig {
    pub fn with_lr(mut self, lr: f64) -> Self {
        self.lr = lr;
        self
    }

    pub fn with_momentum(mut self, momentum: f64) -> Self {
        self.momentum = momentum;
        self
    }

    pub fn with_weight_decay(mut self, weight_decay: f64) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    pub fn with_nesterov(mut self, nesterov: bool) -> Self {
        self.nesterov = nesterov;
        self
    }
}

/// Stochastic gradient descent with optional momentum, Nesterov momentum and
/// L2 weight decay.
pub struct Sgd<T: FloatDType> {
    config: SgdConfig,
    params: Vec<Tensor>,
    velocities: Vec<Option<NArray<T>>>,
    steps: u64,
}

impl<T: FloatDType> Sgd<T> {
    pub fn new(params: Vec<Tensor>, config: SgdConfig) -> Self {
        let velocities = vec![None; params.len()];
        Self {
            config,
            params,
            velocities,
            steps: 0,
        }
    }

    pub fn config(&self) -> &SgdConfig {
        &self.config
    }

    /// Number of completed steps.
    pub fn steps(&self) -> u64 {
        self.steps
    }
}

fn update<T: FloatDType>(
    c: &SgdConfig,
    value: &NArray<T>,
    grad: &NArray<T>,
    velocity: &mut Option<NArray<T>>,
) -> Result<()> {
    let g = grad.copy(Order::C);
    if c.weight_decay != 0.0 {
        g.add_(&value.mul_scalar(T::from_f64(c.weight_decay)))?;
    }
    let direction = if c.momentum != 0.0 {
        let buf = match velocity.take() {
            Some(buf) => {
                buf.mul_scalar_(T::from_f64(c.momentum)).add_(&g)?;
                buf
            }
            None => g.copy(Order::C),
        };
        let direction = if c.nesterov {
            g.add(&buf.mul_scalar(T::from_f64(c.momentum)))?
        } else {
            buf.copy(Order::C)
        };
        *velocity = Some(buf);
        direction
    } else {
        g
    };
    value.sub_(direction.mul_scalar_(T::from_f64(c.lr)))?;
    Ok(())
}

impl<T: FloatDType> Optimizer<T> for Sgd<T> {
    fn step(&mut self, graph: &mut ComputeGraph<T>) -> Result<()> {
        check_disjoint(graph, &self.params)?;
        let params = collect_params(graph, &self.params)?;
        let config = self.config;

        params
            .par_iter()
            .zip(self.velocities.par_iter_mut())
            .try_for_each(|(param, velocity)| match param {
                Some((value, grad)) => update(&config, value, grad, velocity),
                None => Ok(()),
            })?;

        self.steps += 1;
        debug!(step = self.steps, params = self.params.len(), lr = config.lr, "sgd step");
        Ok(())
    }

    fn params(&self) -> &[Tensor] {
        &self.params
    }
}
