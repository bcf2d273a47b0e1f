//! Gradient descent optimizers over the parameters of a [`ComputeGraph`].
//!
//! A step updates every parameter in parallel, one rayon task per parameter.
//! Tasks share nothing: each writes only into its own parameter storage, so
//! a step first checks that no two parameters alias one buffer.

use std::collections::HashMap;

use crate::{ComputeGraph, Error, FloatDType, NArray, Result, Tensor};

mod adam;
mod sgd;

pub use adam::{Adam, AdamConfig};
pub use sgd::{Sgd, SgdConfig};

pub trait Optimizer<T: FloatDType> {
    /// Applies one update to every parameter that has a gradient.
    fn step(&mut self, graph: &mut ComputeGraph<T>) -> Result<()>;

    fn params(&self) -> &[Tensor];

    /// Drops the gradients of all parameters.
    fn zero_grad(&self, graph: &mut ComputeGraph<T>) -> Result<()> {
        for &p in self.params() {
            graph.zero_grad(p)?;
        }
        Ok(())
    }
}

/// Fails with `AliasedParameters` if two parameters share a storage.
pub(crate) fn check_disjoint<T: FloatDType>(
    graph: &ComputeGraph<T>,
    params: &[Tensor],
) -> Result<()> {
    let mut seen: HashMap<usize, usize> = HashMap::with_capacity(params.len());
    for (i, &p) in params.iter().enumerate() {
        let id = graph.value(p)?.storage().id();
        if let Some(&first) = seen.get(&id) {
            return Err(Error::AliasedParameters { first, second: i }.bt());
        }
        seen.insert(id, i);
    }
    Ok(())
}

/// Value and gradient of each parameter, `None` where there is no gradient.
pub(crate) fn collect_params<T: FloatDType>(
    graph: &ComputeGraph<T>,
    params: &[Tensor],
) -> Result<Vec<Option<(NArray<T>, NArray<T>)>>> {
    params
        .iter()
        .map(|&p| {
            let value = graph.value(p)?.clone();
            Ok(graph.grad(p)?.map(|g| (value, g.clone())))
        })
        .collect()
}
