use tracing::{debug, trace};

use super::{ComputeGraph, Tensor};
use crate::{DType, Error, NArray, Order, Result};

impl<T: DType> ComputeGraph<T> {
    /// Reverse-mode pass from `root`.
    ///
    /// The seed is the gradient given to [`ComputeGraph::set_grad`] since the
    /// last pass if any, otherwise ones when `root` holds a single element.
    /// Gradients left on `root` by an earlier pass are never reused as seed.
    pub fn backward(&mut self, root: Tensor) -> Result<()> {
        let node = self.node(root)?;
        let seed = match &node.grad {
            Some(grad) if node.seeded => grad.clone(),
            _ if node.value.size() == 1 => node.value.ones_like(),
            _ => {
                return Err(Error::MissingGradient(format!(
                    "root #{} has shape {} and no seed gradient",
                    root.index(),
                    node.value.shape()
                ))
                .bt())
            }
        };
        self.backward_with(root, seed)
    }

    /// Reverse-mode pass from `root`, seeded with `seed`.
    ///
    /// Gradients of leaves accumulate across calls; gradients of derived
    /// tensors are recomputed.
    pub fn backward_with(&mut self, root: Tensor, seed: NArray<T>) -> Result<()> {
        self.node(root)?.value.check_same_shape("backward", &seed)?;
        // The seed may be the root's own gradient, copy before clearing.
        let seed = seed.copy(Order::C);
        self.clear_grads(false);
        self.node_mut(root)?.grad = Some(seed);
        debug!(graph = self.id(), entries = self.tape.len(), "backward start");

        for i in (0..self.tape.len()).rev() {
            let entry = &self.tape[i];
            let mut out_grads = Vec::with_capacity(entry.outputs.len());
            let mut reached = false;
            for &t in &entry.outputs {
                let node = self.node(t)?;
                match &node.grad {
                    Some(g) => {
                        reached = true;
                        out_grads.push(g.clone());
                    }
                    None => out_grads.push(node.value.zeros_like()),
                }
            }
            if !reached {
                trace!(entry = i, op = %entry.op.label(), "not reached, skipped");
                continue;
            }
            trace!(entry = i, op = %entry.op.label(), "backward");

            let inputs = entry
                .inputs
                .iter()
                .map(|&t| self.value(t))
                .collect::<Result<Vec<_>>>()?;
            let outputs = entry
                .outputs
                .iter()
                .map(|&t| self.value(t))
                .collect::<Result<Vec<_>>>()?;
            let needs = entry
                .inputs
                .iter()
                .map(|&t| self.requires_grad(t))
                .collect::<Result<Vec<_>>>()?;
            let grads = entry.op.backward(
                &inputs,
                &outputs,
                &out_grads.iter().collect::<Vec<_>>(),
                &needs,
            )?;

            let targets = entry.inputs.clone();
            for (t, contribution) in targets.into_iter().zip(grads) {
                if let Some(c) = contribution {
                    self.accumulate(t, c)?;
                }
            }
        }
        debug!(graph = self.id(), "backward done");
        Ok(())
    }

    /// Adds `contribution` into the gradient of `t` without touching any
    /// existing gradient array.
    fn accumulate(&mut self, t: Tensor, contribution: NArray<T>) -> Result<()> {
        let node = self.node_mut(t)?;
        if !node.requires_grad {
            return Ok(());
        }
        let grad = match &node.grad {
            Some(existing) => existing.add(&contribution)?,
            None => contribution.copy(Order::C),
        };
        node.grad = Some(grad);
        Ok(())
    }

    /// Clears every gradient and the tape, and releases all derived tensors.
    ///
    /// Leaves and their `requires_grad` flags survive; handles to derived
    /// tensors become invalid.
    pub fn reset_grad(&mut self) {
        let entries = self.tape.len();
        self.clear_grads(true);
        self.tape.clear();
        self.release_derived();
        debug!(graph = self.id(), entries, "graph reset");
    }
}
