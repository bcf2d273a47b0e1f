use std::sync::atomic::{AtomicU64, Ordering};

use petgraph::Graph as PetGraph;
use petgraph::{
    dot::{Config, Dot},
    graph::NodeIndex,
};

use super::Op;
use crate::{DType, Error, NArray, Result};

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(0);

/// Handle to a tensor recorded in a [`ComputeGraph`].
///
/// Handles are plain indices: they are only meaningful for the graph that
/// created them, and only until a [`ComputeGraph::reset_grad`] frees the slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tensor {
    graph: u64,
    index: usize,
    generation: u32,
}

impl Tensor {
    pub fn index(&self) -> usize {
        self.index
    }
}

pub(crate) struct Node<T: DType> {
    pub(crate) value: NArray<T>,
    pub(crate) grad: Option<NArray<T>>,
    pub(crate) requires_grad: bool,
    pub(crate) name: Option<String>,
    pub(crate) leaf: bool,
    /// `grad` was set by the caller since the last backward pass.
    pub(crate) seeded: bool,
}

struct Slot<T: DType> {
    generation: u32,
    node: Option<Node<T>>,
}

/// One recorded operation: `outputs = op(inputs)`.
#[derive(Clone, Debug)]
pub struct TapeEntry<T: DType> {
    pub op: Op<T>,
    pub inputs: Vec<Tensor>,
    pub outputs: Vec<Tensor>,
}

/// Arena of tensors plus the tape of operations recorded between them.
pub struct ComputeGraph<T: DType> {
    id: u64,
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    pub(crate) tape: Vec<TapeEntry<T>>,
}

impl<T: DType> Default for ComputeGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DType> ComputeGraph<T> {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
            free: Vec::new(),
            tape: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn alloc(&mut self, node: Node<T>) -> Tensor {
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index].node = Some(node);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        };
        Tensor {
            graph: self.id,
            index,
            generation: self.slots[index].generation,
        }
    }

    fn new_leaf(&mut self, value: NArray<T>, requires_grad: bool) -> Tensor {
        self.alloc(Node {
            value,
            grad: None,
            requires_grad,
            name: None,
            leaf: true,
            seeded: false,
        })
    }

    /// A leaf that does not track gradients.
    pub fn leaf(&mut self, value: NArray<T>) -> Tensor {
        self.new_leaf(value, false)
    }

    /// A leaf that tracks gradients, e.g. a trainable parameter.
    pub fn param(&mut self, value: NArray<T>) -> Tensor {
        self.new_leaf(value, true)
    }

    fn check(&self, t: Tensor) -> Result<()> {
        if t.graph != self.id {
            return Err(Error::IllegalGraphState(format!(
                "tensor #{} belongs to graph {}, not {}",
                t.index, t.graph, self.id
            ))
            .bt());
        }
        match self.slots.get(t.index) {
            Some(slot) if slot.generation == t.generation && slot.node.is_some() => Ok(()),
            _ => Err(Error::IllegalGraphState(format!(
                "tensor #{} was released by a reset",
                t.index
            ))
            .bt()),
        }
    }

    pub(crate) fn node(&self, t: Tensor) -> Result<&Node<T>> {
        self.check(t)?;
        self.slots[t.index]
            .node
            .as_ref()
            .ok_or_else(|| Error::IllegalGraphState(format!("tensor #{} is empty", t.index)))
    }

    pub(crate) fn node_mut(&mut self, t: Tensor) -> Result<&mut Node<T>> {
        self.check(t)?;
        self.slots[t.index]
            .node
            .as_mut()
            .ok_or_else(|| Error::IllegalGraphState(format!("tensor #{} is empty", t.index)))
    }

    pub fn value(&self, t: Tensor) -> Result<&NArray<T>> {
        Ok(&self.node(t)?.value)
    }

    pub fn grad(&self, t: Tensor) -> Result<Option<&NArray<T>>> {
        Ok(self.node(t)?.grad.as_ref())
    }

    /// Replaces the gradient. Setting the gradient of a root before
    /// [`ComputeGraph::backward`] makes it the seed of the next pass.
    pub fn set_grad(&mut self, t: Tensor, grad: NArray<T>) -> Result<()> {
        let node = self.node_mut(t)?;
        node.value.check_same_shape("set_grad", &grad)?;
        node.grad = Some(grad);
        node.seeded = true;
        Ok(())
    }

    /// Drops the gradient of `t`.
    pub fn zero_grad(&mut self, t: Tensor) -> Result<()> {
        let node = self.node_mut(t)?;
        node.grad = None;
        node.seeded = false;
        Ok(())
    }

    pub fn requires_grad(&self, t: Tensor) -> Result<bool> {
        Ok(self.node(t)?.requires_grad)
    }

    pub fn set_requires_grad(&mut self, t: Tensor, requires_grad: bool) -> Result<()> {
        self.node_mut(t)?.requires_grad = requires_grad;
        Ok(())
    }

    pub fn is_leaf(&self, t: Tensor) -> Result<bool> {
        Ok(self.node(t)?.leaf)
    }

    /// Debug label, used by [`ComputeGraph::to_dot`].
    pub fn set_name(&mut self, t: Tensor, name: impl Into<String>) -> Result<()> {
        self.node_mut(t)?.name = Some(name.into());
        Ok(())
    }

    pub fn name(&self, t: Tensor) -> Result<Option<&str>> {
        Ok(self.node(t)?.name.as_deref())
    }

    /// Leaves that require gradients, in creation order.
    pub fn parameters(&self) -> Vec<Tensor> {
        self.live()
            .filter(|(_, n)| n.leaf && n.requires_grad)
            .map(|(t, _)| t)
            .collect()
    }

    fn live(&self) -> impl Iterator<Item = (Tensor, &Node<T>)> + '_ {
        self.slots.iter().enumerate().filter_map(move |(index, slot)| {
            slot.node.as_ref().map(|n| {
                (
                    Tensor {
                        graph: self.id,
                        index,
                        generation: slot.generation,
                    },
                    n,
                )
            })
        })
    }

    /// Number of live tensors.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn tape(&self) -> &[TapeEntry<T>] {
        &self.tape
    }

    pub(crate) fn clear_grads(&mut self, leaves: bool) {
        for node in self.slots.iter_mut().filter_map(|s| s.node.as_mut()) {
            node.seeded = false;
            if leaves || !node.leaf {
                node.grad = None;
            }
        }
    }

    /// Frees every non-leaf slot; their handles become invalid.
    pub(crate) fn release_derived(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.node.as_ref().is_some_and(|n| !n.leaf) {
                slot.node = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index);
            }
        }
    }

    fn label(&self, t: Tensor) -> String {
        match self.node(t).ok().and_then(|n| n.name.clone()) {
            Some(name) => name,
            None => format!("#{}", t.index),
        }
    }

    /// The tape as a graph: tensor nodes and operation nodes, with edges
    /// from inputs to operations and from operations to outputs.
    pub fn to_petgraph(&self) -> PetGraph<String, ()> {
        let mut g = PetGraph::<String, ()>::new();
        let mut tensors: Vec<Option<NodeIndex>> = vec![None; self.slots.len()];

        let mut tensor_node = |g: &mut PetGraph<String, ()>, t: Tensor| -> NodeIndex {
            *tensors[t.index].get_or_insert_with(|| g.add_node(self.label(t)))
        };

        for entry in &self.tape {
            let op = g.add_node(entry.op.label());
            for &input in &entry.inputs {
                let src = tensor_node(&mut g, input);
                g.add_edge(src, op, ());
            }
            for &output in &entry.outputs {
                let dst = tensor_node(&mut g, output);
                g.add_edge(op, dst, ());
            }
        }
        g
    }

    /// Produce a DOT format string of the tape.
    pub fn to_dot(&self) -> String {
        let g = self.to_petgraph();
        format!("{:?}", Dot::with_config(&g, &[Config::EdgeNoLabel]))
    }
}
