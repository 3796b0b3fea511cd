//! Generation-ordered backward traversal with gradient accumulation

use crate::error::{Error, Result};
use crate::op::OpNode;
use crate::variable::Variable;
use log::trace;
use ndarray::ArrayD;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::rc::Rc;

/// Worklist entry ordered by generation; the heap pops the deepest
/// unprocessed node first, so a node is only processed once all of its
/// downstream consumers have contributed their gradients.
struct Pending {
    node: Rc<OpNode>,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.node.generation() == other.node.generation()
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        self.node.generation().cmp(&other.node.generation())
    }
}

/// Traverse the graph from `seed` back to all roots, invoking each node's
/// gradient rule and summing the results into the inputs' gradients.
///
/// The seed gradient is initialized to ones when unset. Each node is
/// processed exactly once, in decreasing-generation order. Unless
/// `retain_grad` is set, the gradients of a node's outputs are released
/// right after the node is processed.
pub(crate) fn run(seed: &Variable, retain_grad: bool) -> Result<()> {
    {
        let mut inner = seed.inner.borrow_mut();
        if inner.grad.is_none() {
            let data = inner.data.as_ref().ok_or(Error::Uninitialized)?;
            inner.grad = Some(ArrayD::ones(data.raw_dim()));
        }
    }

    let creator = match seed.creator() {
        Some(creator) => creator,
        // Leaf: the seed gradient is set, there is nothing to propagate.
        None => return Ok(()),
    };

    let mut worklist = BinaryHeap::new();
    let mut seen: HashSet<*const OpNode> = HashSet::new();
    seen.insert(Rc::as_ptr(&creator));
    worklist.push(Pending { node: creator });

    while let Some(Pending { node }) = worklist.pop() {
        trace!("pop {}: gen={}", node.name(), node.generation());

        // One gradient per output, read through the weak links. A node
        // still in the worklist implies its outputs are still referenced.
        let mut gys = Vec::with_capacity(node.outputs.len());
        for weak in &node.outputs {
            let output = weak.upgrade().ok_or_else(|| {
                Error::GraphCorrupted(format!(
                    "output of `{}` dropped while its gradient was pending",
                    node.name()
                ))
            })?;
            let inner = output.borrow();
            let gy = match (&inner.grad, &inner.data) {
                (Some(grad), _) => grad.clone(),
                // An output nothing consumed contributes the sum identity.
                (None, Some(data)) => ArrayD::zeros(data.raw_dim()),
                (None, None) => return Err(Error::Uninitialized),
            };
            gys.push(gy);
        }
        let gys_ref: Vec<&ArrayD<f32>> = gys.iter().collect();
        let gxs = node.grad_inputs(&gys_ref)?;

        for (input, gx) in node.inputs().iter().zip(gxs) {
            input.accumulate_grad(gx);
            if let Some(parent) = input.creator() {
                if seen.insert(Rc::as_ptr(&parent)) {
                    worklist.push(Pending { node: parent });
                }
            }
        }

        if !retain_grad {
            for weak in &node.outputs {
                if let Some(output) = weak.upgrade() {
                    output.borrow_mut().grad = None;
                }
            }
        }
    }

    Ok(())
}
