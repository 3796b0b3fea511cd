//! Differentiable operation trait and the graph invocation protocol

use crate::context;
use crate::error::{Error, Result};
use crate::variable::{VarInner, Variable};
use log::trace;
use ndarray::ArrayD;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// A differentiable operation.
///
/// Implementors supply the numeric forward computation and the matching
/// gradient rule; everything else (coercion, graph linking, generation
/// stamping) is handled by [`call`]. The default method bodies fail with
/// [`Error::NotImplemented`], so a partially-implemented operation errors at
/// the first use rather than silently producing wrong gradients.
pub trait Op {
    /// Identity used in errors and trace output.
    fn name(&self) -> &'static str;

    /// Pure numeric computation on raw arrays, one result per output.
    ///
    /// Takes `&mut self` so an operation can stash forward state its
    /// gradient rule needs (e.g. the input shape before a reshape).
    fn forward(&mut self, xs: &[&ArrayD<f32>]) -> Result<Vec<ArrayD<f32>>> {
        let _ = xs;
        Err(Error::NotImplemented {
            op: self.name(),
            method: "forward",
        })
    }

    /// Gradient rule: one gradient per input, given the recorded input data
    /// `xs` and one gradient per output `gys`. Must be a pure function of
    /// the stashed forward state and its arguments.
    fn backward(&self, xs: &[&ArrayD<f32>], gys: &[&ArrayD<f32>]) -> Result<Vec<ArrayD<f32>>> {
        let _ = (xs, gys);
        Err(Error::NotImplemented {
            op: self.name(),
            method: "backward",
        })
    }
}

/// A recorded operation in the computational graph.
///
/// The node owns its inputs (keeping the ancestry of any live output
/// reachable) and holds only weak references to its outputs, so an output
/// nobody else holds can be reclaimed without destroying its ancestors.
pub struct OpNode {
    op: Box<dyn Op>,
    inputs: Vec<Variable>,
    pub(crate) outputs: Vec<Weak<RefCell<VarInner>>>,
    generation: u32,
}

impl OpNode {
    /// Name of the underlying operation.
    pub fn name(&self) -> &'static str {
        self.op.name()
    }

    /// `max` of the input generations; outputs sit one generation above.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// The input variables, in call order.
    pub fn inputs(&self) -> &[Variable] {
        &self.inputs
    }

    /// Run the gradient rule against the recorded inputs.
    pub(crate) fn grad_inputs(&self, gys: &[&ArrayD<f32>]) -> Result<Vec<ArrayD<f32>>> {
        let xs: Vec<ArrayD<f32>> = self
            .inputs
            .iter()
            .map(Variable::raw_data)
            .collect::<Result<_>>()?;
        let xs_ref: Vec<&ArrayD<f32>> = xs.iter().collect();
        let gxs = self.op.backward(&xs_ref, gys)?;
        if gxs.len() != self.inputs.len() {
            return Err(Error::ArityMismatch {
                op: self.op.name(),
                expected: self.inputs.len(),
                got: gxs.len(),
            });
        }
        Ok(gxs)
    }
}

/// Invoke an operation on variables, producing output variables.
///
/// Runs the forward computation, then — only while backprop recording is
/// enabled — links inputs and outputs into the graph: the node's generation
/// becomes the max of the input generations, inputs are held strongly,
/// outputs weakly, and each output records the node as its creator. With
/// recording disabled the outputs are plain leaves and the node is dropped
/// on return.
pub fn call(mut op: Box<dyn Op>, inputs: &[Variable]) -> Result<Vec<Variable>> {
    let xs: Vec<ArrayD<f32>> = inputs
        .iter()
        .map(Variable::raw_data)
        .collect::<Result<_>>()?;
    let xs_ref: Vec<&ArrayD<f32>> = xs.iter().collect();
    let ys = op.forward(&xs_ref)?;
    let outputs: Vec<Variable> = ys.into_iter().map(Variable::new).collect();

    if context::backprop_enabled() {
        let generation = inputs.iter().map(Variable::generation).max().unwrap_or(0);
        trace!(
            "link {}: gen={} inputs={} outputs={}",
            op.name(),
            generation,
            inputs.len(),
            outputs.len()
        );
        let node = Rc::new(OpNode {
            op,
            inputs: inputs.to_vec(),
            outputs: outputs.iter().map(Variable::downgrade).collect(),
            generation,
        });
        for output in &outputs {
            output.set_creator(Rc::clone(&node));
        }
    }

    Ok(outputs)
}

/// [`call`] for single-output operations.
pub fn call1(op: Box<dyn Op>, inputs: &[Variable]) -> Result<Variable> {
    let name = op.name();
    let mut outputs = call(op, inputs)?;
    if outputs.len() != 1 {
        return Err(Error::ArityMismatch {
            op: name,
            expected: 1,
            got: outputs.len(),
        });
    }
    Ok(outputs.remove(0))
}
