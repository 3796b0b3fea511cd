//! Variable: array value with gradient tracking

use crate::backward;
use crate::error::{Error, Result};
use crate::op::OpNode;
use ndarray::{ArrayD, Axis, IxDyn};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Element type of the arrays a [`Variable`] can hold.
///
/// The accepted set is closed; the engine stores single-precision floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    F32,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::F32 => write!(f, "f32"),
        }
    }
}

pub(crate) struct VarInner {
    pub(crate) data: Option<ArrayD<f32>>,
    pub(crate) name: Option<String>,
    pub(crate) grad: Option<ArrayD<f32>>,
    pub(crate) creator: Option<Rc<OpNode>>,
    pub(crate) generation: u32,
}

/// A node in the computational graph holding computed data, an accumulated
/// gradient, and a link to the operation that produced it.
///
/// `Variable` is a cheap handle; clones share the same underlying node.
/// Leaf variables (user inputs, constants, anything produced while graph
/// recording is off) have no creator and generation `0`.
#[derive(Clone)]
pub struct Variable {
    pub(crate) inner: Rc<RefCell<VarInner>>,
}

impl Variable {
    /// Create a leaf variable from an array.
    pub fn new(data: ArrayD<f32>) -> Self {
        Self::from_inner(Some(data))
    }

    /// Create a leaf variable, validating that `data` fills `shape` exactly.
    pub fn from_shape_vec(shape: &[usize], data: Vec<f32>) -> Result<Self> {
        let got = data.len();
        let array = ArrayD::from_shape_vec(IxDyn(shape), data).map_err(|_| Error::ShapeMismatch {
            expected: shape.to_vec(),
            got: vec![got],
        })?;
        Ok(Self::new(array))
    }

    /// Create a one-dimensional leaf variable from a vector.
    pub fn from_vec(data: Vec<f32>) -> Self {
        Self::new(ndarray::Array1::from(data).into_dyn())
    }

    /// Create a zero-dimensional leaf variable from a scalar.
    pub fn scalar(value: f32) -> Self {
        Self::new(ndarray::arr0(value).into_dyn())
    }

    /// Create an uninitialized placeholder with no data.
    pub fn placeholder() -> Self {
        Self::from_inner(None)
    }

    fn from_inner(data: Option<ArrayD<f32>>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(VarInner {
                data,
                name: None,
                grad: None,
                creator: None,
                generation: 0,
            })),
        }
    }

    /// Attach a label. The label has no semantic effect.
    pub fn with_name(self, name: impl Into<String>) -> Self {
        self.set_name(name);
        self
    }

    /// Set the label.
    pub fn set_name(&self, name: impl Into<String>) {
        self.inner.borrow_mut().name = Some(name.into());
    }

    /// The label, if any.
    pub fn name(&self) -> Option<String> {
        self.inner.borrow().name.clone()
    }

    /// A copy of the held data, or `None` for a placeholder.
    pub fn data(&self) -> Option<ArrayD<f32>> {
        self.inner.borrow().data.clone()
    }

    /// Replace the held data. Does not touch the gradient or the graph.
    pub fn set_data(&self, data: ArrayD<f32>) {
        self.inner.borrow_mut().data = Some(data);
    }

    pub(crate) fn raw_data(&self) -> Result<ArrayD<f32>> {
        self.inner.borrow().data.clone().ok_or(Error::Uninitialized)
    }

    /// The accumulated gradient, if one has been computed.
    pub fn grad(&self) -> Option<ArrayD<f32>> {
        self.inner.borrow().grad.clone()
    }

    /// Set the gradient, replacing any accumulated value.
    pub fn set_grad(&self, grad: ArrayD<f32>) {
        self.inner.borrow_mut().grad = Some(grad);
    }

    /// Add `grad` into the accumulated gradient. Gradients arriving through
    /// multiple paths sum; they never overwrite.
    pub fn accumulate_grad(&self, grad: ArrayD<f32>) {
        let mut inner = self.inner.borrow_mut();
        match inner.grad.as_mut() {
            Some(existing) => *existing = &*existing + &grad,
            None => inner.grad = Some(grad),
        }
    }

    /// Reset the gradient to unset.
    pub fn cleargrad(&self) {
        self.inner.borrow_mut().grad = None;
    }

    /// The operation that produced this variable, or `None` for a leaf.
    pub fn creator(&self) -> Option<Rc<OpNode>> {
        self.inner.borrow().creator.clone()
    }

    /// Record `op` as this variable's producer and stamp the generation.
    pub fn set_creator(&self, op: Rc<OpNode>) {
        let mut inner = self.inner.borrow_mut();
        inner.generation = op.generation() + 1;
        inner.creator = Some(op);
    }

    /// Sever the link to the producing operation, pruning this variable from
    /// future backward traversals. Data and gradient are untouched.
    pub fn unchain(&self) {
        self.inner.borrow_mut().creator = None;
    }

    /// Depth of this variable in the graph; `0` for leaves.
    pub fn generation(&self) -> u32 {
        self.inner.borrow().generation
    }

    /// Shape of the held data.
    ///
    /// # Panics
    ///
    /// Panics if this variable is an uninitialized placeholder.
    pub fn shape(&self) -> Vec<usize> {
        self.borrow_data("shape").shape().to_vec()
    }

    /// Number of dimensions of the held data.
    ///
    /// # Panics
    ///
    /// Panics if this variable is an uninitialized placeholder.
    pub fn ndim(&self) -> usize {
        self.borrow_data("ndim").ndim()
    }

    /// Total number of elements in the held data.
    ///
    /// # Panics
    ///
    /// Panics if this variable is an uninitialized placeholder.
    pub fn size(&self) -> usize {
        self.borrow_data("size").len()
    }

    /// Count along the first axis.
    ///
    /// # Panics
    ///
    /// Panics if this variable is an uninitialized placeholder or holds a
    /// zero-dimensional array.
    pub fn len(&self) -> usize {
        self.borrow_data("len").len_of(Axis(0))
    }

    /// Whether the first axis is empty. See [`Variable::len`].
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type of the held data.
    pub fn dtype(&self) -> DType {
        DType::F32
    }

    fn borrow_data(&self, accessor: &str) -> std::cell::Ref<'_, ArrayD<f32>> {
        std::cell::Ref::map(self.inner.borrow(), |inner| match inner.data.as_ref() {
            Some(data) => data,
            None => panic!("`{accessor}` on an uninitialized variable"),
        })
    }

    /// Compute gradients of this variable with respect to every upstream
    /// input. Seeds the gradient with ones if unset; does nothing beyond
    /// seeding when this variable has no creator.
    ///
    /// Unless `retain_grad` is set, intermediate gradients are released as
    /// the traversal moves past them; only leaf gradients survive.
    pub fn backward(&self, retain_grad: bool) -> Result<()> {
        backward::run(self, retain_grad)
    }

    /// Like [`Variable::backward`], but seeds the traversal with an explicit
    /// output gradient instead of ones.
    pub fn backward_with(&self, grad: ArrayD<f32>, retain_grad: bool) -> Result<()> {
        self.set_grad(grad);
        backward::run(self, retain_grad)
    }

    /// Return a variable with the given shape sharing this one's element
    /// order. A same-shape request returns this very handle and adds no
    /// operation to the graph.
    pub fn reshape(&self, shape: &[usize]) -> Result<Variable> {
        crate::ops::reshape(self, shape)
    }

    /// Whether two handles refer to the same graph node.
    pub fn ptr_eq(&self, other: &Variable) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<RefCell<VarInner>> {
        Rc::downgrade(&self.inner)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.borrow().data.as_ref() {
            Some(data) => write!(f, "variable({data})"),
            None => write!(f, "variable(None)"),
        }
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Variable")
            .field("data", &inner.data)
            .field("grad", &inner.grad)
            .field("generation", &inner.generation)
            .field("has_creator", &inner.creator.is_some())
            .finish()
    }
}
