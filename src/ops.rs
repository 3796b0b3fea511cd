//! Concrete differentiable operations and their call surface
//!
//! Each operation comes in two parts: a variant implementing [`Op`] with the
//! numeric forward and its gradient rule, and a free function that coerces
//! raw operands and goes through the invocation protocol.

use crate::error::{Error, Result};
use crate::op::{call1, Op};
use crate::variable::Variable;
use ndarray::{ArrayD, IxDyn};

/// Coercion of raw operands into graph leaves.
///
/// Scalars are promoted to zero-dimensional arrays; existing variables pass
/// through as the same graph node.
pub trait IntoVariable {
    fn into_variable(self) -> Variable;
}

impl IntoVariable for Variable {
    fn into_variable(self) -> Variable {
        self
    }
}

impl IntoVariable for &Variable {
    fn into_variable(self) -> Variable {
        self.clone()
    }
}

impl IntoVariable for f32 {
    fn into_variable(self) -> Variable {
        Variable::scalar(self)
    }
}

impl IntoVariable for f64 {
    fn into_variable(self) -> Variable {
        Variable::scalar(self as f32)
    }
}

impl IntoVariable for ArrayD<f32> {
    fn into_variable(self) -> Variable {
        Variable::new(self)
    }
}

struct Add;

impl Op for Add {
    fn name(&self) -> &'static str {
        "add"
    }

    fn forward(&mut self, xs: &[&ArrayD<f32>]) -> Result<Vec<ArrayD<f32>>> {
        Ok(vec![xs[0] + xs[1]])
    }

    fn backward(&self, _xs: &[&ArrayD<f32>], gys: &[&ArrayD<f32>]) -> Result<Vec<ArrayD<f32>>> {
        Ok(vec![gys[0].clone(), gys[0].clone()])
    }
}

/// Elementwise addition.
pub fn add(x0: &Variable, x1: impl IntoVariable) -> Result<Variable> {
    call1(Box::new(Add), &[x0.clone(), x1.into_variable()])
}

struct Mul;

impl Op for Mul {
    fn name(&self) -> &'static str {
        "mul"
    }

    fn forward(&mut self, xs: &[&ArrayD<f32>]) -> Result<Vec<ArrayD<f32>>> {
        Ok(vec![xs[0] * xs[1]])
    }

    fn backward(&self, xs: &[&ArrayD<f32>], gys: &[&ArrayD<f32>]) -> Result<Vec<ArrayD<f32>>> {
        let gx0 = gys[0] * xs[1];
        let gx1 = gys[0] * xs[0];
        Ok(vec![gx0, gx1])
    }
}

/// Elementwise multiplication.
pub fn mul(x0: &Variable, x1: impl IntoVariable) -> Result<Variable> {
    call1(Box::new(Mul), &[x0.clone(), x1.into_variable()])
}

struct Neg;

impl Op for Neg {
    fn name(&self) -> &'static str {
        "neg"
    }

    fn forward(&mut self, xs: &[&ArrayD<f32>]) -> Result<Vec<ArrayD<f32>>> {
        Ok(vec![xs[0].mapv(|v| -v)])
    }

    fn backward(&self, _xs: &[&ArrayD<f32>], gys: &[&ArrayD<f32>]) -> Result<Vec<ArrayD<f32>>> {
        Ok(vec![gys[0].mapv(|v| -v)])
    }
}

/// Elementwise negation.
pub fn neg(x: &Variable) -> Result<Variable> {
    call1(Box::new(Neg), &[x.clone()])
}

struct Sub;

impl Op for Sub {
    fn name(&self) -> &'static str {
        "sub"
    }

    fn forward(&mut self, xs: &[&ArrayD<f32>]) -> Result<Vec<ArrayD<f32>>> {
        Ok(vec![xs[0] - xs[1]])
    }

    fn backward(&self, _xs: &[&ArrayD<f32>], gys: &[&ArrayD<f32>]) -> Result<Vec<ArrayD<f32>>> {
        Ok(vec![gys[0].clone(), gys[0].mapv(|v| -v)])
    }
}

/// Elementwise subtraction, `x0 - x1`.
pub fn sub(x0: &Variable, x1: impl IntoVariable) -> Result<Variable> {
    call1(Box::new(Sub), &[x0.clone(), x1.into_variable()])
}

/// Reflected subtraction, `x1 - x0`.
pub fn rsub(x0: &Variable, x1: impl IntoVariable) -> Result<Variable> {
    call1(Box::new(Sub), &[x1.into_variable(), x0.clone()])
}

struct Div;

impl Op for Div {
    fn name(&self) -> &'static str {
        "div"
    }

    fn forward(&mut self, xs: &[&ArrayD<f32>]) -> Result<Vec<ArrayD<f32>>> {
        Ok(vec![xs[0] / xs[1]])
    }

    fn backward(&self, xs: &[&ArrayD<f32>], gys: &[&ArrayD<f32>]) -> Result<Vec<ArrayD<f32>>> {
        // d(x0/x1)/dx0 = 1/x1, d(x0/x1)/dx1 = -x0/x1^2
        let gx0 = gys[0] / xs[1];
        let gx1 = -(gys[0] * xs[0]) / (xs[1] * xs[1]);
        Ok(vec![gx0, gx1])
    }
}

/// Elementwise division, `x0 / x1`.
pub fn div(x0: &Variable, x1: impl IntoVariable) -> Result<Variable> {
    call1(Box::new(Div), &[x0.clone(), x1.into_variable()])
}

/// Reflected division, `x1 / x0`.
pub fn rdiv(x0: &Variable, x1: impl IntoVariable) -> Result<Variable> {
    call1(Box::new(Div), &[x1.into_variable(), x0.clone()])
}

struct Pow {
    c: f32,
}

impl Op for Pow {
    fn name(&self) -> &'static str {
        "pow"
    }

    fn forward(&mut self, xs: &[&ArrayD<f32>]) -> Result<Vec<ArrayD<f32>>> {
        Ok(vec![xs[0].mapv(|v| v.powf(self.c))])
    }

    fn backward(&self, xs: &[&ArrayD<f32>], gys: &[&ArrayD<f32>]) -> Result<Vec<ArrayD<f32>>> {
        let gx = xs[0].mapv(|v| self.c * v.powf(self.c - 1.0)) * gys[0];
        Ok(vec![gx])
    }
}

/// Elementwise power with a fixed exponent.
pub fn pow(x: &Variable, c: f32) -> Result<Variable> {
    call1(Box::new(Pow { c }), &[x.clone()])
}

struct Sin;

impl Op for Sin {
    fn name(&self) -> &'static str {
        "sin"
    }

    fn forward(&mut self, xs: &[&ArrayD<f32>]) -> Result<Vec<ArrayD<f32>>> {
        Ok(vec![xs[0].mapv(f32::sin)])
    }

    fn backward(&self, xs: &[&ArrayD<f32>], gys: &[&ArrayD<f32>]) -> Result<Vec<ArrayD<f32>>> {
        Ok(vec![gys[0] * &xs[0].mapv(f32::cos)])
    }
}

/// Elementwise sine.
pub fn sin(x: &Variable) -> Result<Variable> {
    call1(Box::new(Sin), &[x.clone()])
}

struct Cos;

impl Op for Cos {
    fn name(&self) -> &'static str {
        "cos"
    }

    fn forward(&mut self, xs: &[&ArrayD<f32>]) -> Result<Vec<ArrayD<f32>>> {
        Ok(vec![xs[0].mapv(f32::cos)])
    }

    fn backward(&self, xs: &[&ArrayD<f32>], gys: &[&ArrayD<f32>]) -> Result<Vec<ArrayD<f32>>> {
        Ok(vec![gys[0] * &xs[0].mapv(|v| -v.sin())])
    }
}

/// Elementwise cosine.
pub fn cos(x: &Variable) -> Result<Variable> {
    call1(Box::new(Cos), &[x.clone()])
}

struct Reshape {
    shape: Vec<usize>,
    // Input shape, stashed by forward for the gradient rule.
    x_shape: Option<Vec<usize>>,
}

impl Reshape {
    fn rearrange(data: &ArrayD<f32>, shape: &[usize]) -> Result<ArrayD<f32>> {
        ArrayD::from_shape_vec(IxDyn(shape), data.iter().copied().collect()).map_err(|_| {
            Error::ShapeMismatch {
                expected: shape.to_vec(),
                got: data.shape().to_vec(),
            }
        })
    }
}

impl Op for Reshape {
    fn name(&self) -> &'static str {
        "reshape"
    }

    fn forward(&mut self, xs: &[&ArrayD<f32>]) -> Result<Vec<ArrayD<f32>>> {
        self.x_shape = Some(xs[0].shape().to_vec());
        Ok(vec![Self::rearrange(xs[0], &self.shape)?])
    }

    fn backward(&self, _xs: &[&ArrayD<f32>], gys: &[&ArrayD<f32>]) -> Result<Vec<ArrayD<f32>>> {
        let x_shape = self.x_shape.as_ref().ok_or_else(|| {
            Error::GraphCorrupted("reshape gradient requested before forward".into())
        })?;
        Ok(vec![Self::rearrange(gys[0], x_shape)?])
    }
}

/// Reshape to `shape`, preserving element order.
///
/// Requesting the current shape returns the same graph node and records no
/// operation.
pub fn reshape(x: &Variable, shape: &[usize]) -> Result<Variable> {
    if x.shape() == shape {
        return Ok(x.clone());
    }
    call1(
        Box::new(Reshape {
            shape: shape.to_vec(),
            x_shape: None,
        }),
        &[x.clone()],
    )
}
