//! # Derivar: Reverse-Mode Automatic Differentiation
//!
//! Derivar is the differentiation core underneath a small tensor library.
//! Numeric operations build a dynamic computational graph as they execute;
//! a single backward traversal then computes gradients of an output with
//! respect to every upstream input.
//!
//! ## Architecture
//!
//! - **variable**: graph node holding data, gradient, and provenance
//! - **op**: differentiable-operation trait and the invocation protocol
//! - **backward**: generation-ordered backward traversal
//! - **ops**: arithmetic, trigonometric, and reshape operations
//! - **context**: scoped mode flags (backprop recording, train/eval)
//!
//! ## Example
//!
//! ```
//! use derivar::{mul, Variable};
//!
//! let x = Variable::scalar(2.0);
//! let y = mul(&mul(&x, &x)?, &x)?; // y = x^3
//! y.backward(false)?;
//!
//! let grad = x.grad().expect("gradient accumulated");
//! assert_eq!(grad.sum(), 12.0); // dy/dx = 3x^2
//! # Ok::<(), derivar::Error>(())
//! ```

mod backward;
pub mod context;
pub mod error;
pub mod op;
pub mod ops;
pub mod variable;


// Re-export commonly used types
pub use context::{backprop_enabled, eval_mode, is_training, no_grad, using, ContextGuard, Flag};
pub use error::{Error, Result};
pub use op::{call, call1, Op, OpNode};
pub use ops::{add, cos, div, mul, neg, pow, rdiv, reshape, rsub, sin, sub, IntoVariable};
pub use variable::{DType, Variable};
