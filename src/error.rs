//! Error types for Derivar

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Operation `{op}` does not implement `{method}`")]
    NotImplemented {
        op: &'static str,
        method: &'static str,
    },

    #[error("Operation `{op}` produced {got} results, expected {expected}")]
    ArityMismatch {
        op: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Variable holds no data")]
    Uninitialized,

    #[error("Computational graph corrupted: {0}")]
    GraphCorrupted(String),
}

pub type Result<T> = std::result::Result<T, Error>;
