use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("product must not be empty")]
    EmptyProduct,

    #[error("quantity change {0} is out of range")]
    QuantityOutOfRange(i64),

    #[error("unknown block status: {0}")]
    UnknownStatus(String),
}
