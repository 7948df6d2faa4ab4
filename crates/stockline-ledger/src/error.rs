use stockline_crypto::HasherError;
use stockline_types::{BlockStatus, TypeError};

/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("block {index} not found")]
    NotFound { index: u64 },

    #[error("block {index} already processed (status {current})")]
    InvalidTransition { index: u64, current: BlockStatus },

    #[error("integrity violation at index {index}: {reason}")]
    IntegrityViolation { index: u64, reason: String },

    #[error("corrupt write-ahead log at offset {offset}: {reason}")]
    CorruptLog { offset: u64, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    pub(crate) fn poisoned(what: &str) -> Self {
        Self::Storage(format!("{what} lock poisoned"))
    }

    /// Whether this error originates in durable storage rather than in the
    /// caller's request.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::CorruptLog { .. } | Self::Serialization(_)
        )
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<TypeError> for LedgerError {
    fn from(e: TypeError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<HasherError> for LedgerError {
    fn from(e: HasherError) -> Self {
        Self::Serialization(e.to_string())
    }
}
