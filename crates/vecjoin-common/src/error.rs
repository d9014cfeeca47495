use std::fmt::Display;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure classes surfaced by the execution core.
///
/// None of these are recovered from inside the core. A task that hits one
/// fails and the surrounding cluster runtime decides whether to reschedule it.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The plan references a column, position or type that does not match the
    /// batch layout or join shape it is applied to.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Reading or writing the shared hash-table storage failed.
    #[error("Storage error at {path}: {message}")]
    Storage { path: String, message: String },

    /// A persisted hash table is corrupt or was written by an incompatible
    /// format version.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Batch bookkeeping (size, selection, null array) is out of bounds.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn storage(path: impl Into<String>, err: impl Display) -> Self {
        Error::Storage {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub fn deserialization(msg: impl Into<String>) -> Self {
        Error::Deserialization(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Error::InvariantViolation(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Whether the failure came from reading shared storage or decoding what
    /// was read there.
    pub fn is_load_failure(&self) -> bool {
        matches!(self, Error::Storage { .. } | Error::Deserialization(_))
    }
}
