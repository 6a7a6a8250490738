//! Permission engine error types.

use thiserror::Error;
use trustgate_storage::StorageError;
use trustgate_types::TypeError;

/// Result type for permission engine operations.
pub type PermissionResult<T> = Result<T, PermissionError>;

/// Errors surfaced by write paths. Read paths fold these into a deny.
#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<TypeError> for PermissionError {
    fn from(err: TypeError) -> Self {
        PermissionError::Validation(err.to_string())
    }
}

impl PermissionError {
    pub fn is_validation(&self) -> bool {
        matches!(self, PermissionError::Validation(_))
    }
}
