//! Error types for the permission data model.

use thiserror::Error;

/// Result type for type-level parsing and validation.
pub type TypeResult<T> = Result<T, TypeError>;

/// Errors raised while parsing or validating permission records.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown permission category: {0}")]
    UnknownCategory(String),

    #[error("invalid ACL rule: {0}")]
    InvalidAclRule(String),

    #[error("invalid rule for category {category}: {reason}")]
    InvalidRule { category: String, reason: String },
}
