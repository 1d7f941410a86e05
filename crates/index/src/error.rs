//! Index and merge-policy errors

use tc_core::SchemaError;
use thiserror::Error;

/// Configuration error: always fatal to the operation, never retried
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Missing mandatory key '{key}' for {owner}")]
    MissingKey { owner: String, key: String },
    #[error("Key '{key}' expects a {expected} value, got {actual}")]
    WrongType {
        key: String,
        expected: &'static str,
        actual: String,
    },
    #[error("All arguments should have been claimed by {owner} but some ({keys:?}) remain")]
    UnclaimedArgs { owner: String, keys: Vec<String> },
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Name resolution failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstantiationError {
    #[error("Unknown merge policy factory class: {0}")]
    UnknownClass(String),
}

/// Error raised while building a merge policy
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Instantiation(#[from] InstantiationError),
}

/// Index writer errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndexError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("Index writer is closed")]
    Closed,
    #[error("Merge thread panicked: {0}")]
    MergeFailed(String),
}
