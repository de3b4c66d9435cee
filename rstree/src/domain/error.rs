//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent malformed hierarchies.
/// Keys are carried in their display form so the error stays independent of
/// the key type a forest was built with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("record {position} has no usable `{field}` key")]
    MissingKey { position: usize, field: String },

    #[error("record {position} is not an object")]
    InvalidRecord { position: usize },

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("node {key} references unknown parent {parent}")]
    UnresolvedParent { key: String, parent: String },

    #[error("cycle detected in hierarchy at node: {0}")]
    CycleDetected(String),

    #[error("invalid key literal: {0}")]
    InvalidKey(String),

    #[error("tree depth {depth} exceeds limit {limit}")]
    TooDeep { depth: usize, limit: usize },
}

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;
