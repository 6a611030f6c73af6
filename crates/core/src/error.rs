//! Errors raised while interpreting documents and revisions.

use thiserror::Error;

/// Errors produced by the revision model and the merge policy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RevisionError {
    #[error("missing: {0}")]
    DocumentMissing(String),

    #[error("Document update conflict: {0}")]
    Conflict(String),

    #[error("Invalid rev format: {0}")]
    InvalidRev(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("revision tree of {0} has no leaves")]
    EmptyTree(String),
}

/// Result type for revision operations.
pub type Result<T> = std::result::Result<T, RevisionError>;
