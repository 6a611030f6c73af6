//! Storage errors.

use minidoc_core::RevisionError;
use serde::Serialize;
use thiserror::Error;

/// Storage errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("missing: {0}")]
    DocumentMissing(String),

    #[error("Invalid rev format: corrupted revision map, {rev} of {id} has no sequence")]
    CorruptRevisionMap { id: String, rev: String },

    #[error("_id is required for puts")]
    IdRequired,

    #[error("database {0} is already open")]
    AlreadyOpen(String),

    #[error("database {0} is not open")]
    NotOpen(String),

    #[error("Document update conflict: {0}")]
    Conflict(String),

    #[error("Invalid rev format: {0}")]
    InvalidRev(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Missing JSON list of 'docs'")]
    BatchMissingInput,

    #[error("storage corruption: {0}")]
    Corruption(String),

    #[error("counter overflow: {0}")]
    CounterOverflow(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Coarse error classes reported in bulk results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DocumentMissing,
    CorruptRevisionMap,
    IdRequired,
    AlreadyOpen,
    NotOpen,
    Conflict,
    InvalidRev,
    InvalidDocument,
    BatchMissingInput,
    Corruption,
    StoreIoFailure,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::DocumentMissing(_) => ErrorKind::DocumentMissing,
            StoreError::CorruptRevisionMap { .. } => ErrorKind::CorruptRevisionMap,
            StoreError::IdRequired => ErrorKind::IdRequired,
            StoreError::AlreadyOpen(_) => ErrorKind::AlreadyOpen,
            StoreError::NotOpen(_) => ErrorKind::NotOpen,
            StoreError::Conflict(_) => ErrorKind::Conflict,
            StoreError::InvalidRev(_) => ErrorKind::InvalidRev,
            StoreError::InvalidDocument(_) => ErrorKind::InvalidDocument,
            StoreError::BatchMissingInput => ErrorKind::BatchMissingInput,
            StoreError::Corruption(_)
            | StoreError::CounterOverflow(_)
            | StoreError::Serialization(_) => ErrorKind::Corruption,
            StoreError::Database(_) | StoreError::Io(_) => ErrorKind::StoreIoFailure,
        }
    }
}

impl From<RevisionError> for StoreError {
    fn from(err: RevisionError) -> Self {
        match err {
            RevisionError::DocumentMissing(reason) => StoreError::DocumentMissing(reason),
            RevisionError::Conflict(what) => StoreError::Conflict(what),
            RevisionError::InvalidRev(rev) => StoreError::InvalidRev(rev),
            RevisionError::InvalidDocument(why) => StoreError::InvalidDocument(why),
            RevisionError::EmptyTree(id) => {
                StoreError::Corruption(format!("revision tree of {id} has no leaves"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_errors_map_to_kinds() {
        let missing: StoreError = RevisionError::DocumentMissing("deleted".into()).into();
        assert_eq!(missing.kind(), ErrorKind::DocumentMissing);
        assert_eq!(missing.to_string(), "missing: deleted");

        let conflict: StoreError = RevisionError::Conflict("a".into()).into();
        assert_eq!(conflict.kind(), ErrorKind::Conflict);

        let empty: StoreError = RevisionError::EmptyTree("a".into()).into();
        assert_eq!(empty.kind(), ErrorKind::Corruption);
    }

    #[test]
    fn test_io_is_store_failure() {
        let err: StoreError = std::io::Error::other("ball").into();
        assert_eq!(err.kind(), ErrorKind::StoreIoFailure);
        assert!(err.to_string().contains("ball"));
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::StoreIoFailure).unwrap();
        assert_eq!(json, r#""store_io_failure""#);
    }
}
