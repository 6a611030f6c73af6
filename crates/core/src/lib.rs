//! Document and revision model for minidoc.
//!
//! This crate provides the types the storage layer persists:
//! - Document edits and their reserved `_id` / `_rev` / `_deleted` fields
//! - Revision identifiers and Blake3 revision digests
//! - Revision trees and winning-revision selection
//! - Per-document metadata
//! - The pluggable merge policy that turns an edit into new metadata

pub mod document;
pub mod error;
pub mod hash;
pub mod metadata;
pub mod policy;
pub mod rev_tree;
pub mod revision;

// Re-export commonly used types at the crate root
pub use document::{with_identity, Document};
pub use error::{Result, RevisionError};
pub use hash::{revision_digest, RevHash};
pub use metadata::DocumentMetadata;
pub use policy::{EditKind, Resolution, RevisionPolicy, TreeMerge};
pub use rev_tree::{Leaf, RevInfo, RevNode, RevPath, RevStatus, RevTree};
pub use revision::Revision;
