//! Per-document metadata record.

use crate::rev_tree::RevTree;
use crate::revision::Revision;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything known about a document apart from its revision bodies.
///
/// `rev_map` links each stored revision to the sequence number its body was
/// written under. Entries are only ever added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub id: String,
    /// Whether the winning revision is deleted.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
    pub rev_tree: RevTree,
    /// Revision produced by the most recent write.
    pub rev: Revision,
    #[serde(default)]
    pub rev_map: BTreeMap<Revision, u32>,
}

impl DocumentMetadata {
    /// The winning revision, or `None` for an empty tree.
    pub fn winning_rev(&self) -> Option<Revision> {
        self.rev_tree.winning_rev()
    }

    /// Sequence number of a stored revision.
    pub fn sequence_of(&self, rev: &Revision) -> Option<u32> {
        self.rev_map.get(rev).copied()
    }
}
