//! Revision merge policy.
//!
//! The storage engine never builds revision trees itself. It hands the prior
//! metadata and the incoming edit to a [`RevisionPolicy`] and persists what
//! comes back.

use crate::document::Document;
use crate::error::{Result, RevisionError};
use crate::hash::revision_digest;
use crate::metadata::DocumentMetadata;
use crate::rev_tree::RevTree;
use crate::revision::Revision;

/// How an edit relates to the stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Insert,
    Update,
    Delete,
}

/// Outcome of merging one edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Updated metadata. `rev_map` is carried over from the prior record;
    /// mapping `metadata.rev` to a sequence is up to the writer.
    pub metadata: DocumentMetadata,
    pub kind: EditKind,
    /// Whether the revision created by this edit is a deletion.
    pub new_rev_deleted: bool,
    pub winning_rev: Revision,
    pub winning_deleted: bool,
}

/// Merges an edit into a document's history.
pub trait RevisionPolicy: Send + Sync {
    fn resolve(&self, prior: Option<&DocumentMetadata>, edit: &Document) -> Result<Resolution>;
}

/// Default policy: every edit must extend a current branch head.
///
/// - New documents get a root revision `1-<digest>`.
/// - Edits to a live document must name one of its leaves in `rev`.
/// - A document whose winning revision is deleted may be recreated without
///   `rev`; the new revision continues from the deleted head.
/// - Deleting something that is not currently live is `DocumentMissing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeMerge;

impl RevisionPolicy for TreeMerge {
    fn resolve(&self, prior: Option<&DocumentMetadata>, edit: &Document) -> Result<Resolution> {
        let body = serde_json::to_vec(&edit.body)
            .map_err(|e| RevisionError::InvalidDocument(e.to_string()))?;

        let Some(prior) = prior else {
            return insert(edit, &body);
        };

        let winning = prior
            .winning_rev()
            .ok_or_else(|| RevisionError::EmptyTree(prior.id.clone()))?;

        let parent = match &edit.rev {
            Some(rev) if prior.rev_tree.is_leaf(rev) => rev.clone(),
            Some(rev) => return Err(RevisionError::Conflict(format!("{} at {rev}", edit.id))),
            None if prior.deleted => winning,
            None => return Err(RevisionError::Conflict(edit.id.clone())),
        };

        if edit.deleted && prior.rev_tree.is_deleted(&parent) {
            return Err(RevisionError::DocumentMissing("deleted".to_string()));
        }

        let parent_str = parent.to_string();
        let rev = parent.child(revision_digest(Some(&parent_str), edit.deleted, &body).to_hex());

        let mut rev_tree = prior.rev_tree.clone();
        if !rev_tree.extend(&parent, rev.hash.clone(), edit.deleted) {
            return Err(RevisionError::Conflict(format!("{} at {rev}", edit.id)));
        }

        let winning_rev = rev_tree
            .winning_rev()
            .ok_or_else(|| RevisionError::EmptyTree(prior.id.clone()))?;
        let winning_deleted = rev_tree.is_deleted(&winning_rev);

        Ok(Resolution {
            metadata: DocumentMetadata {
                id: prior.id.clone(),
                deleted: winning_deleted,
                rev_tree,
                rev,
                rev_map: prior.rev_map.clone(),
            },
            kind: if edit.deleted {
                EditKind::Delete
            } else {
                EditKind::Update
            },
            new_rev_deleted: edit.deleted,
            winning_rev,
            winning_deleted,
        })
    }
}

fn insert(edit: &Document, body: &[u8]) -> Result<Resolution> {
    if edit.deleted {
        return Err(RevisionError::DocumentMissing("missing".to_string()));
    }
    if let Some(rev) = &edit.rev {
        return Err(RevisionError::Conflict(format!("{} at {rev}", edit.id)));
    }

    let rev = Revision::new(1, revision_digest(None, false, body).to_hex());

    Ok(Resolution {
        metadata: DocumentMetadata {
            id: edit.id.clone(),
            deleted: false,
            rev_tree: RevTree::with_root(&rev, false),
            rev: rev.clone(),
            rev_map: Default::default(),
        },
        kind: EditKind::Insert,
        new_rev_deleted: false,
        winning_rev: rev,
        winning_deleted: false,
    })
}
