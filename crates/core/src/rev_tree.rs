//! Revision trees.
//!
//! A document's history is a forest of paths. Each path starts at a root
//! generation `pos` and nests nodes as `[hash, info, children]`:
//!
//! ```text
//! [{ "pos": 1, "ids": ["ff00..", {"status": "available"}, [
//!       ["0875..", {"status": "available", "deleted": true}, []]
//! ]]}]
//! ```
//!
//! Leaves are the heads of branches. The winning revision is the leaf that
//! is not deleted, then has the highest generation, then the highest hash.

use crate::revision::Revision;
use serde::{Deserialize, Serialize};

/// Availability of a revision body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevStatus {
    Available,
    Missing,
}

/// Per-node flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevInfo {
    pub status: RevStatus,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
}

impl RevInfo {
    pub fn available(deleted: bool) -> Self {
        Self {
            status: RevStatus::Available,
            deleted,
        }
    }
}

/// A node: `(hash, info, children)`, serialized as a three-element array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevNode(pub String, pub RevInfo, pub Vec<RevNode>);

impl RevNode {
    /// A node with no children.
    pub fn leaf(hash: impl Into<String>, deleted: bool) -> Self {
        Self(hash.into(), RevInfo::available(deleted), Vec::new())
    }

    pub fn hash(&self) -> &str {
        &self.0
    }

    pub fn info(&self) -> &RevInfo {
        &self.1
    }

    pub fn children(&self) -> &[RevNode] {
        &self.2
    }

    pub fn is_leaf(&self) -> bool {
        self.2.is_empty()
    }
}

/// One rooted path of the forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevPath {
    pub pos: u64,
    pub ids: RevNode,
}

/// A branch head together with its ancestry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub rev: Revision,
    pub deleted: bool,
    /// Revisions from the path root down to (and including) this leaf.
    pub history: Vec<Revision>,
}

/// The full revision forest of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevTree(pub Vec<RevPath>);

impl RevTree {
    /// A tree holding a single root revision.
    pub fn with_root(rev: &Revision, deleted: bool) -> Self {
        Self(vec![RevPath {
            pos: rev.pos,
            ids: RevNode::leaf(rev.hash.clone(), deleted),
        }])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All branch heads, each with the revisions leading to it.
    pub fn leaves(&self) -> Vec<Leaf> {
        let mut leaves = Vec::new();
        let mut stack: Vec<(u64, &RevNode, Vec<Revision>)> = self
            .0
            .iter()
            .map(|path| (path.pos, &path.ids, Vec::new()))
            .collect();

        while let Some((pos, node, mut history)) = stack.pop() {
            let rev = Revision::new(pos, node.hash());
            history.push(rev.clone());

            if node.is_leaf() {
                leaves.push(Leaf {
                    rev,
                    deleted: node.info().deleted,
                    history,
                });
                continue;
            }

            for child in node.children() {
                stack.push((pos + 1, child, history.clone()));
            }
        }

        leaves
    }

    /// The canonical revision among all branch heads.
    pub fn winning_rev(&self) -> Option<Revision> {
        self.leaves()
            .into_iter()
            .max_by(|a, b| {
                (!a.deleted, a.rev.pos, &a.rev.hash).cmp(&(!b.deleted, b.rev.pos, &b.rev.hash))
            })
            .map(|leaf| leaf.rev)
    }

    /// Flags of a revision, if it is part of the tree.
    pub fn find(&self, rev: &Revision) -> Option<&RevInfo> {
        self.0
            .iter()
            .find_map(|path| find_node(&path.ids, path.pos, rev))
            .map(RevNode::info)
    }

    pub fn contains(&self, rev: &Revision) -> bool {
        self.find(rev).is_some()
    }

    /// Whether `rev` is marked deleted. Unknown revisions are not deleted.
    pub fn is_deleted(&self, rev: &Revision) -> bool {
        self.find(rev).is_some_and(|info| info.deleted)
    }

    /// Whether `rev` is a branch head.
    pub fn is_leaf(&self, rev: &Revision) -> bool {
        self.0
            .iter()
            .find_map(|path| find_node(&path.ids, path.pos, rev))
            .is_some_and(RevNode::is_leaf)
    }

    /// The branch head reached by following `rev`'s descendants.
    ///
    /// When `rev` has been forked, the winning head among its descendants is
    /// returned.
    pub fn latest(&self, rev: &Revision) -> Option<Revision> {
        self.leaves()
            .into_iter()
            .filter(|leaf| leaf.history.contains(rev))
            .max_by(|a, b| {
                (!a.deleted, a.rev.pos, &a.rev.hash).cmp(&(!b.deleted, b.rev.pos, &b.rev.hash))
            })
            .map(|leaf| leaf.rev)
    }

    /// Append a new head under `parent`.
    ///
    /// Returns `false` when `parent` is not in the tree or already has a
    /// child with the same hash.
    pub fn extend(&mut self, parent: &Revision, hash: impl Into<String>, deleted: bool) -> bool {
        let hash = hash.into();
        for path in &mut self.0 {
            if let Some(node) = find_node_mut(&mut path.ids, path.pos, parent) {
                if node.2.iter().any(|child| child.0 == hash) {
                    return false;
                }
                node.2.push(RevNode::leaf(hash, deleted));
                return true;
            }
        }
        false
    }

    /// Start a new rooted path.
    pub fn add_root(&mut self, rev: &Revision, deleted: bool) {
        self.0.push(RevPath {
            pos: rev.pos,
            ids: RevNode::leaf(rev.hash.clone(), deleted),
        });
    }
}

fn find_node<'a>(node: &'a RevNode, pos: u64, target: &Revision) -> Option<&'a RevNode> {
    if pos == target.pos {
        return (node.0 == target.hash).then_some(node);
    }
    if pos > target.pos {
        return None;
    }
    node.2
        .iter()
        .find_map(|child| find_node(child, pos + 1, target))
}

fn find_node_mut<'a>(node: &'a mut RevNode, pos: u64, target: &Revision) -> Option<&'a mut RevNode> {
    if pos == target.pos {
        return (node.0 == target.hash).then_some(node);
    }
    if pos > target.pos {
        return None;
    }
    node.2
        .iter_mut()
        .find_map(|child| find_node_mut(child, pos + 1, target))
}
