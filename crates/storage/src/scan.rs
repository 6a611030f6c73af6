//! Paginated listing over the metadata namespace.

use crate::backend::ByteStore;
use crate::engine::StoreHandle;
use crate::error::{Result, StoreError};
use crate::keys;
use minidoc_core::{with_identity, DocumentMetadata, Revision};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Whether deleted documents show up in range listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletedPolicy {
    #[default]
    Exclude,
    Include,
}

/// Options for [`StoreHandle::list_documents`].
#[derive(Debug, Clone)]
pub struct ListOptions {
    /// First id to visit (inclusive). Defaults to the start of the namespace.
    pub start_key: Option<String>,
    /// Last id to visit. Defaults to the end of the namespace.
    pub end_key: Option<String>,
    pub inclusive_end: bool,
    /// Entries to pass over before collecting, deleted ones included.
    pub skip: usize,
    /// Maximum entries visited after `skip`.
    pub limit: Option<usize>,
    /// Explicit ids, returned in this order. Overrides the range options.
    pub keys: Option<Vec<String>>,
    /// Single id, same as `keys: [key]`.
    pub key: Option<String>,
    pub include_docs: bool,
    pub deleted: DeletedPolicy,
    /// Report the store's update sequence in the result.
    pub update_seq: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            start_key: None,
            end_key: None,
            inclusive_end: true,
            skip: 0,
            limit: None,
            keys: None,
            key: None,
            include_docs: false,
            deleted: DeletedPolicy::Exclude,
            update_seq: false,
        }
    }
}

impl ListOptions {
    /// Ids requested explicitly, if any.
    fn requested_keys(&self) -> Option<Vec<String>> {
        match (&self.keys, &self.key) {
            (Some(keys), _) => Some(keys.clone()),
            (None, Some(key)) => Some(vec![key.clone()]),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowValue {
    pub rev: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
}

/// A listed document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocRow {
    pub id: String,
    pub key: String,
    pub value: RowValue,
    /// Present only with `include_docs`; `null` for deleted documents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ListRow {
    Found(DocRow),
    /// An explicitly requested id that does not exist.
    Missing { key: String, error: String },
}

impl ListRow {
    fn missing(key: &str) -> Self {
        ListRow::Missing {
            key: key.to_string(),
            error: "not_found".to_string(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            ListRow::Found(row) => Some(&row.id),
            ListRow::Missing { .. } => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, ListRow::Missing { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListResult {
    pub total_rows: u32,
    pub offset: usize,
    pub rows: Vec<ListRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_seq: Option<u32>,
}

impl<S: ByteStore> StoreHandle<S> {
    /// List documents by id range or by explicit ids.
    pub fn list_documents(&self, opts: &ListOptions) -> Result<ListResult> {
        let rows = match opts.requested_keys() {
            Some(keys) => self.list_keys(&keys, opts)?,
            None => self.list_range(opts)?,
        };

        let counters = self.counters();
        debug!(db = %self.name(), rows = rows.len(), skip = opts.skip, "listed documents");

        Ok(ListResult {
            total_rows: counters.doc_count,
            offset: opts.skip,
            rows,
            update_seq: opts.update_seq.then_some(counters.update_seq),
        })
    }

    fn list_range(&self, opts: &ListOptions) -> Result<Vec<ListRow>> {
        let start = keys::metadata_key(opts.start_key.as_deref().unwrap_or_default());
        let end = opts.end_key.as_deref().map(keys::metadata_key);
        // `skip` and `limit` count namespace entries, deleted ones included.
        let stop = opts
            .skip
            .saturating_add(opts.limit.unwrap_or(usize::MAX));

        let mut rows = Vec::new();
        let mut position = 0usize;

        for entry in self.store().scan_from(&start) {
            if position >= stop {
                break;
            }

            let (key, value) = entry?;
            if !keys::is_metadata_key(&key) {
                break;
            }

            let at_end = match end.as_deref().map(|end| key.as_slice().cmp(end)) {
                Some(Ordering::Greater) => break,
                Some(Ordering::Equal) if !opts.inclusive_end => break,
                Some(Ordering::Equal) => true,
                _ => false,
            };

            let index = position;
            position += 1;

            if index >= opts.skip {
                let metadata: DocumentMetadata = serde_json::from_slice(&value)?;
                let (rev, deleted) = winning_state(&metadata)?;

                if !deleted || opts.deleted == DeletedPolicy::Include {
                    rows.push(ListRow::Found(self.row(&metadata, rev, deleted, opts.include_docs)?));
                }
            }

            if at_end {
                break;
            }
        }

        Ok(rows)
    }

    /// One pass over the namespace collecting the requested ids, then rows in
    /// request order. Deleted documents are always reported.
    fn list_keys(&self, requested: &[String], opts: &ListOptions) -> Result<Vec<ListRow>> {
        let wanted: HashSet<&str> = requested.iter().map(String::as_str).collect();
        let mut found: HashMap<String, DocRow> = HashMap::with_capacity(wanted.len());

        for entry in self.store().scan_from(keys::METADATA_PREFIX) {
            if found.len() == wanted.len() {
                break;
            }

            let (key, value) = entry?;
            if !keys::is_metadata_key(&key) {
                break;
            }
            let Some(id) = keys::metadata_id(&key) else {
                continue;
            };
            if !wanted.contains(id) {
                continue;
            }

            let metadata: DocumentMetadata = serde_json::from_slice(&value)?;
            let (rev, deleted) = winning_state(&metadata)?;
            let row = self.row(&metadata, rev, deleted, opts.include_docs)?;
            found.insert(id.to_string(), row);
        }

        Ok(requested
            .iter()
            .map(|key| match found.get(key) {
                Some(row) => ListRow::Found(row.clone()),
                None => ListRow::missing(key),
            })
            .skip(opts.skip)
            .take(opts.limit.unwrap_or(usize::MAX))
            .collect())
    }

    fn row(
        &self,
        metadata: &DocumentMetadata,
        rev: Revision,
        deleted: bool,
        include_docs: bool,
    ) -> Result<DocRow> {
        let doc = match (include_docs, deleted) {
            (false, _) => None,
            (true, true) => Some(Value::Null),
            (true, false) => {
                let body = match metadata.sequence_of(&rev) {
                    Some(seq) => self.read_payload(seq)?,
                    None => {
                        return Err(StoreError::CorruptRevisionMap {
                            id: metadata.id.clone(),
                            rev: rev.to_string(),
                        })
                    }
                };
                Some(body.map_or(Value::Null, |body| with_identity(body, &metadata.id, &rev)))
            }
        };

        Ok(DocRow {
            id: metadata.id.clone(),
            key: metadata.id.clone(),
            value: RowValue {
                rev: rev.to_string(),
                deleted,
            },
            doc,
        })
    }
}

fn winning_state(metadata: &DocumentMetadata) -> Result<(Revision, bool)> {
    let rev = metadata.winning_rev().ok_or_else(|| {
        StoreError::Corruption(format!("revision tree of {} has no leaves", metadata.id))
    })?;
    let deleted = metadata.rev_tree.is_deleted(&rev);
    Ok((rev, deleted))
}
