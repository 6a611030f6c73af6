//! Document reads and writes.
//!
//! A write touches up to three keys: the document's metadata, the body of
//! the new revision, and the global counters. The byte store has no
//! multi-key transaction, so every write records what it has done and
//! undoes it if a later step fails:
//!
//! ```text
//! metadata ──▶ body (live revisions only) ──▶ counters
//!     │               │                           │
//!     └── restore ◀───┴── delete ◀────────────────┴── restore on failure
//! ```

use crate::backend::ByteStore;
use crate::counters::Counters;
use crate::error::{ErrorKind, Result, StoreError};
use crate::keys;
use minidoc_core::{with_identity, Document, DocumentMetadata, RevTree, Revision, RevisionPolicy};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, error, warn};

/// Revision selection for [`StoreHandle::get`].
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    /// Explicit revision to read.
    pub rev: Option<String>,
    /// Follow `rev` (or the last written revision) to its branch head.
    pub latest: bool,
}

/// A document body together with the metadata it was resolved against.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedDocument {
    /// Body with `_id` and `_rev` injected.
    pub doc: Value,
    pub metadata: DocumentMetadata,
}

/// Successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocResult {
    pub ok: bool,
    pub id: String,
    pub rev: String,
}

/// Outcome of one slot of a bulk write, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BulkItem {
    Ok(DocResult),
    Err {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        kind: ErrorKind,
        message: String,
    },
}

impl BulkItem {
    fn from_result(id: Option<String>, result: Result<DocResult>) -> Self {
        match result {
            Ok(done) => BulkItem::Ok(done),
            Err(err) => BulkItem::Err {
                id,
                kind: err.kind(),
                message: err.to_string(),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, BulkItem::Ok(_))
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            BulkItem::Ok(_) => None,
            BulkItem::Err { kind, .. } => Some(*kind),
        }
    }
}

/// Metadata as stored: raw bytes for rollback, decoded form for merging.
#[derive(Debug, Clone)]
struct StoredMetadata {
    raw: Vec<u8>,
    metadata: DocumentMetadata,
}

/// Metadata looked up during one batch, keyed by id. `None` means absent.
type MetadataCache = HashMap<String, Option<StoredMetadata>>;

/// Which steps of a write have reached the store.
#[derive(Debug, Default, Clone, Copy)]
struct WriteProgress {
    metadata: bool,
    payload: bool,
    counters: bool,
}

/// An open store: its byte store plus the in-memory counters.
pub struct StoreHandle<S> {
    name: String,
    counters: Counters,
    store: S,
}

impl<S: ByteStore> StoreHandle<S> {
    /// Wrap an opened byte store, loading its counters.
    ///
    /// On failure the store is dropped, which closes it.
    pub fn load(name: impl Into<String>, store: S) -> Result<Self> {
        let counters = Counters::load(&store)?;
        Ok(Self {
            name: name.into(),
            counters,
            store,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Decoded metadata of a document.
    pub fn read_metadata(&self, id: &str) -> Result<Option<DocumentMetadata>> {
        Ok(self.read_stored(id)?.map(|stored| stored.metadata))
    }

    fn read_stored(&self, id: &str) -> Result<Option<StoredMetadata>> {
        match self.store.get(&keys::metadata_key(id))? {
            Some(raw) => {
                let metadata = serde_json::from_slice(&raw)?;
                Ok(Some(StoredMetadata { raw, metadata }))
            }
            None => Ok(None),
        }
    }

    /// Revision body stored under a sequence number.
    pub fn read_payload(&self, seq: u32) -> Result<Option<Map<String, Value>>> {
        match self.store.get(&keys::data_key(seq))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Read a document revision with `_id` and `_rev` injected.
    pub fn get(&self, id: &str, opts: &GetOptions) -> Result<Value> {
        Ok(self.get_with_metadata(id, opts)?.doc)
    }

    /// Read a document revision along with its metadata.
    ///
    /// Without `rev` or `latest` the winning revision is read, and a deleted
    /// winner is reported as missing.
    pub fn get_with_metadata(&self, id: &str, opts: &GetOptions) -> Result<FetchedDocument> {
        let metadata = self
            .read_metadata(id)?
            .ok_or_else(|| StoreError::DocumentMissing("missing".to_string()))?;

        let requested = opts
            .rev
            .as_deref()
            .map(str::parse::<Revision>)
            .transpose()?;

        let rev = match (requested, opts.latest) {
            (Some(rev), true) => metadata
                .rev_tree
                .latest(&rev)
                .ok_or_else(|| StoreError::DocumentMissing("missing".to_string()))?,
            (Some(rev), false) => rev,
            (None, true) => metadata.rev.clone(),
            (None, false) => {
                let winning = metadata.winning_rev().ok_or_else(|| {
                    StoreError::Corruption(format!("revision tree of {id} has no leaves"))
                })?;
                if metadata.rev_tree.is_deleted(&winning) {
                    return Err(StoreError::DocumentMissing("deleted".to_string()));
                }
                winning
            }
        };

        let seq = metadata
            .sequence_of(&rev)
            .ok_or_else(|| StoreError::CorruptRevisionMap {
                id: metadata.id.clone(),
                rev: rev.to_string(),
            })?;

        let body = self
            .read_payload(seq)?
            .ok_or_else(|| StoreError::DocumentMissing("missing".to_string()))?;

        Ok(FetchedDocument {
            doc: with_identity(body, &metadata.id, &rev),
            metadata,
        })
    }

    /// Stored revision tree of a document.
    pub fn revision_tree(&self, id: &str) -> Result<RevTree> {
        self.read_metadata(id)?
            .map(|metadata| metadata.rev_tree)
            .ok_or_else(|| StoreError::DocumentMissing("missing".to_string()))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Write a single document.
    pub fn put(&mut self, policy: &dyn RevisionPolicy, doc: Document) -> Result<DocResult> {
        let mut cache = MetadataCache::new();
        self.write_one(policy, doc, &mut cache)
    }

    /// Write documents one after another; a failure only affects its own slot.
    pub fn bulk_put(&mut self, policy: &dyn RevisionPolicy, docs: Vec<Document>) -> Vec<BulkItem> {
        self.bulk_put_parsed(policy, docs.into_iter().map(Ok).collect())
    }

    /// Like [`bulk_put`](Self::bulk_put), with slots that already failed to parse.
    pub fn bulk_put_parsed(
        &mut self,
        policy: &dyn RevisionPolicy,
        docs: Vec<Result<Document>>,
    ) -> Vec<BulkItem> {
        let mut cache = MetadataCache::new();
        let mut results = Vec::with_capacity(docs.len());

        for (index, doc) in docs.into_iter().enumerate() {
            let item = match doc {
                Ok(doc) => {
                    let id = (!doc.id.is_empty()).then(|| doc.id.clone());
                    BulkItem::from_result(id, self.write_one(policy, doc, &mut cache))
                }
                Err(err) => BulkItem::from_result(None, Err(err)),
            };
            if let BulkItem::Err { message, .. } = &item {
                debug!(db = %self.name, index, %message, "bulk slot failed");
            }
            results.push(item);
        }

        results
    }

    /// Merge and persist one edit, rolling back on any store failure.
    fn write_one(
        &mut self,
        policy: &dyn RevisionPolicy,
        doc: Document,
        cache: &mut MetadataCache,
    ) -> Result<DocResult> {
        if doc.id.is_empty() {
            return Err(StoreError::IdRequired);
        }

        let prior = match cache.get(&doc.id) {
            Some(entry) => entry.clone(),
            None => {
                let entry = self.read_stored(&doc.id)?;
                cache.insert(doc.id.clone(), entry.clone());
                entry
            }
        };

        let resolution = policy.resolve(prior.as_ref().map(|p| &p.metadata), &doc)?;

        let was_live = prior.as_ref().is_some_and(|p| !p.metadata.deleted);
        let doc_delta = i32::from(!resolution.winning_deleted) - i32::from(was_live);

        let saved = self.counters;
        let next = saved.advance(doc_delta)?;
        let seq = next.update_seq;

        let mut metadata = resolution.metadata;
        metadata.rev_map.insert(metadata.rev.clone(), seq);
        let raw = serde_json::to_vec(&metadata)?;
        let payload = if resolution.new_rev_deleted {
            None
        } else {
            Some(serde_json::to_vec(&doc.body)?)
        };

        self.counters = next;
        let mut progress = WriteProgress::default();
        if let Err(err) = self.apply(&metadata.id, &raw, seq, payload.as_deref(), &mut progress) {
            self.rollback(&metadata.id, prior.as_ref(), seq, saved, progress);
            return Err(err);
        }

        debug!(
            db = %self.name,
            id = %metadata.id,
            rev = %metadata.rev,
            seq,
            kind = ?resolution.kind,
            doc_count = self.counters.doc_count,
            "document written"
        );

        let result = DocResult {
            ok: true,
            id: metadata.id.clone(),
            rev: metadata.rev.to_string(),
        };
        cache.insert(metadata.id.clone(), Some(StoredMetadata { raw, metadata }));
        Ok(result)
    }

    fn apply(
        &self,
        id: &str,
        raw: &[u8],
        seq: u32,
        payload: Option<&[u8]>,
        progress: &mut WriteProgress,
    ) -> Result<()> {
        self.store.put(&keys::metadata_key(id), raw)?;
        progress.metadata = true;

        if let Some(payload) = payload {
            self.store.put(&keys::data_key(seq), payload)?;
            progress.payload = true;
        }

        self.counters.persist(&self.store)?;
        progress.counters = true;

        Ok(())
    }

    /// Undo the steps recorded in `progress` and restore `saved` counters.
    fn rollback(
        &mut self,
        id: &str,
        prior: Option<&StoredMetadata>,
        seq: u32,
        saved: Counters,
        progress: WriteProgress,
    ) {
        warn!(db = %self.name, id, seq, ?progress, "write failed, rolling back");

        if progress.metadata {
            let key = keys::metadata_key(id);
            let restored = match prior {
                Some(prior) => self.store.put(&key, &prior.raw),
                None => self.store.delete(&key),
            };
            if let Err(err) = restored {
                error!(db = %self.name, id, %err, "failed to restore metadata");
            }
        }

        if progress.payload {
            if let Err(err) = self.store.delete(&keys::data_key(seq)) {
                error!(db = %self.name, id, seq, %err, "failed to remove revision body");
            }
        }

        if progress.counters {
            if let Err(err) = saved.persist(&self.store) {
                error!(db = %self.name, %err, "failed to restore counters");
            }
        }

        self.counters = saved;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStore;
    use minidoc_core::TreeMerge;
    use serde_json::json;

    fn setup() -> StoreHandle<MemoryStore> {
        StoreHandle::load("test.db", MemoryStore::new()).unwrap()
    }

    fn rev(result: &DocResult) -> Revision {
        result.rev.parse().unwrap()
    }

    #[test]
    fn test_insert_new_document() {
        let mut handle = setup();
        let doc = Document::new("doc-id-1").with_field("key", "value");

        let result = handle.put(&TreeMerge, doc).unwrap();
        assert!(result.ok);
        assert_eq!(result.id, "doc-id-1");
        assert!(result.rev.starts_with("1-"));

        assert_eq!(
            handle.counters(),
            Counters {
                doc_count: 1,
                update_seq: 1
            }
        );
        assert_eq!(Counters::load(handle.store()).unwrap(), handle.counters());

        let metadata = handle.read_metadata("doc-id-1").unwrap().unwrap();
        assert_eq!(metadata.sequence_of(&rev(&result)), Some(1));
        assert_eq!(
            Value::Object(handle.read_payload(1).unwrap().unwrap()),
            json!({"key": "value"})
        );
    }

    #[test]
    fn test_put_requires_id() {
        let mut handle = setup();
        let result = handle.put(&TreeMerge, Document::new("").with_field("a", 1));
        assert!(matches!(result, Err(StoreError::IdRequired)));
        assert_eq!(handle.counters(), Counters::default());
        assert!(handle.store().is_empty());
    }

    #[test]
    fn test_get_roundtrip() {
        let mut handle = setup();
        let result = handle
            .put(&TreeMerge, Document::new("a").with_field("n", 1))
            .unwrap();

        let opts = GetOptions {
            rev: Some(result.rev.clone()),
            ..Default::default()
        };
        let doc = handle.get("a", &opts).unwrap();
        assert_eq!(doc, json!({"_id": "a", "_rev": result.rev, "n": 1}));

        assert_eq!(handle.get("a", &GetOptions::default()).unwrap(), doc);
    }

    #[test]
    fn test_get_missing() {
        let handle = setup();
        let err = handle.get("nope", &GetOptions::default()).unwrap_err();
        assert!(matches!(err, StoreError::DocumentMissing(ref r) if r == "missing"));
    }

    #[test]
    fn test_update_keeps_history() {
        let mut handle = setup();
        let first = handle
            .put(&TreeMerge, Document::new("a").with_field("n", 1))
            .unwrap();
        let second = handle
            .put(
                &TreeMerge,
                Document::new("a").with_rev(rev(&first)).with_field("n", 2),
            )
            .unwrap();

        assert!(second.rev.starts_with("2-"));
        assert_eq!(handle.counters().doc_count, 1);
        assert_eq!(handle.counters().update_seq, 2);

        let metadata = handle.read_metadata("a").unwrap().unwrap();
        assert_eq!(metadata.sequence_of(&rev(&first)), Some(1));
        assert_eq!(metadata.sequence_of(&rev(&second)), Some(2));

        let old = GetOptions {
            rev: Some(first.rev.clone()),
            ..Default::default()
        };
        assert_eq!(handle.get("a", &old).unwrap()["n"], json!(1));
        assert_eq!(handle.get("a", &GetOptions::default()).unwrap()["n"], json!(2));

        let latest = GetOptions {
            rev: Some(first.rev),
            latest: true,
        };
        assert_eq!(handle.get("a", &latest).unwrap()["_rev"], json!(second.rev));
    }

    #[test]
    fn test_delete_document() {
        let mut handle = setup();
        let first = handle.put(&TreeMerge, Document::new("a")).unwrap();
        let deleted = handle
            .put(&TreeMerge, Document::new("a").with_rev(rev(&first)).deleted())
            .unwrap();

        assert_eq!(handle.counters().doc_count, 0);
        assert_eq!(handle.counters().update_seq, 2);

        // No body for the tombstone.
        assert!(handle.read_payload(2).unwrap().is_none());
        let metadata = handle.read_metadata("a").unwrap().unwrap();
        assert!(metadata.deleted);
        assert_eq!(metadata.sequence_of(&rev(&deleted)), Some(2));

        let err = handle.get("a", &GetOptions::default()).unwrap_err();
        assert!(matches!(err, StoreError::DocumentMissing(ref r) if r == "deleted"));
    }

    #[test]
    fn test_delete_missing_document() {
        let mut handle = setup();
        let err = handle
            .put(&TreeMerge, Document::new("ghost").deleted())
            .unwrap_err();
        assert!(matches!(err, StoreError::DocumentMissing(_)));
        assert_eq!(handle.counters(), Counters::default());
    }

    #[test]
    fn test_recreate_deleted_document_counts_again() {
        let mut handle = setup();
        let first = handle.put(&TreeMerge, Document::new("a")).unwrap();
        handle
            .put(&TreeMerge, Document::new("a").with_rev(rev(&first)).deleted())
            .unwrap();
        assert_eq!(handle.counters().doc_count, 0);

        handle
            .put(&TreeMerge, Document::new("a").with_field("back", true))
            .unwrap();
        assert_eq!(handle.counters().doc_count, 1);
        assert_eq!(handle.get("a", &GetOptions::default()).unwrap()["back"], json!(true));
    }

    #[test]
    fn test_conflict_leaves_store_untouched() {
        let mut handle = setup();
        handle.put(&TreeMerge, Document::new("a")).unwrap();
        let before = handle.store().keys();

        let err = handle
            .put(&TreeMerge, Document::new("a").with_field("x", 1))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(handle.store().keys(), before);
        assert_eq!(handle.counters().update_seq, 1);
    }

    #[test]
    fn test_corrupt_revision_map() {
        let mut handle = setup();
        let result = handle.put(&TreeMerge, Document::new("a")).unwrap();

        let mut metadata = handle.read_metadata("a").unwrap().unwrap();
        metadata.rev_map.clear();
        handle
            .store()
            .put(
                &keys::metadata_key("a"),
                &serde_json::to_vec(&metadata).unwrap(),
            )
            .unwrap();

        let opts = GetOptions {
            rev: Some(result.rev),
            ..Default::default()
        };
        assert!(matches!(
            handle.get("a", &opts),
            Err(StoreError::CorruptRevisionMap { .. })
        ));
    }

    #[test]
    fn test_missing_payload() {
        let mut handle = setup();
        handle.put(&TreeMerge, Document::new("a")).unwrap();
        handle.store().delete(&keys::data_key(1)).unwrap();

        let err = handle.get("a", &GetOptions::default()).unwrap_err();
        assert!(matches!(err, StoreError::DocumentMissing(ref r) if r == "missing"));
    }

    #[test]
    fn test_get_invalid_rev() {
        let mut handle = setup();
        handle.put(&TreeMerge, Document::new("a")).unwrap();
        let opts = GetOptions {
            rev: Some("garbage".into()),
            ..Default::default()
        };
        assert!(matches!(
            handle.get("a", &opts),
            Err(StoreError::InvalidRev(_))
        ));
    }

    #[test]
    fn test_bulk_put_independent_slots() {
        let mut handle = setup();
        let docs = vec![
            Document::new("a").with_field("n", 1),
            Document::new(""),
            Document::new("b").with_field("n", 2),
            Document::new("ghost").deleted(),
        ];

        let results = handle.bulk_put(&TreeMerge, docs);
        assert_eq!(results.len(), 4);
        assert!(results[0].is_ok());
        assert_eq!(results[1].kind(), Some(ErrorKind::IdRequired));
        assert!(results[2].is_ok());
        assert_eq!(results[3].kind(), Some(ErrorKind::DocumentMissing));

        assert_eq!(
            handle.counters(),
            Counters {
                doc_count: 2,
                update_seq: 2
            }
        );
    }

    #[test]
    fn test_bulk_put_same_id_sees_in_flight_metadata() {
        let mut handle = setup();
        let first = handle.put(&TreeMerge, Document::new("a")).unwrap();

        let second = Document::new("a")
            .with_rev(rev(&first))
            .with_field("n", 2);
        // Built on the revision the previous slot creates.
        let second_rev = {
            let prior = handle.read_metadata("a").unwrap().unwrap();
            TreeMerge
                .resolve(Some(&prior), &second)
                .unwrap()
                .metadata
                .rev
        };
        let third = Document::new("a").with_rev(second_rev).with_field("n", 3);

        let results = handle.bulk_put(&TreeMerge, vec![second, third]);
        assert!(results.iter().all(BulkItem::is_ok), "{results:?}");

        let metadata = handle.read_metadata("a").unwrap().unwrap();
        assert_eq!(metadata.rev_map.len(), 3);
        assert_eq!(metadata.rev.pos, 3);
        assert_eq!(handle.get("a", &GetOptions::default()).unwrap()["n"], json!(3));
    }

    #[test]
    fn test_bulk_item_json() {
        let ok = BulkItem::Ok(DocResult {
            ok: true,
            id: "a".into(),
            rev: "1-aa".into(),
        });
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"ok": true, "id": "a", "rev": "1-aa"})
        );

        let err = BulkItem::from_result(Some("b".into()), Err(StoreError::IdRequired));
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"id": "b", "kind": "id_required", "message": "_id is required for puts"})
        );
    }

    #[test]
    fn test_revision_tree() {
        let mut handle = setup();
        let result = handle.put(&TreeMerge, Document::new("a")).unwrap();
        let tree = handle.revision_tree("a").unwrap();
        assert!(tree.is_leaf(&rev(&result)));
        assert!(matches!(
            handle.revision_tree("b"),
            Err(StoreError::DocumentMissing(_))
        ));
    }
}
