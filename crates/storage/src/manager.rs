//! Named store lifecycle.
//!
//! A [`StoreManager`] owns the registry of open handles. Opening a name
//! registers a handle and returns a [`Database`]; every operation on the
//! database looks the handle up again, so after `close()` all of them fail
//! with `NotOpen`.

use crate::backend::{ByteStore, StoreProvider};
use crate::engine::{BulkItem, DocResult, FetchedDocument, GetOptions, StoreHandle};
use crate::error::{Result, StoreError};
use crate::scan::{ListOptions, ListResult};
use minidoc_core::{Document, RevTree, RevisionPolicy, TreeMerge};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

type SharedHandle<S> = Arc<Mutex<StoreHandle<S>>>;
type Registry<S> = Arc<RwLock<HashMap<String, SharedHandle<S>>>>;

/// Physical store name for a logical database name.
pub fn physical_name(name: &str) -> String {
    format!("{name}.db")
}

/// Counters and backend of an open database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseInfo {
    pub doc_count: u32,
    pub update_seq: u32,
    pub backend_adapter: &'static str,
}

/// Opens databases and tracks which names are open.
pub struct StoreManager<P: StoreProvider> {
    provider: Arc<P>,
    policy: Arc<dyn RevisionPolicy>,
    handles: Registry<P::Store>,
}

impl<P: StoreProvider> StoreManager<P> {
    /// Manager using the default [`TreeMerge`] policy.
    pub fn new(provider: P) -> Self {
        Self::with_policy(provider, Arc::new(TreeMerge))
    }

    pub fn with_policy(provider: P, policy: Arc<dyn RevisionPolicy>) -> Self {
        Self {
            provider: Arc::new(provider),
            policy,
            handles: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Open (or create) a database.
    ///
    /// Fails with `AlreadyOpen` while another handle for the name is live.
    pub fn open(&self, name: &str) -> Result<Database<P>> {
        let physical = physical_name(name);
        let mut handles = self.handles.write();

        if handles.contains_key(&physical) {
            return Err(StoreError::AlreadyOpen(physical));
        }

        let store = self.provider.open(&physical)?;
        let handle = StoreHandle::load(physical.clone(), store).map_err(|err| {
            warn!(db = %physical, %err, "failed to load counters, closing store");
            err
        })?;

        let counters = handle.counters();
        info!(
            db = %physical,
            adapter = self.provider.adapter_name(),
            doc_count = counters.doc_count,
            update_seq = counters.update_seq,
            "opened database"
        );

        handles.insert(physical.clone(), Arc::new(Mutex::new(handle)));

        Ok(Database {
            name: physical,
            provider: Arc::clone(&self.provider),
            policy: Arc::clone(&self.policy),
            handles: Arc::clone(&self.handles),
        })
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.handles.read().contains_key(&physical_name(name))
    }

    /// Physical names of all open databases, sorted.
    pub fn open_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handles.read().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Handle to one named database.
pub struct Database<P: StoreProvider> {
    name: String,
    provider: Arc<P>,
    policy: Arc<dyn RevisionPolicy>,
    handles: Registry<P::Store>,
}

impl<P: StoreProvider> Clone for Database<P> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            provider: Arc::clone(&self.provider),
            policy: Arc::clone(&self.policy),
            handles: Arc::clone(&self.handles),
        }
    }
}

impl<P: StoreProvider> Database<P> {
    /// Physical name (`<name>.db`).
    pub fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self) -> Result<SharedHandle<P::Store>> {
        self.handles
            .read()
            .get(&self.name)
            .cloned()
            .ok_or_else(|| StoreError::NotOpen(self.name.clone()))
    }

    pub fn info(&self) -> Result<DatabaseInfo> {
        let counters = self.handle()?.lock().counters();
        Ok(DatabaseInfo {
            doc_count: counters.doc_count,
            update_seq: counters.update_seq,
            backend_adapter: self.provider.adapter_name(),
        })
    }

    pub fn get(&self, id: &str, opts: &GetOptions) -> Result<Value> {
        self.handle()?.lock().get(id, opts)
    }

    pub fn get_with_metadata(&self, id: &str, opts: &GetOptions) -> Result<FetchedDocument> {
        self.handle()?.lock().get_with_metadata(id, opts)
    }

    pub fn put(&self, doc: Document) -> Result<DocResult> {
        self.handle()?.lock().put(self.policy.as_ref(), doc)
    }

    /// Parse a JSON document (`_id`, `_rev`, `_deleted`, body) and write it.
    pub fn put_json(&self, doc: Value) -> Result<DocResult> {
        self.put(Document::from_json(doc)?)
    }

    pub fn bulk_put(&self, docs: Vec<Document>) -> Result<Vec<BulkItem>> {
        Ok(self.handle()?.lock().bulk_put(self.policy.as_ref(), docs))
    }

    /// Write a `{"docs": [...]}` request. Unparseable entries fail in place.
    pub fn bulk_docs(&self, request: &Value) -> Result<Vec<BulkItem>> {
        let docs = request
            .get("docs")
            .and_then(Value::as_array)
            .ok_or(StoreError::BatchMissingInput)?;

        let parsed = docs
            .iter()
            .map(|doc| Document::from_json(doc.clone()).map_err(StoreError::from))
            .collect();

        Ok(self
            .handle()?
            .lock()
            .bulk_put_parsed(self.policy.as_ref(), parsed))
    }

    pub fn list_documents(&self, opts: &ListOptions) -> Result<ListResult> {
        self.handle()?.lock().list_documents(opts)
    }

    pub fn revision_tree(&self, id: &str) -> Result<RevTree> {
        self.handle()?.lock().revision_tree(id)
    }

    /// Flush and deregister. The byte store closes once the last in-flight
    /// operation releases the handle.
    pub fn close(&self) -> Result<()> {
        let handle = self
            .handles
            .write()
            .remove(&self.name)
            .ok_or_else(|| StoreError::NotOpen(self.name.clone()))?;

        handle.lock().store().flush()?;
        info!(db = %self.name, "closed database");
        Ok(())
    }

    /// Close if open, then erase everything stored under this name.
    pub fn destroy(self) -> Result<()> {
        match self.close() {
            Ok(()) | Err(StoreError::NotOpen(_)) => {}
            Err(err) => return Err(err),
        }

        self.provider.destroy(&self.name)?;
        info!(db = %self.name, "destroyed database");
        Ok(())
    }
}
