//! Byte-store abstraction and the in-memory backend.
//!
//! The document layer only needs single-key get/put/delete and an ordered
//! forward iterator. Iterators are plain Rust values, so dropping one (on
//! completion, early `break` or `?`) releases it.

use crate::error::Result;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;

/// A key/value pair yielded by a scan.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Ordered iterator over a byte store.
pub type KvIter<'a> = Box<dyn Iterator<Item = Result<KvPair>> + 'a>;

/// A flat, byte-ordered key-value store.
pub trait ByteStore: Send {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Iterate all entries with `key >= start` in ascending byte order.
    fn scan_from(&self, start: &[u8]) -> KvIter<'_>;

    /// Make pending writes durable.
    fn flush(&self) -> Result<()>;
}

/// Opens and erases byte stores by physical name.
pub trait StoreProvider: Send + Sync {
    type Store: ByteStore;

    /// Static identifier reported by `info()`.
    fn adapter_name(&self) -> &'static str;

    /// Open or create the named store.
    fn open(&self, name: &str) -> Result<Self::Store>;

    /// Erase everything persisted under the name.
    fn destroy(&self, name: &str) -> Result<()>;
}

/// `BTreeMap` backed store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    map: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    /// All keys in order.
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.map.read().keys().cloned().collect()
    }
}

impl ByteStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.map.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.map.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.map.write().remove(key);
        Ok(())
    }

    /// Yields one entry per lock acquisition, resuming after the last key
    /// returned. The lock is never held across caller code.
    fn scan_from(&self, start: &[u8]) -> KvIter<'_> {
        let mut lower = Bound::Included(start.to_vec());
        Box::new(std::iter::from_fn(move || {
            let (key, value) = self
                .map
                .read()
                .range::<Vec<u8>, _>((lower.as_ref(), Bound::Unbounded))
                .next()
                .map(|(k, v)| (k.clone(), v.clone()))?;
            lower = Bound::Excluded(key.clone());
            Some(Ok((key, value)))
        }))
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Keeps memory stores alive between close and reopen until destroyed.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    stores: Mutex<HashMap<String, MemoryStore>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// The store kept under a physical name, for inspection.
    pub fn store(&self, name: &str) -> Option<MemoryStore> {
        self.stores.lock().get(name).cloned()
    }
}

impl StoreProvider for MemoryProvider {
    type Store = MemoryStore;

    fn adapter_name(&self) -> &'static str {
        "memory"
    }

    fn open(&self, name: &str) -> Result<MemoryStore> {
        Ok(self
            .stores
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone())
    }

    fn destroy(&self, name: &str) -> Result<()> {
        self.stores.lock().remove(name);
        Ok(())
    }
}
