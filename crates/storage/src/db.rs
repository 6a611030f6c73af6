//! sled backend.

use crate::backend::{ByteStore, KvIter, StoreProvider};
use crate::error::{Result, StoreError};
use sled::Db;
use std::path::{Path, PathBuf};
use tracing::debug;

/// sled tuning shared by every store a [`SledProvider`] opens.
#[derive(Debug, Clone)]
pub struct SledConfig {
    /// Directory holding one sled database per store name.
    pub root_dir: PathBuf,
    /// Remove the files when the store is dropped.
    pub temporary: bool,
    /// Page cache size in bytes.
    pub cache_capacity: u64,
    /// Background flush interval; `None` flushes only on `flush()`.
    pub flush_every_ms: Option<u64>,
}

impl Default for SledConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("./data"),
            temporary: false,
            cache_capacity: 64 * 1024 * 1024,
            flush_every_ms: Some(500),
        }
    }
}

impl SledConfig {
    /// Default settings rooted at `root_dir`.
    pub fn new<P: Into<PathBuf>>(root_dir: P) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    fn to_sled(&self, path: &Path) -> sled::Config {
        sled::Config::new()
            .path(path)
            .temporary(self.temporary)
            .cache_capacity(self.cache_capacity)
            .flush_every_ms(self.flush_every_ms)
    }
}

/// Wrapper around a sled database.
pub struct SledStore {
    db: Db,
}

impl SledStore {
    /// Open an in-memory database (for testing).
    pub fn open_temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    /// Open a database at `path` with explicit settings.
    pub fn with_config(config: &SledConfig, path: &Path) -> Result<Self> {
        let db = config.to_sled(path).open()?;
        Ok(Self { db })
    }

    /// Get the underlying sled database.
    pub fn inner(&self) -> &Db {
        &self.db
    }
}

impl ByteStore for SledStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(key)?.map(|value| value.to_vec()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db.insert(key, value)?;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.db.remove(key)?;
        Ok(())
    }

    fn scan_from(&self, start: &[u8]) -> KvIter<'_> {
        Box::new(self.db.range(start.to_vec()..).map(|entry| {
            entry
                .map(|(key, value)| (key.to_vec(), value.to_vec()))
                .map_err(StoreError::from)
        }))
    }

    fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

/// Opens one sled database per store name below [`SledConfig::root_dir`].
#[derive(Debug, Clone, Default)]
pub struct SledProvider {
    config: SledConfig,
}

impl SledProvider {
    pub fn new(config: SledConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SledConfig {
        &self.config
    }

    /// Directory used for a store name.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.config.root_dir.join(name)
    }
}

impl StoreProvider for SledProvider {
    type Store = SledStore;

    fn adapter_name(&self) -> &'static str {
        "sled"
    }

    fn open(&self, name: &str) -> Result<SledStore> {
        let path = self.path_for(name);
        debug!(path = %path.display(), "opening sled database");
        SledStore::with_config(&self.config, &path)
    }

    fn destroy(&self, name: &str) -> Result<()> {
        let path = self.path_for(name);
        if path.exists() {
            std::fs::remove_dir_all(&path)?;
        }
        Ok(())
    }
}
