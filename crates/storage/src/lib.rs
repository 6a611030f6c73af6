//! Versioned document storage for minidoc.
//!
//! This crate maps documents with revision trees onto an ordered key-value
//! store:
//! - Key layout (metadata, payloads by sequence, counters)
//! - Document reads and writes with per-document rollback
//! - Range and key-set listings
//! - Named store lifecycle (open, info, close, destroy)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Application Layer                     │
//! │              (CLI, embedding applications)               │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//! ┌────────────────────────▼────────────────────────────────┐
//! │                   Storage Layer                          │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────┐  │
//! │  │StoreManager │  │ StoreHandle │  │ ByteStore       │  │
//! │  │  - Registry │  │  - get/put  │  │  - sled backend │  │
//! │  │  - Database │  │  - bulk     │  │  - memory       │  │
//! │  │  - Lifecycle│  │  - listing  │  │  - key helpers  │  │
//! │  │             │  │  - counters │  │                 │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────┘  │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//! ┌────────────────────────▼────────────────────────────────┐
//! │                    sled Database                         │
//! │              (Embedded Key-Value Store)                  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use minidoc_core::Document;
//! use minidoc_storage::{GetOptions, ListOptions, SledConfig, SledProvider, StoreManager};
//!
//! let manager = StoreManager::new(SledProvider::new(SledConfig::new("./data")));
//! let db = manager.open("notes").unwrap();
//!
//! let saved = db.put(Document::new("todo").with_field("text", "buy milk")).unwrap();
//! println!("stored revision {}", saved.rev);
//!
//! let doc = db.get("todo", &GetOptions::default()).unwrap();
//! let listing = db.list_documents(&ListOptions::default()).unwrap();
//! assert_eq!(listing.total_rows, 1);
//! # let _ = doc;
//!
//! db.close().unwrap();
//! ```

pub mod backend;
pub mod counters;
pub mod db;
pub mod engine;
pub mod error;
pub mod keys;
pub mod manager;
pub mod scan;

// Re-export commonly used types
pub use backend::{ByteStore, KvIter, KvPair, MemoryProvider, MemoryStore, StoreProvider};
pub use counters::Counters;
pub use db::{SledConfig, SledProvider, SledStore};
pub use engine::{BulkItem, DocResult, FetchedDocument, GetOptions, StoreHandle};
pub use error::{ErrorKind, Result, StoreError};
pub use manager::{physical_name, Database, DatabaseInfo, StoreManager};
pub use scan::{DeletedPolicy, DocRow, ListOptions, ListResult, ListRow, RowValue};
