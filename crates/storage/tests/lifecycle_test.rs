use minidoc_core::Document;
use minidoc_storage::{
    GetOptions, ListOptions, SledConfig, SledProvider, StoreError, StoreManager,
};
use serde_json::json;
use tempfile::TempDir;

fn setup() -> (TempDir, StoreManager<SledProvider>) {
    let dir = tempfile::tempdir().unwrap();
    let provider = SledProvider::new(SledConfig::new(dir.path()));
    (dir, StoreManager::new(provider))
}

#[test]
fn test_info_on_fresh_store() {
    let (_dir, manager) = setup();
    let db = manager.open("dbname").unwrap();

    let info = db.info().unwrap();
    assert_eq!(info.doc_count, 0);
    assert_eq!(info.update_seq, 0);
    assert_eq!(info.backend_adapter, "sled");
}

#[test]
fn test_data_survives_close_and_reopen() {
    let (dir, manager) = setup();
    let db = manager.open("dbname").unwrap();

    let saved = db
        .put(Document::new("doc-id-1").with_field("key", "value"))
        .unwrap();
    db.put(Document::new("doc-id-2")).unwrap();
    db.close().unwrap();

    assert!(dir.path().join("dbname.db").exists());

    let db = manager.open("dbname").unwrap();
    let info = db.info().unwrap();
    assert_eq!((info.doc_count, info.update_seq), (2, 2));

    let doc = db.get("doc-id-1", &GetOptions::default()).unwrap();
    assert_eq!(
        doc,
        json!({"_id": "doc-id-1", "_rev": saved.rev, "key": "value"})
    );
}

#[test]
fn test_reopen_from_new_manager() {
    let (dir, manager) = setup();
    let db = manager.open("dbname").unwrap();
    db.put(Document::new("a")).unwrap();
    db.close().unwrap();
    drop(manager);

    let manager = StoreManager::new(SledProvider::new(SledConfig::new(dir.path())));
    let db = manager.open("dbname").unwrap();
    assert_eq!(db.info().unwrap().doc_count, 1);
}

#[test]
fn test_open_twice_fails() {
    let (_dir, manager) = setup();
    let _db = manager.open("dbname").unwrap();

    assert!(matches!(
        manager.open("dbname"),
        Err(StoreError::AlreadyOpen(_))
    ));
    // Other names are independent.
    let other = manager.open("other").unwrap();
    assert_eq!(other.info().unwrap().doc_count, 0);
}

#[test]
fn test_closed_handle_rejects_operations() {
    let (_dir, manager) = setup();
    let db = manager.open("dbname").unwrap();
    let clone = db.clone();
    db.close().unwrap();

    assert!(matches!(clone.info(), Err(StoreError::NotOpen(_))));
    assert!(matches!(
        clone.get("a", &GetOptions::default()),
        Err(StoreError::NotOpen(_))
    ));
    assert!(matches!(
        clone.list_documents(&ListOptions::default()),
        Err(StoreError::NotOpen(_))
    ));
    assert!(matches!(
        clone.bulk_put(vec![Document::new("a")]),
        Err(StoreError::NotOpen(_))
    ));
}

#[test]
fn test_destroy_removes_files() {
    let (dir, manager) = setup();
    let db = manager.open("dbname").unwrap();
    db.put(Document::new("a")).unwrap();

    db.destroy().unwrap();
    assert!(!dir.path().join("dbname.db").exists());
    assert!(!manager.is_open("dbname"));

    let db = manager.open("dbname").unwrap();
    let info = db.info().unwrap();
    assert_eq!((info.doc_count, info.update_seq), (0, 0));
}
