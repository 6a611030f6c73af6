//! CLI commands module.

use anyhow::{Context, Result};
use clap::Subcommand;
use minidoc_storage::{Database, SledConfig, SledProvider, StoreManager};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

mod destroy;
mod get;
mod info;
mod list;
mod put;

pub use destroy::DestroyArgs;
pub use get::{GetArgs, TreeArgs};
pub use list::ListArgs;
pub use put::{BulkArgs, DeleteArgs, PutArgs};

#[derive(Subcommand)]
pub enum Commands {
    /// Show document count and update sequence
    Info,
    /// Write a single document
    Put(PutArgs),
    /// Write a batch of documents from a {"docs": [...]} file
    Bulk(BulkArgs),
    /// Read a document
    Get(GetArgs),
    /// Show a document's revision tree
    Tree(TreeArgs),
    /// Delete a document revision
    Delete(DeleteArgs),
    /// List documents by id
    List(ListArgs),
    /// Erase the database
    Destroy(DestroyArgs),
}

/// Which database a command works on.
pub struct Target {
    pub data_dir: PathBuf,
    pub name: String,
}

impl Target {
    /// Open the database, creating the data directory if needed.
    fn open(&self) -> Result<(StoreManager<SledProvider>, Database<SledProvider>)> {
        fs::create_dir_all(&self.data_dir).with_context(|| {
            format!("Failed to create data directory: {:?}", self.data_dir)
        })?;

        debug!(data_dir = %self.data_dir.display(), name = %self.name, "opening database");
        let manager = StoreManager::new(SledProvider::new(SledConfig::new(&self.data_dir)));
        let db = manager
            .open(&self.name)
            .with_context(|| format!("Failed to open database '{}'", self.name))?;
        Ok((manager, db))
    }

    /// Run `f` against the open database and close it afterwards.
    fn with_database<T>(&self, f: impl FnOnce(&Database<SledProvider>) -> Result<T>) -> Result<T> {
        let (_manager, db) = self.open()?;
        let result = f(&db);
        db.close().context("Failed to close database")?;
        result
    }
}

pub fn run(target: &Target, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Info => info::run(target),
        Commands::Put(args) => put::run(target, args),
        Commands::Bulk(args) => put::run_bulk(target, args),
        Commands::Get(args) => get::run(target, args),
        Commands::Tree(args) => get::run_tree(target, args),
        Commands::Delete(args) => put::run_delete(target, args),
        Commands::List(args) => list::run(target, args),
        Commands::Destroy(args) => destroy::run(target, args),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use minidoc_storage::{DeletedPolicy, ListOptions};

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: Commands,
    }

    fn parse(args: &[&str]) -> Commands {
        let argv = std::iter::once("minidoc").chain(args.iter().copied());
        TestCli::try_parse_from(argv).unwrap().command
    }

    fn setup() -> (tempfile::TempDir, Target) {
        let dir = tempfile::tempdir().unwrap();
        let target = Target {
            data_dir: dir.path().to_path_buf(),
            name: "test".to_string(),
        };
        (dir, target)
    }

    #[test]
    fn test_put_and_delete() {
        let (_dir, target) = setup();

        run(&target, parse(&["put", r#"{"_id": "a", "n": 1}"#])).unwrap();
        let info = target.with_database(|db| Ok(db.info()?)).unwrap();
        assert_eq!((info.doc_count, info.update_seq), (1, 1));

        let rev = target
            .with_database(|db| Ok(db.get("a", &Default::default())?))
            .unwrap()["_rev"]
            .as_str()
            .unwrap()
            .to_string();
        run(&target, parse(&["delete", "a", "--rev", &rev])).unwrap();

        let info = target.with_database(|db| Ok(db.info()?)).unwrap();
        assert_eq!((info.doc_count, info.update_seq), (0, 2));
    }

    #[test]
    fn test_bulk_from_file() {
        let (dir, target) = setup();
        let file = dir.path().join("docs.json");
        fs::write(&file, r#"{"docs": [{"_id": "a"}, {"_id": "b"}, {}]}"#).unwrap();

        run(&target, parse(&["bulk", "--file", file.to_str().unwrap()])).unwrap();
        let info = target.with_database(|db| Ok(db.info()?)).unwrap();
        assert_eq!(info.doc_count, 2);
    }

    #[test]
    fn test_list_args() {
        let Commands::List(args) = parse(&[
            "list",
            "--keys",
            "b,a",
            "--exclusive-end",
            "--include-deleted",
            "--skip",
            "1",
        ]) else {
            panic!("expected list command");
        };

        let opts = ListOptions::from(args);
        assert_eq!(opts.keys, Some(vec!["b".to_string(), "a".to_string()]));
        assert!(!opts.inclusive_end);
        assert_eq!(opts.deleted, DeletedPolicy::Include);
        assert_eq!(opts.skip, 1);
    }

    #[test]
    fn test_destroy_requires_confirmation() {
        let (dir, target) = setup();
        run(&target, parse(&["put", r#"{"_id": "a"}"#])).unwrap();

        assert!(run(&target, parse(&["destroy"])).is_err());
        assert!(dir.path().join("test.db").exists());

        run(&target, parse(&["destroy", "--yes"])).unwrap();
        assert!(!dir.path().join("test.db").exists());
    }

    #[test]
    fn test_get_missing_document_fails() {
        let (_dir, target) = setup();
        assert!(run(&target, parse(&["get", "nope"])).is_err());
    }
}
