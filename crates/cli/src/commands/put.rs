//! Document write commands.

use super::{print_json, Target};
use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use minidoc_core::{Document, Revision};
use minidoc_storage::BulkItem;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct PutArgs {
    /// Document as JSON, e.g. '{"_id": "a", "title": "hello"}'
    json: Option<String>,

    /// Read the document from a file instead
    #[arg(long, conflicts_with = "json")]
    file: Option<PathBuf>,
}

#[derive(Args)]
pub struct BulkArgs {
    /// File containing {"docs": [...]}
    #[arg(long)]
    file: PathBuf,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Document id
    id: String,

    /// Revision being deleted
    #[arg(long)]
    rev: String,
}

fn read_json(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}

pub fn run(target: &Target, args: PutArgs) -> Result<()> {
    let doc = match (args.json, args.file) {
        (Some(json), None) => serde_json::from_str(&json).context("Invalid document JSON")?,
        (None, Some(path)) => read_json(&path)?,
        _ => bail!("Pass the document as an argument or with --file"),
    };

    let result = target.with_database(|db| Ok(db.put_json(doc)?))?;

    println!(
        "{}  Stored {} at {}",
        "✓".green().bold(),
        result.id.bright_yellow(),
        result.rev.bright_cyan()
    );
    print_json(&result)
}

pub fn run_bulk(target: &Target, args: BulkArgs) -> Result<()> {
    let request = read_json(&args.file)?;
    let results = target.with_database(|db| Ok(db.bulk_docs(&request)?))?;

    let failed = results.iter().filter(|item| !item.is_ok()).count();
    for (index, item) in results.iter().enumerate() {
        match item {
            BulkItem::Ok(done) => println!(
                "  {} {} {}",
                format!("#{}", index).bright_black(),
                done.id.bright_yellow(),
                done.rev.bright_cyan()
            ),
            BulkItem::Err { id, message, .. } => println!(
                "  {} {} {}",
                format!("#{}", index).bright_black(),
                id.as_deref().unwrap_or("-").bright_yellow(),
                message.red()
            ),
        }
    }

    println!();
    if failed == 0 {
        println!(
            "{}  Wrote {} documents",
            "✓".green().bold(),
            results.len()
        );
    } else {
        println!(
            "{}  Wrote {} of {} documents",
            "!".yellow().bold(),
            results.len() - failed,
            results.len()
        );
    }
    print_json(&results)
}

pub fn run_delete(target: &Target, args: DeleteArgs) -> Result<()> {
    let rev: Revision = args
        .rev
        .parse()
        .with_context(|| format!("Invalid revision: {}", args.rev))?;
    let doc = Document::new(args.id).with_rev(rev).deleted();

    let result = target.with_database(|db| Ok(db.put(doc)?))?;

    println!(
        "{}  Deleted {} at {}",
        "✓".green().bold(),
        result.id.bright_yellow(),
        result.rev.bright_cyan()
    );
    print_json(&result)
}
