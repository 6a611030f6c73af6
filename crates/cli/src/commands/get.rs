//! Document read commands.

use super::{print_json, Target};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use minidoc_storage::GetOptions;

#[derive(Args)]
pub struct GetArgs {
    /// Document id
    id: String,

    /// Read this revision instead of the winner
    #[arg(long)]
    rev: Option<String>,

    /// Follow the revision to the head of its branch
    #[arg(long)]
    latest: bool,
}

#[derive(Args)]
pub struct TreeArgs {
    /// Document id
    id: String,
}

pub fn run(target: &Target, args: GetArgs) -> Result<()> {
    let opts = GetOptions {
        rev: args.rev,
        latest: args.latest,
    };

    let doc = target.with_database(|db| {
        db.get(&args.id, &opts)
            .with_context(|| format!("Failed to read document '{}'", args.id))
    })?;

    print_json(&doc)
}

pub fn run_tree(target: &Target, args: TreeArgs) -> Result<()> {
    let tree = target.with_database(|db| {
        db.revision_tree(&args.id)
            .with_context(|| format!("Failed to read revision tree of '{}'", args.id))
    })?;

    println!();
    println!("{}", "Leaves:".bold().cyan());
    for leaf in tree.leaves() {
        let state = if leaf.deleted {
            "deleted".red()
        } else {
            "live".green()
        };
        println!("  {} {}", leaf.rev.to_string().bright_yellow(), state);
    }
    if let Some(winner) = tree.winning_rev() {
        println!("  Winner: {}", winner.to_string().bright_cyan());
    }
    println!();

    print_json(&tree)
}
