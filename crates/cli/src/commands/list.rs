//! Document listing command.

use super::{print_json, Target};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use minidoc_storage::{DeletedPolicy, ListOptions, ListRow};

#[derive(Args)]
pub struct ListArgs {
    /// First id to list
    #[arg(long)]
    start_key: Option<String>,

    /// Last id to list
    #[arg(long)]
    end_key: Option<String>,

    /// Stop before --end-key instead of at it
    #[arg(long)]
    exclusive_end: bool,

    /// Rows to skip
    #[arg(long, default_value = "0")]
    skip: usize,

    /// Maximum rows to show
    #[arg(long)]
    limit: Option<usize>,

    /// List exactly these ids, in order
    #[arg(long, value_delimiter = ',', conflicts_with = "key")]
    keys: Option<Vec<String>>,

    /// List a single id
    #[arg(long)]
    key: Option<String>,

    /// Include document bodies
    #[arg(long)]
    include_docs: bool,

    /// Include deleted documents in range listings
    #[arg(long)]
    include_deleted: bool,

    /// Report the current update sequence
    #[arg(long)]
    update_seq: bool,

    /// Print the raw JSON result
    #[arg(long)]
    json: bool,
}

impl From<ListArgs> for ListOptions {
    fn from(args: ListArgs) -> Self {
        ListOptions {
            start_key: args.start_key,
            end_key: args.end_key,
            inclusive_end: !args.exclusive_end,
            skip: args.skip,
            limit: args.limit,
            keys: args.keys,
            key: args.key,
            include_docs: args.include_docs,
            deleted: if args.include_deleted {
                DeletedPolicy::Include
            } else {
                DeletedPolicy::Exclude
            },
            update_seq: args.update_seq,
        }
    }
}

pub fn run(target: &Target, args: ListArgs) -> Result<()> {
    let as_json = args.json;
    let opts = ListOptions::from(args);
    let listing = target.with_database(|db| Ok(db.list_documents(&opts)?))?;

    if as_json {
        return print_json(&listing);
    }

    println!();
    println!(
        "{} {}",
        "Documents:".bold().cyan(),
        format!(
            "({} total, offset {})",
            listing.total_rows, listing.offset
        )
        .bright_black()
    );
    println!();

    for row in &listing.rows {
        match row {
            ListRow::Found(row) if row.value.deleted => println!(
                "  {} {} {}",
                row.id.bright_yellow(),
                row.value.rev.bright_black(),
                "(deleted)".red()
            ),
            ListRow::Found(row) => {
                println!("  {} {}", row.id.bright_yellow(), row.value.rev.bright_black());
                if let Some(doc) = &row.doc {
                    println!("    {}", doc);
                }
            }
            ListRow::Missing { key, .. } => {
                println!("  {} {}", key.bright_yellow(), "(not found)".red())
            }
        }
    }

    if let Some(seq) = listing.update_seq {
        println!();
        println!("  Update seq: {}", seq.to_string().bright_cyan());
    }
    println!();

    Ok(())
}
