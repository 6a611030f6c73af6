//! Destroy database command.

use super::Target;
use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

#[derive(Args)]
pub struct DestroyArgs {
    /// Confirm erasing every document
    #[arg(long)]
    yes: bool,
}

pub fn run(target: &Target, args: DestroyArgs) -> Result<()> {
    if !args.yes {
        bail!(
            "Refusing to destroy '{}' without --yes",
            target.name
        );
    }

    let (_manager, db) = target.open()?;
    let name = db.name().to_string();
    db.destroy()
        .with_context(|| format!("Failed to destroy database '{}'", target.name))?;

    println!(
        "{}  Destroyed {}",
        "✓".green().bold(),
        target.data_dir.join(name).display().to_string().bright_black()
    );

    Ok(())
}
