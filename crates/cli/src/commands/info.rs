//! Database info command.

use super::Target;
use anyhow::Result;
use colored::Colorize;

pub fn run(target: &Target) -> Result<()> {
    let info = target.with_database(|db| Ok(db.info()?))?;

    println!();
    println!("{}", "Database Info:".bold().cyan());
    println!();
    println!("  Name:       {}", target.name.bright_yellow());
    println!(
        "  Location:   {}",
        target.data_dir.display().to_string().bright_black()
    );
    println!("  Documents:  {}", info.doc_count.to_string().bright_cyan());
    println!("  Update seq: {}", info.update_seq.to_string().bright_cyan());
    println!("  Adapter:    {}", info.backend_adapter);
    println!();

    Ok(())
}
