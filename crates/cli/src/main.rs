//! minidoc CLI entry point.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

mod commands;

#[derive(Parser)]
#[command(name = "minidoc")]
#[command(about = "A versioned document store on sled", long_about = None)]
struct Cli {
    /// Directory holding the databases
    #[arg(short, long, global = true, default_value = "./data")]
    data_dir: PathBuf,

    /// Database name (stored as <name>.db)
    #[arg(short, long, global = true, default_value = "default")]
    name: String,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<commands::Commands>,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(cmd) => {
            let target = commands::Target {
                data_dir: cli.data_dir,
                name: cli.name,
            };
            if let Err(e) = commands::run(&target, cmd) {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("minidoc - A versioned document store");
            println!("Run 'minidoc --help' for usage information.");
        }
    }
}
