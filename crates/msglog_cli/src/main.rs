//! MsgLog CLI
//!
//! Offline tools for a message log directory.
//!
//! # Commands
//!
//! - `inspect` - Display per-page statistics
//! - `verify` - Decode every committed message and report problems
//! - `dump` - Print the messages of one page

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// MsgLog command-line tools.
#[derive(Parser)]
#[command(name = "msglog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the message directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display per-page statistics
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Verify that every committed message decodes
    Verify,

    /// Print the messages of one page
    Dump {
        /// Page number (decimal)
        #[arg(long)]
        page: u32,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Withhold message content
        #[arg(short, long)]
        redact: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Message directory required for inspect")?;
            commands::inspect::run(&path, &format)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or("Message directory required for verify")?;
            commands::verify::run(&path)?;
        }
        Commands::Dump {
            page,
            format,
            redact,
        } => {
            let path = cli.path.ok_or("Message directory required for dump")?;
            commands::dump::run(&path, page, &format, redact)?;
        }
        Commands::Version => {
            println!("MsgLog CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("MsgLog Core v{}", msglog_core::VERSION);
            println!("Page format v{}", msglog_core::FORMAT_VERSION);
        }
    }

    Ok(())
}
