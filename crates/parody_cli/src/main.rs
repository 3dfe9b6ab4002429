//! Parody CLI
//!
//! Command-line tools for Parody node files.
//!
//! # Commands
//!
//! - `inspect` - Display header counters and file statistics
//! - `verify` - Check free-list and watermark consistency
//! - `free-list` - Print the free-list chain
//! - `alloc` - Allocate and materialise nodes
//! - `free` - Return a node to the free list

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Parody node file tools.
#[derive(Parser)]
#[command(name = "parody")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the node file
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
    /// Display header counters and file statistics
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check free-list and watermark consistency
    Verify,

    /// Print the free-list chain
    FreeList,

    /// Allocate nodes, creating the file if needed
    Alloc {
        /// Number of nodes to allocate
        #[arg(short, long, default_value = "1")]
        count: usize,
    },

    /// Return a node to the free list
    Free {
        /// Node number to free
        node: u16,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Node file path required for inspect")?;
            commands::inspect::run(&path, &format)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or("Node file path required for verify")?;
            commands::verify::run(&path)?;
        }
        Commands::FreeList => {
            let path = cli.path.ok_or("Node file path required for free-list")?;
            commands::free_list::run(&path)?;
        }
        Commands::Alloc { count } => {
            let path = cli.path.ok_or("Node file path required for alloc")?;
            commands::alloc::run(&path, count)?;
        }
        Commands::Free { node } => {
            let path = cli.path.ok_or("Node file path required for free")?;
            commands::alloc::free(&path, node)?;
        }
        Commands::Version => {
            println!("Parody CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Parody Storage v{}", parody_storage::VERSION);
        }
    }

    Ok(())
}
