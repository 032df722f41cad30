//! Tabula CLI
//!
//! Command-line tools for Tabula workspaces.
//!
//! # Commands
//!
//! - `tables` - List tables and their columns
//! - `rows` - List a table's rows in display order
//! - `references` - Show columns elsewhere that point at a table
//! - `history` - List a table's history entries
//! - `snapshot` - Record the current state of a table as a history entry
//! - `revert` - Restore a table from a history entry
//! - `verify` - Check journal integrity
//! - `checkpoint` - Compact the journal into a single checkpoint record

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Tabula command-line workspace tools.
#[derive(Parser)]
#[command(name = "tabula")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the workspace directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Output format
    #[arg(global = true, short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

/// Output format shared by every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List tables and their columns
    Tables,

    /// List a table's rows in display order
    Rows {
        /// Table id
        table: String,
    },

    /// Show columns in other tables that point at a table
    References {
        /// Table id
        table: String,

        /// Only references to this column
        #[arg(short, long)]
        column: Option<String>,
    },

    /// List a table's history entries, newest first
    History {
        /// Table id
        table: String,

        /// Maximum number of entries
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Record the table's current state as a history entry
    Snapshot {
        /// Table id
        table: String,

        /// Entry label
        #[arg(short, long)]
        label: Option<String>,

        /// Who took the snapshot
        #[arg(short, long)]
        actor: Option<String>,
    },

    /// Restore a table from one of its history entries
    Revert {
        /// Table id
        table: String,

        /// History entry id
        history_id: String,
    },

    /// Verify journal integrity
    Verify,

    /// Rewrite the journal as a single checkpoint record
    Checkpoint,

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
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let format = cli.format;
    match cli.command {
        Commands::Tables => {
            let path = cli.path.ok_or("Workspace path required for tables")?;
            commands::tables::run(&path, format)?;
        }
        Commands::Rows { table } => {
            let path = cli.path.ok_or("Workspace path required for rows")?;
            commands::rows::run(&path, &table, format)?;
        }
        Commands::References { table, column } => {
            let path = cli.path.ok_or("Workspace path required for references")?;
            commands::references::run(&path, &table, column.as_deref(), format)?;
        }
        Commands::History { table, limit } => {
            let path = cli.path.ok_or("Workspace path required for history")?;
            commands::history::run(&path, &table, limit, format)?;
        }
        Commands::Snapshot {
            table,
            label,
            actor,
        } => {
            let path = cli.path.ok_or("Workspace path required for snapshot")?;
            commands::snapshot::run(&path, &table, label, actor, format)?;
        }
        Commands::Revert { table, history_id } => {
            let path = cli.path.ok_or("Workspace path required for revert")?;
            commands::revert::run(&path, &table, &history_id, format)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or("Workspace path required for verify")?;
            commands::verify::run(&path, format)?;
        }
        Commands::Checkpoint => {
            let path = cli.path.ok_or("Workspace path required for checkpoint")?;
            commands::checkpoint::run(&path, format)?;
        }
        Commands::Version => {
            println!("Tabula CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Tabula Core v{}", tabula_core::VERSION);
        }
    }

    Ok(())
}
