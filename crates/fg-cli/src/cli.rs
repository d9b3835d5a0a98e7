//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Foreground app usage from device snapshots.
///
/// Rebuilds foreground sessions from transition events and reconciles them
/// with the OS aggregate usage counter.
#[derive(Debug, Parser)]
#[command(name = "fgtime", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Snapshot directory (overrides the configured one).
    #[arg(long, global = true)]
    pub snapshot: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show per-app usage over a time range (at most 7 days by default).
    Usage {
        /// Range start (ISO 8601 or relative, e.g. "2 hours ago").
        #[arg(long)]
        start: String,

        /// Range end (ISO 8601 or relative). Defaults to now.
        #[arg(long)]
        end: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show per-app usage since local midnight.
    Today {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List merged foreground sessions per app.
    Sessions {
        /// Range start (ISO 8601 or relative, e.g. "2 hours ago").
        #[arg(long)]
        start: String,

        /// Range end (ISO 8601 or relative). Defaults to now.
        #[arg(long)]
        end: Option<String>,
    },

    /// Print the effective policy as JSON.
    Policy,
}
