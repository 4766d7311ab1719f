//! CLI argument definitions using clap.
//!
//! Commands:
//! - snapctl list   --config <path>
//! - snapctl show   --config <path> --index <n> --term <n> --position <n>
//! - snapctl sweep  --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// snapctl - inspect and maintain a partition's snapshot store
#[derive(Parser, Debug)]
#[command(name = "snapctl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List committed snapshots on disk, most recent first
    List {
        /// Path to configuration file
        #[arg(long, default_value = "./snapctl.json")]
        config: PathBuf,
    },

    /// Show detail for one committed snapshot
    Show {
        /// Path to configuration file
        #[arg(long, default_value = "./snapctl.json")]
        config: PathBuf,

        /// Raft log index component of the snapshot id
        #[arg(long)]
        index: u64,

        /// Raft term component of the snapshot id
        #[arg(long)]
        term: u64,

        /// Processed position component of the snapshot id
        #[arg(long)]
        position: u64,
    },

    /// Remove stale staging directories under pending/
    Sweep {
        /// Path to configuration file
        #[arg(long, default_value = "./snapctl.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
