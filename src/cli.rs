//! Command-line interface definitions.
//!
//! All arguments use the clap derive API. Global options (verbosity)
//! sit on the top-level parser; everything operation-specific lives on
//! the subcommand.
//!
//! # Example
//!
//! ```bash
//! # Plan an archive layout with the default nilsimsa ordering
//! blockpack plan /data/tree
//!
//! # Path ordering, listing every inode in final order
//! blockpack plan /data/tree --order path --list
//!
//! # Tune the nilsimsa window
//! blockpack plan /data/tree --nilsimsa-depth 30000 --nilsimsa-limit 240
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::FileOrderMode;

/// Deduplicating read-only archive layout builder.
#[derive(Debug, Parser)]
#[command(name = "blockpack", version, about)]
pub struct Cli {
    /// Increase verbosity (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only report errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compute the inode layout for a directory tree without writing
    /// an archive
    Plan(PlanArgs),
}

/// Arguments for the `plan` subcommand.
#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Directory to pack
    pub input: PathBuf,

    /// Load options from a JSON config file (CLI flags win)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Inode ordering policy
    #[arg(long, value_enum, value_name = "MODE")]
    pub order: Option<FileOrderMode>,

    /// Maximum nilsimsa comparison window
    #[arg(long, value_name = "N")]
    pub nilsimsa_depth: Option<usize>,

    /// Lower bound for the adaptive nilsimsa window
    #[arg(long, value_name = "N")]
    pub nilsimsa_min_depth: Option<usize>,

    /// Early-exit similarity threshold (0-256)
    #[arg(long, value_name = "SIM")]
    pub nilsimsa_limit: Option<u32>,

    /// Also compute the coarse similarity hash during the scan
    #[arg(long)]
    pub with_similarity: bool,

    /// First inode number to assign
    #[arg(long, value_name = "NUM", default_value_t = 0)]
    pub first_inode: u32,

    /// Print every inode in final order
    #[arg(long)]
    pub list: bool,

    /// Disable the progress display
    #[arg(long)]
    pub no_progress: bool,
}

impl PlanArgs {
    /// Fold these arguments into a loaded configuration.
    pub fn apply_to(&self, config: &mut crate::config::Config) {
        if let Some(mode) = self.order {
            config.file_order.mode = mode;
        }
        if let Some(depth) = self.nilsimsa_depth {
            config.file_order.nilsimsa_depth = depth;
        }
        if let Some(min_depth) = self.nilsimsa_min_depth {
            config.file_order.nilsimsa_min_depth = min_depth;
        }
        if let Some(limit) = self.nilsimsa_limit {
            config.file_order.nilsimsa_limit = limit;
        }
        if self.with_similarity {
            config.inode_options.with_similarity = true;
        }
    }
}
