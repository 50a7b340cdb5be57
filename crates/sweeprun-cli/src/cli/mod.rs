//! CLI command definitions and dispatch for the `sweeprun` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod plan;
pub mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Expand and execute parameterized experiment sweeps.
#[derive(Parser)]
#[command(name = "sweeprun", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute every section of an experiment manifest.
    Run {
        /// Path to the TOML experiment manifest.
        manifest: PathBuf,

        /// Worker-pool size (overrides the manifest's `cores`).
        #[arg(short, long)]
        cores: Option<usize>,
    },

    /// Print every job the manifest expands to, without executing anything.
    Plan {
        /// Path to the TOML experiment manifest.
        manifest: PathBuf,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
