// src/cli.rs
//! CLI definitions for the loadout orchestrator
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "loadout")]
#[command(version)]
#[command(about = "Dependency-aware parallel installation orchestrator", long_about = None)]
pub struct Cli {
    /// Path to the component catalog (TOML)
    #[arg(short, long, global = true, default_value = "loadout.toml")]
    pub catalog: String,

    /// Emit machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a component set and print the level-ordered plan
    Plan {
        /// Component ids to install
        #[arg(required = true)]
        components: Vec<String>,
    },

    /// Plan and execute a component set
    Install {
        /// Component ids to install
        #[arg(required = true)]
        components: Vec<String>,

        /// Maximum concurrent installs within a dependency level
        #[arg(long, default_value_t = 4)]
        max_parallel: usize,

        /// Disable automatic retry of transient failures
        #[arg(long)]
        no_recovery: bool,
    },

    /// Probe the host and print detection results with priority scores
    Detect {
        /// Component ids to probe (default: the whole catalog)
        components: Vec<String>,
    },
}
