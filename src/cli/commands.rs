//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Declarative, idempotent reconciliation of Cisco Intersight resources.
#[derive(Parser, Debug)]
#[command(name = "intersight-reconcile")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the manifest.
    #[arg(short, long, global = true, env = "INTERSIGHT_MANIFEST")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit log lines as JSON.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the manifest without contacting Intersight.
    Validate {
        /// Show warnings too.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Show what apply would change, issuing only reads.
    Plan,

    /// Reconcile every resource of the manifest.
    Apply {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,

        /// Keep going after a failed resource.
        #[arg(long)]
        continue_on_error: bool,
    },

    /// List supported resource kinds.
    Kinds,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}
