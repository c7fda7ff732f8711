//! CLI module for the vector aggregator.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Collapse chunk-level Qdrant collections into one vector per document.
#[derive(Debug, Parser)]
#[command(name = "vagg")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'f',
        global = true,
        help = "Output format: text, json, or markdown"
    )]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Aggregate a chunk collection into a document collection
    Aggregate(commands::AggregateArgs),

    /// Preview the groups an aggregation would produce, without writing
    Inspect(commands::InspectArgs),

    /// Check the merged content of an aggregated collection
    Verify(commands::VerifyArgs),

    /// Check the Qdrant connection and list collections
    Status(commands::StatusArgs),

    /// List the groups stored in a metadata snapshot
    Snapshot(commands::SnapshotArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),

    /// List available aggregation methods
    Methods,
}
