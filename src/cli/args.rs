//! Command line argument parsing for the annex CLI using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Annex - a benchmark harness for approximate nearest-neighbor indexes
#[derive(Parser, Debug, Clone)]
#[command(name = "annex")]
#[command(about = "Benchmark harness for HNSW vector indexes")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct AnnexArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl AnnexArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build an index over a dataset and measure insert, search and remove
    Bench(BenchArgs),

    /// Write a synthetic dataset as JSON lines
    Generate(GenerateArgs),
}

/// Arguments for `annex bench`.
#[derive(Args, Debug, Clone)]
pub struct BenchArgs {
    /// Dataset file, one `{"key": ..., "vector": [...]}` object per line
    #[arg(short, long, conflicts_with = "synthetic", required_unless_present = "synthetic")]
    pub input: Option<PathBuf>,

    /// Use this many random vectors instead of a dataset file
    #[arg(long, value_name = "COUNT")]
    pub synthetic: Option<usize>,

    /// Dimension of synthetic vectors
    #[arg(short, long, default_value = "64")]
    pub dimension: usize,

    /// JSON index configuration; flags below override its fields
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Index type (dot_product or cosine)
    #[arg(short = 't', long = "type")]
    pub index_type: Option<String>,

    #[arg(long)]
    pub max_links: Option<usize>,

    #[arg(long)]
    pub ef_construction: Option<usize>,

    /// link_nearest or link_diverse
    #[arg(long)]
    pub insert_method: Option<String>,

    /// no_link or compensate_incoming_links
    #[arg(long)]
    pub remove_method: Option<String>,

    /// Number of control queries (default: 1% of the dataset, at least 1)
    #[arg(long)]
    pub control_size: Option<usize>,

    /// Neighbors per query for recall@k
    #[arg(short = 'k', long, default_value = "10")]
    pub neighbors: usize,

    /// Share of inserted entries to remove after the first recall pass
    #[arg(long, default_value = "0.0")]
    pub remove_fraction: f64,

    /// Seed for shuffling and synthetic data
    #[arg(long, default_value = "42")]
    pub seed: u64,
}

/// Arguments for `annex generate`.
#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Output file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Number of vectors
    #[arg(short = 'n', long, default_value = "10000")]
    pub count: usize,

    /// Vector dimension
    #[arg(short, long, default_value = "64")]
    pub dimension: usize,

    #[arg(long, default_value = "42")]
    pub seed: u64,
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
