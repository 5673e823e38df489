//! Command-line interface definitions for dupetree.
//!
//! This module defines all CLI arguments, subcommands, and options using the clap derive API.
//! Global options (verbosity, color, logging, config file) apply to every
//! subcommand.
//!
//! # Example
//!
//! ```bash
//! # Report redundant directories under two roots
//! dupetree scan ~/backups /mnt/old-disk
//!
//! # JSON output, BLAKE3 digests, four comparison threads
//! dupetree scan ~/backups --output json --digest blake3 --threads 4
//!
//! # Write a config file with the current settings
//! dupetree config --init
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::scanner::DigestAlgorithm;

/// Find identical and similar directory trees.
///
/// dupetree fingerprints every file under the given roots, looks inside zip
/// archives as if they were directories, and reports which directories share
/// content, least similar first.
#[derive(Debug, Parser)]
#[command(name = "dupetree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Append diagnostics to this file instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Configuration file (default: platform config dir)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan directories for redundant subtrees
    Scan(ScanArgs),
    /// Show or initialize the configuration file
    Config(ConfigArgs),
}

/// Arguments for the scan subcommand.
///
/// Options left unset fall back to the configuration file and environment.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directories to scan; each is reported on its own
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Threads for pairwise comparison (1 = sequential, 0 = all cores)
    #[arg(short = 'j', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Content digest
    #[arg(long, value_enum)]
    pub digest: Option<DigestAlgorithm>,

    /// Also report pairs that share no content
    #[arg(long)]
    pub include_disjoint: bool,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,

    /// Gitignore-style patterns to ignore (can be specified multiple times)
    #[arg(short, long = "ignore", value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,

    /// File extensions walked as archives, replacing the configured list
    #[arg(long = "archive-ext", value_name = "EXT")]
    pub archive_extensions: Vec<String>,

    /// Minimum path similarity for equal content to count as identical
    #[arg(long, value_name = "RATIO", value_parser = parse_ratio)]
    pub identical_threshold: Option<f64>,
}

/// Arguments for the config subcommand.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Print the effective configuration as TOML
    #[arg(long, conflicts_with = "init")]
    pub show: bool,

    /// Write the effective configuration to the config file
    #[arg(long)]
    pub init: bool,
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable report
    #[default]
    Text,
    /// JSON output for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a similarity ratio in `0.0..=1.0`.
///
/// # Examples
///
/// ```
/// use dupetree::cli::parse_ratio;
///
/// assert_eq!(parse_ratio("0.95").unwrap(), 0.95);
/// assert!(parse_ratio("1.5").is_err());
/// ```
///
/// # Errors
///
/// Returns an error if the string is not a number or lies outside `0..=1`.
pub fn parse_ratio(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number: '{s}'"))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("Ratio must be between 0 and 1, got {value}"));
    }
    Ok(value)
}
