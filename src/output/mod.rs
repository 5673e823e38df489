//! Output formatters for scan results.
//!
//! This module provides the report model and its renderers:
//! - [`text`] for people, least similar pairs first
//! - [`json`] for automation and scripting
//!
//! # Example
//!
//! ```
//! use std::path::PathBuf;
//! use dupetree::output::{text::TextOutput, RootReport, ScanReport};
//! use dupetree::scanner::WalkStats;
//!
//! let report = ScanReport::new(vec![RootReport::new(
//!     PathBuf::from("/data"),
//!     Vec::new(),
//!     WalkStats::default(),
//! )]);
//! let mut out = Vec::new();
//! TextOutput::new(&report).write_to(&mut out).unwrap();
//! assert!(String::from_utf8(out).unwrap().contains("No redundant directories"));
//! ```

pub mod json;
pub mod text;

use std::io::Write;
use std::path::PathBuf;

use crate::cli::OutputFormat;
use crate::duplicates::PairSim;
use crate::error::ExitCode;
use crate::scanner::WalkStats;

pub use json::JsonOutput;
pub use text::TextOutput;

/// Results for one scanned root.
#[derive(Debug, Clone)]
pub struct RootReport {
    /// Root as given on the command line
    pub root: PathBuf,
    /// Reported pairs, least similar first
    pub pairs: Vec<PairSim>,
    /// Directories and archives indexed
    pub directories: usize,
    /// Archives walked
    pub archives: usize,
    /// Files fingerprinted
    pub files: usize,
    /// Bytes fingerprinted
    pub total_bytes: u64,
    /// Subtrees discarded because of read errors
    pub skipped_subtrees: usize,
    /// Wall time spent walking and comparing, in milliseconds
    pub duration_ms: u64,
}

impl RootReport {
    /// Build a report from a walk's statistics and the detected pairs.
    #[must_use]
    pub fn new(root: PathBuf, pairs: Vec<PairSim>, stats: WalkStats) -> Self {
        Self {
            root,
            pairs,
            directories: stats.directories,
            archives: stats.archives,
            files: stats.files,
            total_bytes: stats.bytes,
            skipped_subtrees: stats.skipped_subtrees,
            duration_ms: 0,
        }
    }

    /// Set the elapsed time.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Pairs that are identical under `threshold`.
    #[must_use]
    pub fn identical_pairs(&self, threshold: f64) -> usize {
        self.pairs
            .iter()
            .filter(|p| p.similarity.is_identical_with(threshold))
            .count()
    }
}

/// Results of a whole run.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// One entry per root, in command-line order
    pub roots: Vec<RootReport>,
    /// Threshold the pairs were judged identical with
    pub identical_threshold: f64,
}

impl ScanReport {
    /// Create a report with the default identical threshold.
    #[must_use]
    pub fn new(roots: Vec<RootReport>) -> Self {
        Self {
            roots,
            identical_threshold: crate::duplicates::IDENTICAL_PATH_THRESHOLD,
        }
    }

    /// Set the identical threshold used for labelling pairs.
    #[must_use]
    pub fn with_identical_threshold(mut self, threshold: f64) -> Self {
        self.identical_threshold = threshold;
        self
    }

    /// Number of pairs across all roots.
    #[must_use]
    pub fn total_pairs(&self) -> usize {
        self.roots.iter().map(|r| r.pairs.len()).sum()
    }

    /// Number of skipped subtrees across all roots.
    #[must_use]
    pub fn skipped_subtrees(&self) -> usize {
        self.roots.iter().map(|r| r.skipped_subtrees).sum()
    }

    /// Exit code for this result.
    ///
    /// Skipped subtrees take precedence over an empty report.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        if self.skipped_subtrees() > 0 {
            ExitCode::PartialSuccess
        } else if self.total_pairs() == 0 {
            ExitCode::NoRedundancy
        } else {
            ExitCode::Success
        }
    }
}

/// Render `report` in `format` to `writer`.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn render<W: Write>(
    report: &ScanReport,
    format: OutputFormat,
    color: bool,
    writer: &mut W,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => TextOutput::new(report)
            .with_color(color)
            .write_to(writer)?,
        OutputFormat::Json => JsonOutput::new(report).write_to(writer, true)?,
    }
    Ok(())
}
