//! JSON output formatter for scan results.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "generated_at": "2024-05-01T12:00:00Z",
//!   "roots": [
//!     {
//!       "root": "/data",
//!       "directories": 12,
//!       "archives": 3,
//!       "files": 240,
//!       "total_bytes": 1288490188,
//!       "skipped_subtrees": 0,
//!       "duration_ms": 1234,
//!       "pairs": [
//!         {
//!           "path_a": "2019",
//!           "path_b": "2019.zip",
//!           "bytes_same": 1288490188,
//!           "bytes_diff": 0,
//!           "content_ratio": 1.0,
//!           "path_similarity": 1.0,
//!           "identical": true
//!         }
//!       ]
//!     }
//!   ],
//!   "summary": {
//!     "roots": 1,
//!     "pairs": 1,
//!     "identical_pairs": 1,
//!     "skipped_subtrees": 0,
//!     "exit_code": 0,
//!     "exit_code_name": "DT000"
//!   }
//! }
//! ```

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{RootReport, ScanReport};
use crate::duplicates::PairSim;

/// A single pair in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonPair {
    /// Smaller canonical path
    pub path_a: String,
    /// Larger canonical path
    pub path_b: String,
    /// Bytes present on both sides
    pub bytes_same: u64,
    /// Bytes present on one side only
    pub bytes_diff: u64,
    /// `bytes_same / (bytes_same + bytes_diff)`
    pub content_ratio: f64,
    /// Average similarity of matched relative paths
    pub path_similarity: f64,
    /// Whether the pair counts as identical
    pub identical: bool,
}

impl JsonPair {
    fn from_pair(pair: &PairSim, threshold: f64) -> Self {
        let sim = &pair.similarity;
        Self {
            path_a: pair.path_a.clone(),
            path_b: pair.path_b.clone(),
            bytes_same: sim.bytes_same,
            bytes_diff: sim.bytes_diff,
            content_ratio: sim.content_ratio(),
            path_similarity: sim.path_similarity,
            identical: sim.is_identical_with(threshold),
        }
    }
}

/// One scanned root in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRoot {
    /// Absolute path of the root where it can be resolved
    pub root: String,
    /// Directories and archives indexed
    pub directories: usize,
    /// Archives walked
    pub archives: usize,
    /// Files fingerprinted
    pub files: usize,
    /// Bytes fingerprinted
    pub total_bytes: u64,
    /// Subtrees skipped because of read errors
    pub skipped_subtrees: usize,
    /// Time spent on this root in milliseconds
    pub duration_ms: u64,
    /// Reported pairs, least similar first
    pub pairs: Vec<JsonPair>,
}

impl JsonRoot {
    fn from_root(root: &RootReport, threshold: f64) -> Self {
        Self {
            root: normalize_path(&root.root),
            directories: root.directories,
            archives: root.archives,
            files: root.files,
            total_bytes: root.total_bytes,
            skipped_subtrees: root.skipped_subtrees,
            duration_ms: root.duration_ms,
            pairs: root
                .pairs
                .iter()
                .map(|p| JsonPair::from_pair(p, threshold))
                .collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Number of roots scanned
    pub roots: usize,
    /// Pairs reported across all roots
    pub pairs: usize,
    /// Identical pairs across all roots
    pub identical_pairs: usize,
    /// Subtrees skipped across all roots
    pub skipped_subtrees: usize,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DT000")
    pub exit_code_name: String,
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// When the report was produced
    pub generated_at: DateTime<Utc>,
    /// Per-root results
    pub roots: Vec<JsonRoot>,
    /// Totals
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Build the JSON view of `report`, stamped with the current time.
    #[must_use]
    pub fn new(report: &ScanReport) -> Self {
        let threshold = report.identical_threshold;
        let exit_code = report.exit_code();
        Self {
            generated_at: Utc::now(),
            roots: report
                .roots
                .iter()
                .map(|r| JsonRoot::from_root(r, threshold))
                .collect(),
            summary: JsonSummary {
                roots: report.roots.len(),
                pairs: report.total_pairs(),
                identical_pairs: report
                    .roots
                    .iter()
                    .map(|r| r.identical_pairs(threshold))
                    .sum(),
                skipped_subtrees: report.skipped_subtrees(),
                exit_code: exit_code.as_i32(),
                exit_code_name: exit_code.code_prefix().to_string(),
            },
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Absolute form of `path`, or its display form if it cannot be resolved.
fn normalize_path(path: &std::path::Path) -> String {
    match path.canonicalize() {
        Ok(canonical) => canonical.to_string_lossy().into_owned(),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
