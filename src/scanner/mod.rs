//! Scanner module: fingerprinting directory trees, including zip archives.
//!
//! This module provides functionality for:
//! - Walking a [`Source`] (a real directory or an in-memory archive)
//! - Content fingerprinting with SHA-256 or BLAKE3
//! - Treating zip archives as virtual subdirectories
//! - Canonical relative path handling
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Builds the [`DirectoryFingerprint`] tree and the [`FingerprintIndex`]
//! - [`source`]: Read-only filesystem abstraction (disk and zip)
//! - [`hasher`]: Streaming file fingerprinting
//! - [`path_utils`]: Ancestry predicates and path similarity
//!
//! # Example
//!
//! ```no_run
//! use dupetree::scanner::{DiskSource, Fingerprinter, Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let source = DiskSource::new(Path::new("/home/user/Backups"));
//! let walker = Walker::new(WalkerConfig::default());
//! let walk = walker.walk(&source, &Fingerprinter::default()).unwrap();
//!
//! for (path, dir) in &walk.index {
//!     println!("{path}: {} files", dir.files.len());
//! }
//! ```

pub mod hasher;
pub mod path_utils;
pub mod source;
pub mod walker;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

pub use hasher::{digest_to_hex, DigestAlgorithm, FingerprintFn, Fingerprinter};
pub use source::{DiskSource, EntryKind, Source, SourceEntry, ZipSource};
pub use walker::{Walk, WalkStats, Walker};

/// Content digest of a file.
pub type Digest = [u8; 32];

/// Map from canonical path to the directory (or archive) node rooted there.
///
/// Keys are relative to the scan root, which itself is stored under `"."`.
/// Iteration order is lexicographic, so ancestors precede their descendants.
pub type FingerprintIndex = BTreeMap<String, Arc<DirectoryFingerprint>>;

/// Content identity of one file.
///
/// `path` is the basename while the fingerprint sits inside a
/// [`DirectoryFingerprint`], and a full relative path once it has been yielded
/// by [`crate::duplicates::HashOrderedIter`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FileFingerprint {
    /// Basename or relative path
    pub path: String,
    /// Content length in bytes
    pub size: u64,
    /// Content digest
    #[serde(serialize_with = "serialize_digest")]
    pub digest: Digest,
}

impl FileFingerprint {
    /// Create a new fingerprint.
    #[must_use]
    pub fn new(path: impl Into<String>, size: u64, digest: Digest) -> Self {
        Self {
            path: path.into(),
            size,
            digest,
        }
    }

    /// Digest as lowercase hexadecimal.
    #[must_use]
    pub fn digest_hex(&self) -> String {
        digest_to_hex(&self.digest)
    }
}

impl std::fmt::Display for FileFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FileFingerprint {:>10} {} {}",
            self.size,
            self.digest_hex(),
            self.path
        )
    }
}

fn serialize_digest<S: serde::Serializer>(digest: &Digest, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&digest_to_hex(digest))
}

/// Fingerprint of a directory or archive and everything below it.
///
/// Nodes are immutable once built. Subdirectories are shared through [`Arc`]
/// with the [`FingerprintIndex`] so that indexing a subtree costs no copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryFingerprint {
    /// Basename, or `"."` for a scan root
    pub path: String,
    /// Files directly inside this directory, in listing order
    pub files: Vec<FileFingerprint>,
    /// Child directories and archives, in listing order
    pub subdirectories: Vec<Arc<DirectoryFingerprint>>,
}

impl DirectoryFingerprint {
    /// Create an empty node with the given basename.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            files: Vec::new(),
            subdirectories: Vec::new(),
        }
    }

    /// Append a file fingerprint.
    #[must_use]
    pub fn with_file(mut self, file: FileFingerprint) -> Self {
        self.files.push(file);
        self
    }

    /// Append a child node.
    #[must_use]
    pub fn with_dir(mut self, dir: DirectoryFingerprint) -> Self {
        self.subdirectories.push(Arc::new(dir));
        self
    }

    /// Number of files in this subtree.
    #[must_use]
    pub fn total_files(&self) -> usize {
        self.files.len()
            + self
                .subdirectories
                .iter()
                .map(|d| d.total_files())
                .sum::<usize>()
    }

    /// Number of content bytes in this subtree.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum::<u64>()
            + self
                .subdirectories
                .iter()
                .map(|d| d.total_size())
                .sum::<u64>()
    }

    fn fmt_indented(&self, f: &mut std::fmt::Formatter<'_>, indent: usize) -> std::fmt::Result {
        let pad = " ".repeat(indent);
        writeln!(f, "{pad}DirectoryFingerprint {:?}", self.path)?;
        for file in &self.files {
            writeln!(f, "{pad}    {file}")?;
        }
        for dir in &self.subdirectories {
            dir.fmt_indented(f, indent + 4)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for DirectoryFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_indented(f, 0)
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Directory names that only hold platform metadata; never descended into.
    pub skip_dir_names: Vec<String>,

    /// File extensions (without dot, case-insensitive) walked as archives.
    pub archive_extensions: Vec<String>,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Gitignore-style patterns matched against canonical paths.
    pub ignore_patterns: Vec<String>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            skip_dir_names: vec!["__MACOSX".to_string()],
            archive_extensions: vec!["zip".to_string()],
            skip_hidden: false,
            ignore_patterns: Vec::new(),
        }
    }
}

impl WalkerConfig {
    /// Whether `name` carries one of the configured archive extensions.
    #[must_use]
    pub fn is_archive_name(&self, name: &str) -> bool {
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => self
                .archive_extensions
                .iter()
                .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(ext)),
            _ => false,
        }
    }

    /// Whether a directory with this name is metadata-only.
    #[must_use]
    pub fn is_skipped_dir_name(&self, name: &str) -> bool {
        self.skip_dir_names.iter().any(|n| n == name)
    }
}

/// Fatal walk failures.
#[derive(thiserror::Error, Debug)]
pub enum WalkError {
    /// The scan root could not be opened or listed.
    #[error("Cannot walk scan root {path}: {source}")]
    Root {
        /// Scan root that failed
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The walk was interrupted by a shutdown request.
    #[error("Walk interrupted by user")]
    Interrupted,
}

/// Recoverable failures that discard a single entry or subtree.
#[derive(thiserror::Error, Debug)]
pub enum SubtreeError {
    /// A directory listing failed.
    #[error("Cannot list {path}: {source}")]
    ListDir {
        /// Canonical path of the directory
        path: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A file could not be opened or read.
    #[error("Cannot read {path}: {source}")]
    ReadFile {
        /// Canonical path of the file
        path: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// An archive could not be parsed.
    #[error("Corrupt archive {path}: {source}")]
    Archive {
        /// Canonical path of the archive
        path: String,
        /// The underlying zip error
        #[source]
        source: zip::result::ZipError,
    },

    /// A shutdown was requested while walking this subtree.
    #[error("Interrupted while walking {0}")]
    Interrupted(String),
}
