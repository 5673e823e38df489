//! Fingerprint tree builder.
//!
//! # Overview
//!
//! The [`Walker`] traverses a [`Source`] depth first, visiting each directory's
//! entries in name order, and produces:
//!
//! - the [`DirectoryFingerprint`] tree of the scan root
//! - a [`FingerprintIndex`] with one entry per directory and per archive, at
//!   any nesting depth, keyed by canonical path relative to the scan root
//!
//! Zip archives are read fully into memory and walked as if they were
//! directories. Their entries are indexed under the archive's own path, e.g.
//! `backup.zip/photos`.
//!
//! # Construction
//!
//! Every directory is built by a recursive call that returns the finished node
//! together with the index entries of its subtree. The caller merges both only
//! when the call succeeded, so a discarded subtree never leaves stray index
//! entries behind.
//!
//! # Error isolation
//!
//! - A directory that cannot be listed is skipped with a warning. At the scan
//!   root this is fatal.
//! - A file that cannot be opened or read is skipped on its own, and so is an
//!   unreadable or corrupt archive. The rest of the listing continues.
//! - A canonical path met twice is walked once; the second parent shares the
//!   indexed node.
//!
//! # Example
//!
//! ```
//! use dupetree::scanner::source::MemorySource;
//! use dupetree::scanner::{Fingerprinter, Walker, WalkerConfig};
//!
//! let source = MemorySource::new()
//!     .with_file("a", b"foo")
//!     .with_file("docs/b", b"bar");
//! let walk = Walker::new(WalkerConfig::default())
//!     .walk(&source, &Fingerprinter::default())
//!     .unwrap();
//!
//! assert_eq!(walk.index.keys().collect::<Vec<_>>(), [".", "docs"]);
//! assert_eq!(walk.stats.files, 2);
//! ```

use std::cell::Cell;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::Serialize;

use super::path_utils::{join_path, ROOT};
use super::source::{EntryKind, Source, SourceEntry, ZipSource};
use super::{
    DirectoryFingerprint, FileFingerprint, FingerprintFn, FingerprintIndex, SubtreeError,
    WalkError, WalkerConfig,
};
use crate::progress::ProgressCallback;

/// Counters collected during a walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WalkStats {
    /// Files fingerprinted
    pub files: usize,
    /// Directory and archive nodes built
    pub directories: usize,
    /// Archives walked
    pub archives: usize,
    /// Content bytes fingerprinted
    pub bytes: u64,
    /// Subtrees discarded because of errors
    pub skipped_subtrees: usize,
}

impl WalkStats {
    fn absorb(&mut self, other: &WalkStats) {
        self.files += other.files;
        self.directories += other.directories;
        self.archives += other.archives;
        self.bytes += other.bytes;
        self.skipped_subtrees += other.skipped_subtrees;
    }
}

/// Result of a successful walk.
#[derive(Debug, Clone)]
pub struct Walk {
    /// Tree of the scan root, with path `"."`
    pub root: Arc<DirectoryFingerprint>,
    /// Every directory and archive node, keyed by canonical path
    pub index: FingerprintIndex,
    /// Counters
    pub stats: WalkStats,
}

/// A finished subtree waiting to be attached to its parent.
struct Subtree {
    node: DirectoryFingerprint,
    entries: FingerprintIndex,
    stats: WalkStats,
}

impl Subtree {
    fn new(name: &str) -> Self {
        Self {
            node: DirectoryFingerprint::new(name),
            entries: FingerprintIndex::new(),
            stats: WalkStats {
                directories: 1,
                ..WalkStats::default()
            },
        }
    }

    /// Attach the node already indexed under `key`, if any.
    fn reuse(&mut self, key: &str) -> bool {
        match self.entries.get(key) {
            Some(node) => {
                log::debug!("Already indexed, reusing: {}", key);
                self.node.subdirectories.push(Arc::clone(node));
                true
            }
            None => false,
        }
    }

    fn skip(&mut self, err: &SubtreeError, what: &str) {
        log::warn!("{} ..skipping {}", err, what);
        self.stats.skipped_subtrees += 1;
    }

    fn attach(&mut self, key: String, child: Subtree) {
        let node = Arc::new(child.node);
        self.entries.extend(child.entries);
        self.entries.insert(key, Arc::clone(&node));
        self.node.subdirectories.push(node);
        self.stats.absorb(&child.stats);
    }
}

/// Per-walk state shared by all recursive calls.
struct WalkContext<'a> {
    fingerprint: &'a dyn FingerprintFn,
    gitignore: Option<Gitignore>,
    files_seen: Cell<usize>,
}

/// Builds fingerprint trees from a [`Source`].
pub struct Walker {
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress reporting
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Walker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("config", &self.config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Walker {
    /// Create a new walker.
    #[must_use]
    pub fn new(config: WalkerConfig) -> Self {
        Self {
            config,
            shutdown_flag: None,
            progress: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// The flag is checked before each directory is listed. Once it is set,
    /// the walk returns [`WalkError::Interrupted`].
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Report each fingerprinted file to `callback`.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// The walker configuration.
    #[must_use]
    pub fn config(&self) -> &WalkerConfig {
        &self.config
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Build gitignore matcher from config patterns.
    fn build_gitignore(&self) -> Option<Gitignore> {
        if self.config.ignore_patterns.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new(ROOT);
        for pattern in &self.config.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if gitignore.is_empty() => None,
            Ok(gitignore) => Some(gitignore),
            Err(e) => {
                log::warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    fn should_skip(&self, ctx: &WalkContext<'_>, entry: &SourceEntry, key: &str) -> bool {
        if self.config.skip_hidden && entry.name.starts_with('.') {
            log::trace!("Skipping hidden entry: {}", key);
            return true;
        }
        if entry.kind == EntryKind::Dir && self.config.is_skipped_dir_name(&entry.name) {
            log::debug!("Not descending into metadata directory: {}", key);
            return true;
        }
        if let Some(gi) = &ctx.gitignore {
            if gi.matched(key, entry.kind == EntryKind::Dir).is_ignore() {
                log::trace!("Ignoring: {}", key);
                return true;
            }
        }
        false
    }

    /// Walk `source` from its root, fingerprinting every file with `fingerprint`.
    ///
    /// # Errors
    ///
    /// - [`WalkError::Root`] when the scan root cannot be listed
    /// - [`WalkError::Interrupted`] when the shutdown flag was raised
    pub fn walk(
        &self,
        source: &dyn Source,
        fingerprint: &dyn FingerprintFn,
    ) -> Result<Walk, WalkError> {
        let ctx = WalkContext {
            fingerprint,
            gitignore: self.build_gitignore(),
            files_seen: Cell::new(0),
        };

        log::info!("Walking {}", source.describe());

        let subtree = match self.walk_dir(&ctx, source, ROOT, ROOT, ROOT) {
            Ok(subtree) => subtree,
            Err(SubtreeError::Interrupted(path)) => {
                log::debug!("Walker: Shutdown requested at {}", path);
                return Err(WalkError::Interrupted);
            }
            Err(e) => {
                log::error!("{}", e);
                let io_err = match e {
                    SubtreeError::ListDir { source: err, .. } => err,
                    other => io::Error::other(other.to_string()),
                };
                return Err(WalkError::Root {
                    path: PathBuf::from(source.describe()),
                    source: io_err,
                });
            }
        };

        let root = Arc::new(subtree.node);
        let mut index = subtree.entries;
        index.insert(ROOT.to_string(), Arc::clone(&root));

        log::info!(
            "Walked {}: {} files, {} directories, {} archives, {} skipped",
            source.describe(),
            subtree.stats.files,
            subtree.stats.directories,
            subtree.stats.archives,
            subtree.stats.skipped_subtrees
        );

        Ok(Walk {
            root,
            index,
            stats: subtree.stats,
        })
    }

    /// Build the node for the directory at `path` inside `source`, indexed as `key`.
    fn walk_dir(
        &self,
        ctx: &WalkContext<'_>,
        source: &dyn Source,
        path: &str,
        key: &str,
        name: &str,
    ) -> Result<Subtree, SubtreeError> {
        if self.is_shutdown_requested() {
            return Err(SubtreeError::Interrupted(key.to_string()));
        }

        let listing = source.read_dir(path).map_err(|e| SubtreeError::ListDir {
            path: key.to_string(),
            source: e,
        })?;
        log::trace!("Listing {} ({} entries)", key, listing.len());

        let mut subtree = Subtree::new(name);

        for entry in listing {
            let child_path = join_path(path, &entry.name);
            let child_key = join_path(key, &entry.name);

            if self.should_skip(ctx, &entry, &child_key) {
                continue;
            }

            match entry.kind {
                EntryKind::Other => {
                    log::trace!("Skipping special entry: {}", child_key);
                }
                EntryKind::Dir => {
                    if subtree.reuse(&child_key) {
                        continue;
                    }
                    match self.walk_dir(ctx, source, &child_path, &child_key, &entry.name) {
                        Ok(child) => subtree.attach(child_key, child),
                        Err(e @ SubtreeError::Interrupted(_)) => return Err(e),
                        Err(e) => subtree.skip(&e, "directory"),
                    }
                }
                EntryKind::File if self.config.is_archive_name(&entry.name) => {
                    if subtree.reuse(&child_key) {
                        continue;
                    }
                    match self.walk_archive(ctx, source, &child_path, &child_key, &entry.name) {
                        Ok(Some(child)) => subtree.attach(child_key, child),
                        Ok(None) => {}
                        Err(e @ SubtreeError::Interrupted(_)) => return Err(e),
                        Err(e) => subtree.skip(&e, "archive"),
                    }
                }
                EntryKind::File => {
                    match self.fingerprint_file(ctx, source, &child_path, &child_key, &entry.name) {
                        Ok(Some(print)) => {
                            subtree.stats.files += 1;
                            subtree.stats.bytes += print.size;
                            subtree.node.files.push(print);
                        }
                        Ok(None) => {}
                        Err(e) => subtree.skip(&e, "file"),
                    }
                }
            }
        }

        Ok(subtree)
    }

    /// Fingerprint one regular file. `Ok(None)` means the file vanished.
    fn fingerprint_file(
        &self,
        ctx: &WalkContext<'_>,
        source: &dyn Source,
        path: &str,
        key: &str,
        name: &str,
    ) -> Result<Option<FileFingerprint>, SubtreeError> {
        let Some(mut reader) = open_or_vanished(source, path, key)? else {
            return Ok(None);
        };

        let print = ctx
            .fingerprint
            .fingerprint(name, &mut *reader)
            .map_err(|e| SubtreeError::ReadFile {
                path: key.to_string(),
                source: e,
            })?;

        let seen = ctx.files_seen.get() + 1;
        ctx.files_seen.set(seen);
        if let Some(progress) = &self.progress {
            progress.on_progress(seen, key);
            progress.on_item_completed(print.size);
        }

        Ok(Some(print))
    }

    /// Read the archive at `path` into memory and walk it as a directory.
    ///
    /// `Ok(None)` means the archive vanished before it could be opened.
    fn walk_archive(
        &self,
        ctx: &WalkContext<'_>,
        source: &dyn Source,
        path: &str,
        key: &str,
        name: &str,
    ) -> Result<Option<Subtree>, SubtreeError> {
        let Some(mut reader) = open_or_vanished(source, path, key)? else {
            return Ok(None);
        };
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| SubtreeError::ReadFile {
                path: key.to_string(),
                source: e,
            })?;
        drop(reader);

        log::debug!("Fingerprinting {} as an archive ({} bytes)", key, bytes.len());

        let archive =
            ZipSource::from_bytes(key, bytes).map_err(|e| SubtreeError::Archive {
                path: key.to_string(),
                source: e,
            })?;

        let mut child = self.walk_dir(ctx, &archive, ROOT, key, name)?;
        child.stats.archives += 1;
        Ok(Some(child))
    }
}

/// Open `path`, mapping NotFound to `None` so that a vanished file is skipped alone.
fn open_or_vanished<'s>(
    source: &'s dyn Source,
    path: &str,
    key: &str,
) -> Result<Option<Box<dyn Read + 's>>, SubtreeError> {
    match source.open(path) {
        Ok(reader) => Ok(Some(reader)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("File disappeared while walking: {} ({}) ..skipping file", key, e);
            Ok(None)
        }
        Err(e) => Err(SubtreeError::ReadFile {
            path: key.to_string(),
            source: e,
        }),
    }
}
