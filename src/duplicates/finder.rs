//! All-pairs redundancy detection over a fingerprint index.
//!
//! # Overview
//!
//! [`RedundancyDetector`] compares every pair of indexed directories and
//! archives that are not nested in one another, and reports how similar they
//! are. Index keys are visited in lexicographic order, so every ancestor is
//! compared before its descendants. Once a pair turns out identical, the
//! comparisons it makes redundant are skipped (see [`super::elision`]), and a
//! cleanup pass drops the redundant pairs that were computed before it.
//!
//! The report is sorted least similar first.
//!
//! # Parallel mode
//!
//! With more than one thread, all candidate similarities are computed up
//! front on a rayon pool. Elision is then replayed sequentially over the
//! precomputed values, so the output equals the sequential one.
//!
//! # Example
//!
//! ```
//! use dupetree::duplicates::{DetectorConfig, RedundancyDetector};
//! use dupetree::scanner::source::MemorySource;
//! use dupetree::scanner::{Fingerprinter, Walker, WalkerConfig};
//!
//! let source = MemorySource::new()
//!     .with_file("photos/a.jpg", b"aaa")
//!     .with_file("backup/photos/a.jpg", b"aaa");
//! let walk = Walker::new(WalkerConfig::default())
//!     .walk(&source, &Fingerprinter::default())
//!     .unwrap();
//!
//! let pairs = RedundancyDetector::new(DetectorConfig::default())
//!     .detect(&walk.index)
//!     .unwrap();
//! assert_eq!(pairs.len(), 1);
//! assert_eq!(pairs[0].path_a, "backup/photos");
//! assert_eq!(pairs[0].path_b, "photos");
//! assert!(pairs[0].similarity.is_identical());
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use super::elision::{both_ancestor, PairKey, PairLedger};
use super::similarity::{compare_dirs, PairSim, Similarity, IDENTICAL_PATH_THRESHOLD};
use crate::progress::ProgressCallback;
use crate::scanner::path_utils::is_strict_descendant;
use crate::scanner::{DirectoryFingerprint, FingerprintIndex};

/// Configuration for redundancy detection.
#[derive(Clone)]
pub struct DetectorConfig {
    /// Minimum average path similarity for equal content to count as identical.
    pub identical_threshold: f64,
    /// Report pairs that share no content at all.
    pub include_disjoint: bool,
    /// Worker threads for computing similarities; 1 runs sequentially.
    pub threads: usize,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for DetectorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorConfig")
            .field("identical_threshold", &self.identical_threshold)
            .field("include_disjoint", &self.include_disjoint)
            .field("threads", &self.threads)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            identical_threshold: IDENTICAL_PATH_THRESHOLD,
            include_disjoint: false,
            threads: 1,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl DetectorConfig {
    /// Set the identical path similarity threshold.
    #[must_use]
    pub fn with_identical_threshold(mut self, threshold: f64) -> Self {
        self.identical_threshold = threshold;
        self
    }

    /// Report pairs without shared content.
    #[must_use]
    pub fn with_include_disjoint(mut self, include: bool) -> Self {
        self.include_disjoint = include;
        self
    }

    /// Set the number of worker threads.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Errors that can occur during detection.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    /// The detection was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Detection interrupted by user")]
    Interrupted,
}

/// A pair of index entries worth comparing.
struct Candidate<'a> {
    k1: &'a str,
    k2: &'a str,
    d1: &'a DirectoryFingerprint,
    d2: &'a DirectoryFingerprint,
}

/// Pairwise comparison of indexed directories.
#[derive(Debug, Default)]
pub struct RedundancyDetector {
    config: DetectorConfig,
}

impl RedundancyDetector {
    /// Create a detector with the given configuration.
    #[must_use]
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Create a detector with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DetectorConfig::default())
    }

    /// Compare all unrelated pairs in `index`.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::Interrupted`] when the shutdown flag was raised.
    pub fn detect(&self, index: &FingerprintIndex) -> Result<Vec<PairSim>, DetectError> {
        let candidates = candidates(index);
        log::info!(
            "Comparing {} directories ({} candidate pairs)",
            index.len(),
            candidates.len()
        );

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("compare", candidates.len());
        }

        let precomputed = if self.config.threads > 1 && candidates.len() > 1 {
            Some(self.precompute(&candidates)?)
        } else {
            None
        };

        let mut ledger = PairLedger::new();
        let mut pairs = Vec::new();
        let mut elided = 0usize;

        for (n, candidate) in candidates.iter().enumerate() {
            if self.config.is_shutdown_requested() {
                log::debug!("Detector: Shutdown requested, discarding partial results");
                return Err(DetectError::Interrupted);
            }

            let key = PairKey::new(candidate.k1, candidate.k2);
            debug_assert!(!ledger.was_compared(&key), "pair {} {} listed twice", key.a, key.b);
            if ledger.elided_by(candidate.k1, candidate.k2).is_some() {
                elided += 1;
                continue;
            }

            let sim = match &precomputed {
                Some(sims) => sims[n],
                None => {
                    if let Some(ref callback) = self.config.progress_callback {
                        callback.on_progress(n + 1, candidate.k1);
                    }
                    compare_dirs(candidate.d1, candidate.d2)
                }
            };
            let identical = sim.is_identical_with(self.config.identical_threshold);
            if identical {
                log::debug!("Identical: {} {}", candidate.k1, candidate.k2);
            }
            ledger.record(key, identical);

            if sim.bytes_same == 0 && !self.config.include_disjoint {
                continue;
            }
            pairs.push(PairSim::new(candidate.k1, candidate.k2, sim));
        }

        let computed = pairs.len();
        pairs.retain(|p| match ledger.superseded_by(&p.path_a, &p.path_b) {
            Some(ident) => {
                debug_assert!(
                    !(both_ancestor(&ident.a, &ident.b, &p.path_a, &p.path_b)
                        && p.similarity.is_identical_with(self.config.identical_threshold)),
                    "ancestors of an identical pair compared identical"
                );
                false
            }
            None => true,
        });

        pairs.sort_by(PairSim::cmp_report);

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("compare");
        }

        log::info!(
            "Compared {} pairs, elided {}, dropped {} in cleanup, reporting {}",
            ledger.compared_count(),
            elided,
            computed - pairs.len(),
            pairs.len()
        );

        Ok(pairs)
    }

    /// Compute every candidate similarity on a bounded rayon pool.
    fn precompute(&self, candidates: &[Candidate<'_>]) -> Result<Vec<Similarity>, DetectError> {
        let done = AtomicUsize::new(0);
        let work = || {
            candidates
                .par_iter()
                .map(|c| {
                    if self.config.is_shutdown_requested() {
                        return None;
                    }
                    let sim = compare_dirs(c.d1, c.d2);
                    let current = done.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(ref callback) = self.config.progress_callback {
                        callback.on_progress(current, c.k1);
                    }
                    Some(sim)
                })
                .collect::<Option<Vec<_>>>()
        };

        let result = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
        {
            Ok(pool) => pool.install(work),
            Err(e) => {
                log::warn!(
                    "Failed to create custom thread pool ({}), using global pool with {} threads",
                    e,
                    rayon::current_num_threads()
                );
                work()
            }
        };

        result.ok_or(DetectError::Interrupted)
    }
}

/// All unordered pairs `(k1 < k2)` of index entries that are not nested in one another.
fn candidates(index: &FingerprintIndex) -> Vec<Candidate<'_>> {
    let entries: Vec<(&str, &DirectoryFingerprint)> = index
        .iter()
        .map(|(k, d)| (k.as_str(), d.as_ref()))
        .collect();

    let mut out = Vec::new();
    for (i, &(k1, d1)) in entries.iter().enumerate() {
        for &(k2, d2) in &entries[i + 1..] {
            if is_strict_descendant(k1, k2) || is_strict_descendant(k2, k1) {
                continue;
            }
            out.push(Candidate { k1, k2, d1, d2 });
        }
    }
    out
}

/// Detect redundancy in `index` with the default configuration.
#[must_use]
pub fn detect(index: &FingerprintIndex) -> Vec<PairSim> {
    // without a shutdown flag detection cannot be interrupted
    RedundancyDetector::with_defaults()
        .detect(index)
        .unwrap_or_default()
}
