//! Redundancy detection module.
//!
//! This module provides functionality for:
//! - Flattening a fingerprint tree into a hash-ordered file sequence
//! - Streaming similarity between two such sequences
//! - Pruning comparisons made redundant by identical pairs
//! - All-pairs detection over a fingerprint index

pub mod elision;
pub mod finder;
pub mod iter;
pub mod similarity;

pub use elision::{PairKey, PairLedger};
pub use finder::{detect, DetectError, DetectorConfig, RedundancyDetector};
pub use iter::HashOrderedIter;
pub use similarity::{compare, compare_dirs, PairSim, Similarity, IDENTICAL_PATH_THRESHOLD};
