//! Streaming similarity between two hash-ordered file sequences.
//!
//! [`compare`] merge-joins two ascending-by-digest sequences (as produced by
//! [`super::HashOrderedIter`]). Matching digests count their size as shared
//! bytes and contribute the similarity of the two relative paths; everything
//! else counts as differing bytes.

use std::cmp::Ordering;
use std::iter::Peekable;

use serde::Serialize;

use super::HashOrderedIter;
use crate::scanner::path_utils::path_similarity;
use crate::scanner::{DirectoryFingerprint, FileFingerprint};

/// Minimum average path similarity for two trees with equal content to be
/// called identical.
pub const IDENTICAL_PATH_THRESHOLD: f64 = 0.99;

/// Similarity of two file collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Similarity {
    /// Bytes of files present on both sides
    pub bytes_same: u64,
    /// Bytes of files present on only one side
    pub bytes_diff: u64,
    /// Average path similarity over matched files, 0.0 without matches
    pub path_similarity: f64,
}

impl Similarity {
    /// Same content and (nearly) the same layout.
    #[must_use]
    pub fn is_identical(&self) -> bool {
        self.is_identical_with(IDENTICAL_PATH_THRESHOLD)
    }

    /// Like [`Self::is_identical`] with a custom path similarity threshold.
    #[must_use]
    pub fn is_identical_with(&self, threshold: f64) -> bool {
        self.bytes_diff == 0 && self.path_similarity >= threshold
    }

    /// Fraction of bytes shared, `0.0` when both sides are empty.
    #[must_use]
    pub fn content_ratio(&self) -> f64 {
        let total = self.bytes_same + self.bytes_diff;
        if total == 0 {
            0.0
        } else {
            self.bytes_same as f64 / total as f64
        }
    }

    /// Compare the shared-byte ratios without floating point division.
    ///
    /// `same1 / total1 < same2 / total2` reduces to
    /// `diff1 * same2 > diff2 * same1`. Two empty sides rank as ratio zero.
    #[must_use]
    pub fn cmp_content(&self, other: &Similarity) -> Ordering {
        let (same1, diff1) = self.ratio_terms();
        let (same2, diff2) = other.ratio_terms();
        (diff2 * same1).cmp(&(diff1 * same2))
    }

    fn ratio_terms(&self) -> (u128, u128) {
        if self.bytes_same == 0 && self.bytes_diff == 0 {
            (0, 1)
        } else {
            (u128::from(self.bytes_same), u128::from(self.bytes_diff))
        }
    }

    /// Total order: content ratio first, then path similarity.
    #[must_use]
    pub fn cmp_similarity(&self, other: &Similarity) -> Ordering {
        self.cmp_content(other)
            .then_with(|| self.path_similarity.total_cmp(&other.path_similarity))
    }

    /// Whether `self` is less similar than `other`.
    #[must_use]
    pub fn less(&self, other: &Similarity) -> bool {
        self.cmp_similarity(other) == Ordering::Less
    }
}

impl std::fmt::Display for Similarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<Similarity bytes={:.2} path={:.2}>",
            self.content_ratio(),
            self.path_similarity
        )
    }
}

/// Merge-compare two ascending-by-digest sequences.
///
/// Equal digests are assumed to mean equal content and equal size.
pub fn compare<A, B>(a: A, b: B) -> Similarity
where
    A: IntoIterator<Item = FileFingerprint>,
    B: IntoIterator<Item = FileFingerprint>,
{
    let mut a: Peekable<A::IntoIter> = a.into_iter().peekable();
    let mut b: Peekable<B::IntoIter> = b.into_iter().peekable();
    let mut sim = Similarity::default();
    let mut path_sum = 0.0;
    let mut matches = 0usize;

    loop {
        let order = match (a.peek(), b.peek()) {
            (None, None) => break,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(x), Some(y)) => x.digest.cmp(&y.digest),
        };
        match order {
            Ordering::Less => {
                if let Some(x) = a.next() {
                    sim.bytes_diff += x.size;
                }
            }
            Ordering::Greater => {
                if let Some(y) = b.next() {
                    sim.bytes_diff += y.size;
                }
            }
            Ordering::Equal => {
                if let (Some(x), Some(y)) = (a.next(), b.next()) {
                    sim.bytes_same += x.size;
                    let ps = path_similarity(&x.path, &y.path);
                    log::trace!("Path similarity of {:?} and {:?}: {:.2}", x.path, y.path, ps);
                    path_sum += ps;
                    matches += 1;
                }
            }
        }
    }

    if matches > 0 {
        sim.path_similarity = path_sum / matches as f64;
    }
    sim
}

/// Similarity of two directory trees.
#[must_use]
pub fn compare_dirs(a: &DirectoryFingerprint, b: &DirectoryFingerprint) -> Similarity {
    compare(HashOrderedIter::new(a), HashOrderedIter::new(b))
}

/// Similarity of two indexed directories, with `path_a < path_b`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairSim {
    /// Lexicographically smaller canonical path
    pub path_a: String,
    /// Lexicographically larger canonical path
    pub path_b: String,
    /// Their similarity
    pub similarity: Similarity,
}

impl PairSim {
    /// Create a pair, ordering the two paths.
    #[must_use]
    pub fn new(p1: impl Into<String>, p2: impl Into<String>, similarity: Similarity) -> Self {
        let (p1, p2) = (p1.into(), p2.into());
        let (path_a, path_b) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
        Self {
            path_a,
            path_b,
            similarity,
        }
    }

    /// Report order: least similar first, ties broken by path.
    #[must_use]
    pub fn cmp_report(&self, other: &PairSim) -> Ordering {
        self.similarity
            .cmp_similarity(&other.similarity)
            .then_with(|| self.path_a.cmp(&other.path_a))
            .then_with(|| self.path_b.cmp(&other.path_b))
    }
}

impl std::fmt::Display for PairSim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.similarity, self.path_a, self.path_b)
    }
}
