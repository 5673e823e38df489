//! Pruning of comparisons made redundant by identical pairs.
//!
//! Once two directories `i1` and `i2` are known to be identical, comparing
//! anything inside one against anything inside (or above) the other only
//! restates that fact. The predicates below name each such relation between a
//! candidate pair `(k1, k2)` and an identical pair `(i1, i2)`; all of them are
//! symmetric in both pairs.
//!
//! Take `a/b` and `foo/b` identical:
//!
//! | candidate            | relation                 | stage     |
//! |----------------------|--------------------------|-----------|
//! | `a/b/c`, `foo/b/d`   | [`both_descendant`]      | in-pass   |
//! | `a/b`, `foo/b/c`     | [`descendant_and_match`] | in-pass   |
//! | `a/b/c`, `foo`       | [`descendant_and_ancestor`] | both   |
//! | `a`, `foo`           | [`both_ancestor`]        | cleanup   |
//! | `a`, `foo/b`         | [`ancestor_and_match`]   | cleanup   |
//!
//! Ancestors sort before their descendants, so ancestor pairs have usually
//! been compared before the identical pair is discovered. Those are removed by
//! a cleanup pass over the finished list.

use std::collections::HashSet;

use crate::scanner::path_utils::is_strict_descendant;

/// An unordered pair of canonical paths, stored with `a <= b`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    /// Smaller path
    pub a: String,
    /// Larger path
    pub b: String,
}

impl PairKey {
    /// Create a key, ordering the two paths.
    #[must_use]
    pub fn new(p1: &str, p2: &str) -> Self {
        let (a, b) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
        Self {
            a: a.to_string(),
            b: b.to_string(),
        }
    }
}

/// `k1` and `k2` sit inside the two identical sides, one each.
#[must_use]
pub fn both_descendant(i1: &str, i2: &str, k1: &str, k2: &str) -> bool {
    (is_strict_descendant(i1, k1) && is_strict_descendant(i2, k2))
        || (is_strict_descendant(i1, k2) && is_strict_descendant(i2, k1))
}

/// One of `k1`/`k2` sits inside one identical side and the other is the other side.
#[must_use]
pub fn descendant_and_match(i1: &str, i2: &str, k1: &str, k2: &str) -> bool {
    (is_strict_descendant(i1, k1) && i2 == k2)
        || (is_strict_descendant(i1, k2) && i2 == k1)
        || (is_strict_descendant(i2, k1) && i1 == k2)
        || (is_strict_descendant(i2, k2) && i1 == k1)
}

/// One of `k1`/`k2` sits inside one identical side and the other is an
/// ancestor of the other side.
#[must_use]
pub fn descendant_and_ancestor(i1: &str, i2: &str, k1: &str, k2: &str) -> bool {
    (is_strict_descendant(i1, k1) && is_strict_descendant(k2, i2))
        || (is_strict_descendant(i1, k2) && is_strict_descendant(k1, i2))
        || (is_strict_descendant(i2, k1) && is_strict_descendant(k2, i1))
        || (is_strict_descendant(i2, k2) && is_strict_descendant(k1, i1))
}

/// `k1` and `k2` are ancestors of the two identical sides, one each.
#[must_use]
pub fn both_ancestor(i1: &str, i2: &str, k1: &str, k2: &str) -> bool {
    both_descendant(k1, k2, i1, i2)
}

/// One of `k1`/`k2` is an ancestor of one identical side and the other is the
/// other side.
#[must_use]
pub fn ancestor_and_match(i1: &str, i2: &str, k1: &str, k2: &str) -> bool {
    descendant_and_match(k1, k2, i1, i2)
}

/// Record of the pairs compared so far, keeping identical pairs apart.
#[derive(Debug, Default, Clone)]
pub struct PairLedger {
    identical: Vec<PairKey>,
    compared: HashSet<PairKey>,
}

impl PairLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a computed pair.
    pub fn record(&mut self, key: PairKey, identical: bool) {
        if identical {
            self.identical.push(key.clone());
        }
        self.compared.insert(key);
    }

    /// Whether the pair was already computed.
    #[must_use]
    pub fn was_compared(&self, key: &PairKey) -> bool {
        self.compared.contains(key)
    }

    /// Identical pairs in discovery order.
    #[must_use]
    pub fn identical(&self) -> &[PairKey] {
        &self.identical
    }

    /// Number of pairs computed.
    #[must_use]
    pub fn compared_count(&self) -> usize {
        self.compared.len()
    }

    /// The identical pair that makes comparing `(k1, k2)` pointless, if any.
    #[must_use]
    pub fn elided_by(&self, k1: &str, k2: &str) -> Option<&PairKey> {
        self.identical.iter().find(|ident| {
            let (i1, i2) = (ident.a.as_str(), ident.b.as_str());
            if both_descendant(i1, i2, k1, k2) {
                log::debug!("Elided {} {}: both inside identical {} {}", k1, k2, i1, i2);
                true
            } else if descendant_and_match(i1, i2, k1, k2) {
                log::debug!("Elided {} {}: inside and equal to identical {} {}", k1, k2, i1, i2);
                true
            } else if descendant_and_ancestor(i1, i2, k1, k2) {
                log::debug!("Elided {} {}: inside and above identical {} {}", k1, k2, i1, i2);
                true
            } else {
                false
            }
        })
    }

    /// The identical pair that makes an already computed `(p1, p2)` redundant, if any.
    #[must_use]
    pub fn superseded_by(&self, p1: &str, p2: &str) -> Option<&PairKey> {
        self.identical.iter().find(|ident| {
            let (i1, i2) = (ident.a.as_str(), ident.b.as_str());
            if both_ancestor(i1, i2, p1, p2) {
                log::debug!("Dropped {} {}: both above identical {} {}", p1, p2, i1, i2);
                true
            } else if ancestor_and_match(i1, i2, p1, p2) {
                log::debug!("Dropped {} {}: above and equal to identical {} {}", p1, p2, i1, i2);
                true
            } else if descendant_and_ancestor(i1, i2, p1, p2) {
                log::debug!("Dropped {} {}: inside and above identical {} {}", p1, p2, i1, i2);
                true
            } else {
                false
            }
        })
    }
}
