//! Hash-ordered flattening of a fingerprint tree.
//!
//! [`HashOrderedIter`] yields every file below a [`DirectoryFingerprint`] in
//! ascending digest order, with paths made relative to the iteration root.
//! It is a k-way merge: one branch over the node's own files (sorted by
//! digest) and one recursive branch per subdirectory, arbitrated by a
//! min-heap keyed on `(digest, branch order)`.
//!
//! ```
//! use dupetree::duplicates::HashOrderedIter;
//! use dupetree::scanner::{DirectoryFingerprint, FileFingerprint};
//!
//! let tree = DirectoryFingerprint::new(".")
//!     .with_file(FileFingerprint::new("a", 1, [2; 32]))
//!     .with_dir(DirectoryFingerprint::new("b").with_file(FileFingerprint::new("c", 1, [1; 32])));
//!
//! let paths: Vec<_> = HashOrderedIter::new(&tree).map(|f| f.path).collect();
//! assert_eq!(paths, ["b/c", "a"]);
//! ```

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::iter::FusedIterator;

use crate::scanner::path_utils::join_path;
use crate::scanner::{Digest, DirectoryFingerprint, FileFingerprint};

enum BranchSource<'a> {
    Files(std::vec::IntoIter<&'a FileFingerprint>),
    Dir(Box<HashOrderedIter<'a>>),
}

impl BranchSource<'_> {
    fn next(&mut self) -> Option<FileFingerprint> {
        match self {
            Self::Files(files) => files.next().cloned(),
            Self::Dir(iter) => iter.next(),
        }
    }
}

struct Branch<'a> {
    /// Empty for the node's own files, the child basename otherwise
    prefix: &'a str,
    source: BranchSource<'a>,
    head: Option<FileFingerprint>,
}

/// Lazy, single-pass iterator over all files of a tree in ascending digest order.
///
/// On equal digests the node's own files come first, then subdirectories in
/// tree order. Recreate the iterator to traverse again.
pub struct HashOrderedIter<'a> {
    branches: Vec<Branch<'a>>,
    heap: BinaryHeap<Reverse<(Digest, usize)>>,
    remaining: usize,
}

impl<'a> HashOrderedIter<'a> {
    /// Create an iterator over `node` and everything below it.
    #[must_use]
    pub fn new(node: &'a DirectoryFingerprint) -> Self {
        let mut own: Vec<&FileFingerprint> = node.files.iter().collect();
        // stable: equal digests keep listing order
        own.sort_by(|a, b| a.digest.cmp(&b.digest));

        let mut iter = Self {
            branches: Vec::with_capacity(1 + node.subdirectories.len()),
            heap: BinaryHeap::new(),
            remaining: node.files.len(),
        };
        iter.push_branch("", BranchSource::Files(own.into_iter()));

        for child in &node.subdirectories {
            let child_iter = HashOrderedIter::new(child.as_ref());
            iter.remaining += child_iter.remaining;
            iter.push_branch(&child.path, BranchSource::Dir(Box::new(child_iter)));
        }
        iter
    }

    fn push_branch(&mut self, prefix: &'a str, mut source: BranchSource<'a>) {
        let index = self.branches.len();
        let head = source.next();
        if let Some(first) = &head {
            self.heap.push(Reverse((first.digest, index)));
        }
        self.branches.push(Branch {
            prefix,
            source,
            head,
        });
    }
}

impl Iterator for HashOrderedIter<'_> {
    type Item = FileFingerprint;

    fn next(&mut self) -> Option<FileFingerprint> {
        let Reverse((_, index)) = self.heap.pop()?;
        let branch = &mut self.branches[index];
        let mut value = branch.head.take()?;

        branch.head = branch.source.next();
        if let Some(next) = &branch.head {
            self.heap.push(Reverse((next.digest, index)));
        }

        if !branch.prefix.is_empty() {
            value.path = join_path(branch.prefix, &value.path);
        }
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for HashOrderedIter<'_> {}

impl FusedIterator for HashOrderedIter<'_> {}
