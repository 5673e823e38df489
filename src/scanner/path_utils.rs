//! Relative path utilities: ancestry predicates, joining and path similarity.
//!
//! Every path handled here is a canonical, slash-separated path relative to a
//! scan root. The scan root itself is written as [`ROOT`] (`"."`). Paths inside
//! archives are addressed the same way: `photos.zip/2019/img.jpg`.
//!
//! # Segment boundaries
//!
//! Ancestry is decided on whole path segments, never on raw string prefixes.
//! `foo/bar` is an ancestor of `foo/bar/baz` but not of `foo/bar.zip` or
//! `foo/bar-baz`.
//!
//! ```
//! use dupetree::scanner::path_utils::{is_descendant_or_equal, is_strict_descendant};
//!
//! assert!(is_strict_descendant("foo", "foo/bar"));
//! assert!(!is_strict_descendant("foo/bar", "foo/bar.zip"));
//! assert!(is_strict_descendant(".", "foo"));
//! assert!(is_descendant_or_equal("foo/bar", "foo/bar"));
//! ```
//!
//! # Unicode
//!
//! macOS stores names in NFD form while most other systems use NFC, so the same
//! visual name may have two byte representations. [`path_similarity`] compares
//! NFC-normalized strings so that such pairs still score 1.0.

use std::borrow::Cow;

use unicode_normalization::UnicodeNormalization;

/// Canonical path of a scan root.
pub const ROOT: &str = ".";

fn is_root(path: &str) -> bool {
    path.is_empty() || path == ROOT
}

/// Returns whether `candidate` is nested inside `ancestor` at any depth.
///
/// A path is never a strict descendant of itself. The root `"."` is an
/// ancestor of every other path. A trailing slash on `ancestor` is ignored.
#[must_use]
pub fn is_strict_descendant(ancestor: &str, candidate: &str) -> bool {
    if is_root(candidate) {
        return false;
    }
    let ancestor = ancestor.trim_end_matches('/');
    if is_root(ancestor) {
        return true;
    }
    candidate
        .strip_prefix(ancestor)
        .is_some_and(|rest| rest.len() > 1 && rest.starts_with('/'))
}

/// Like [`is_strict_descendant`], but also true when both paths are equal.
#[must_use]
pub fn is_descendant_or_equal(ancestor: &str, candidate: &str) -> bool {
    ancestor.trim_end_matches('/') == candidate || is_strict_descendant(ancestor, candidate)
}

/// Join a relative path onto a prefix.
///
/// An empty prefix or the root prefix yields `name` unchanged.
///
/// ```
/// use dupetree::scanner::path_utils::join_path;
///
/// assert_eq!(join_path(".", "a"), "a");
/// assert_eq!(join_path("", "a"), "a");
/// assert_eq!(join_path("a/b", "c"), "a/b/c");
/// ```
#[must_use]
pub fn join_path(prefix: &str, name: &str) -> String {
    if is_root(prefix) {
        name.to_string()
    } else if name.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Last segment of a canonical path; the root is returned as `"."`.
#[must_use]
pub fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if is_root(trimmed) {
        return ROOT;
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Normalize a path string to NFC (Composed) form.
#[must_use]
pub fn normalize_path_str(s: &str) -> String {
    s.nfc().collect()
}

/// Normalize to NFC, borrowing when the input is already NFC.
#[must_use]
pub fn normalize_path_str_cow(s: &str) -> Cow<'_, str> {
    if unicode_normalization::is_nfc(s) {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(normalize_path_str(s))
    }
}

/// Similarity of two relative paths in `0.0..=1.0`.
///
/// Computed as the normalized Levenshtein similarity of the NFC forms, so equal
/// paths score exactly `1.0` and completely different paths of equal length
/// score `0.0`.
#[must_use]
pub fn path_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_path_str_cow(a);
    let b = normalize_path_str_cow(b);
    if a == b {
        return 1.0;
    }
    strsim::normalized_levenshtein(&a, &b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_descendant_cases() {
        let cases = [
            (".", "foo", true),
            ("foo", "foo/bar", true),
            ("foo", "foo/bar/baz", true),
            // a raw prefix check would get these wrong
            ("foo/bar", "foo/bar.zip", false),
            ("foo/bar", "foo/bar-baz", false),
            ("foo/bar", "foo/bar", false),
            ("foo/bar/", "foo/bar", false),
            ("foo/bar/", "foo/bar/x", true),
            ("dir1.zip/dir1", "dir1", false),
            ("dir1", "dir1.zip/dir1", false),
            (".", ".", false),
            ("foo", ".", false),
        ];
        for (ancestor, candidate, expected) in cases {
            assert_eq!(
                is_strict_descendant(ancestor, candidate),
                expected,
                "is_strict_descendant({ancestor:?}, {candidate:?})"
            );
        }
    }

    #[test]
    fn test_descendant_or_equal() {
        assert!(is_descendant_or_equal("foo", "foo"));
        assert!(is_descendant_or_equal(".", "."));
        assert!(is_descendant_or_equal("foo", "foo/bar"));
        assert!(!is_descendant_or_equal("foo/bar", "foo"));
        assert!(!is_descendant_or_equal("foo/bar", "foo/bar.zip"));
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path(".", "x"), "x");
        assert_eq!(join_path("a", "x"), "a/x");
        assert_eq!(join_path("a", ""), "a");
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("a/b/c.zip"), "c.zip");
        assert_eq!(base_name("top"), "top");
        assert_eq!(base_name("."), ".");
        assert_eq!(base_name("a/b/"), "b");
    }

    #[test]
    fn test_normalize_path_str_nfd_to_nfc() {
        let nfd = "cafe\u{0301}.txt";
        assert_eq!(normalize_path_str(nfd), "café.txt");
        assert!(matches!(normalize_path_str_cow("café.txt"), Cow::Borrowed(_)));
        assert!(matches!(normalize_path_str_cow(nfd), Cow::Owned(_)));
    }

    #[test]
    fn test_path_similarity_equal_and_disjoint() {
        assert!((path_similarity("b/2", "b/2") - 1.0).abs() < f64::EPSILON);
        assert!(path_similarity("abc", "xyz").abs() < f64::EPSILON);
    }

    #[test]
    fn test_path_similarity_unicode_forms_match() {
        let nfc = "docs/café.txt";
        let nfd = "docs/cafe\u{0301}.txt";
        assert!((path_similarity(nfc, nfd) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_path_similarity_is_symmetric() {
        let ab = path_similarity("dir2/b.txt", "b.txt");
        let ba = path_similarity("b.txt", "dir2/b.txt");
        assert!((ab - ba).abs() < f64::EPSILON);
        assert!((ab - 0.5).abs() < 1e-9);
    }
}
