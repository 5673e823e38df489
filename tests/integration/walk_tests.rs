use dupetree::scanner::{
    DigestAlgorithm, DirectoryFingerprint, DiskSource, FileFingerprint, Fingerprinter, Walk,
    WalkError, Walker, WalkerConfig,
};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn sha(data: &[u8]) -> [u8; 32] {
    Fingerprinter::default().digest_bytes(data)
}

fn fp(name: &str, data: &[u8]) -> FileFingerprint {
    FileFingerprint::new(name, data.len() as u64, sha(data))
}

fn write(root: &Path, rel: &str, data: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, data).unwrap();
}

fn walk_disk(root: &Path) -> Result<Walk, WalkError> {
    Walker::new(WalkerConfig::default()).walk(&DiskSource::new(root), &Fingerprinter::default())
}

fn keys(walk: &Walk) -> Vec<&str> {
    walk.index.keys().map(String::as_str).collect()
}

#[test]
fn test_walk_builds_tree_in_name_order() {
    let dir = tempdir().unwrap();
    write(dir.path(), "somefile", b"foo");
    write(dir.path(), "bar/somefile", b"foo");
    write(dir.path(), "bar/__MACOSX/somefile", b"ignore this entry");
    write(dir.path(), "foo/somefile", b"foo");
    write(dir.path(), "foo/bar/somefile", b"bar");
    write(dir.path(), "foo/bar/foobar.png.txt", b"foobar");
    write(dir.path(), "foo/bar/__MACOSX/another", b"ignore this entry as well");
    write(dir.path(), "__MACOSX/somefile", b"");

    let walk = walk_disk(dir.path()).unwrap();

    let expected = DirectoryFingerprint::new(".")
        .with_file(fp("somefile", b"foo"))
        .with_dir(DirectoryFingerprint::new("bar").with_file(fp("somefile", b"foo")))
        .with_dir(
            DirectoryFingerprint::new("foo")
                .with_file(fp("somefile", b"foo"))
                .with_dir(
                    DirectoryFingerprint::new("bar")
                        .with_file(fp("foobar.png.txt", b"foobar"))
                        .with_file(fp("somefile", b"bar")),
                ),
        );
    assert_eq!(*walk.root, expected);
    assert_eq!(keys(&walk), vec![".", "bar", "foo", "foo/bar"]);
    assert_eq!(walk.stats.files, 5);
    assert_eq!(walk.stats.directories, 4);
    assert_eq!(walk.stats.bytes, 3 + 3 + 3 + 3 + 6);
}

#[test]
fn test_empty_directories_are_indexed() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("a/b")).unwrap();

    let walk = walk_disk(dir.path()).unwrap();
    assert_eq!(keys(&walk), vec![".", "a", "a/b"]);
    assert_eq!(walk.root.total_files(), 0);
}

#[test]
fn test_missing_root_is_fatal() {
    let dir = tempdir().unwrap();
    let result = walk_disk(&dir.path().join("nope"));
    assert!(matches!(result, Err(WalkError::Root { .. })));
}

#[test]
fn test_blake3_changes_digests_not_structure() {
    let dir = tempdir().unwrap();
    write(dir.path(), "x/a", b"foo");

    let sha_walk = walk_disk(dir.path()).unwrap();
    let blake_walk = Walker::new(WalkerConfig::default())
        .walk(
            &DiskSource::new(dir.path()),
            &Fingerprinter::new(DigestAlgorithm::Blake3),
        )
        .unwrap();

    assert_eq!(keys(&sha_walk), keys(&blake_walk));
    let sha_file = &sha_walk.index["x"].files[0];
    let blake_file = &blake_walk.index["x"].files[0];
    assert_eq!(sha_file.size, blake_file.size);
    assert_ne!(sha_file.digest, blake_file.digest);
    assert_eq!(
        sha_file.digest_hex(),
        "2c26b46b68ffc68ff99b453c1d30413413422d706483bfa0f98a5e886266e7ae"
    );
}

#[test]
fn test_ignore_patterns_match_canonical_paths() {
    let dir = tempdir().unwrap();
    write(dir.path(), "keep/a", b"a");
    write(dir.path(), "keep/cache/b", b"b");
    write(dir.path(), "node_modules/c", b"c");

    let config = WalkerConfig {
        ignore_patterns: vec!["node_modules/".into(), "keep/cache".into()],
        ..WalkerConfig::default()
    };
    let walk = Walker::new(config)
        .walk(&DiskSource::new(dir.path()), &Fingerprinter::default())
        .unwrap();
    assert_eq!(keys(&walk), vec![".", "keep"]);
    assert_eq!(walk.stats.files, 1);
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_not_followed() {
    let dir = tempdir().unwrap();
    write(dir.path(), "real/a", b"foo");
    std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("link")).unwrap();
    std::os::unix::fs::symlink(dir.path().join("real/a"), dir.path().join("file-link")).unwrap();

    let walk = walk_disk(dir.path()).unwrap();
    assert_eq!(keys(&walk), vec![".", "real"]);
    assert!(walk.root.files.is_empty());
}

#[cfg(unix)]
#[test]
fn test_unreadable_subdirectory_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    write(dir.path(), "ok/a", b"foo");
    write(dir.path(), "locked/b", b"bar");
    let locked = dir.path().join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // privileged users can still list it
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let walk = walk_disk(dir.path()).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(keys(&walk), vec![".", "ok"]);
    assert_eq!(walk.stats.skipped_subtrees, 1);
}
