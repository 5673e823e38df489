use dupetree::duplicates::{detect, PairSim, Similarity};
use dupetree::scanner::{DiskSource, Fingerprinter, Source, Walker, WalkerConfig, ZipSource};
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use tempfile::tempdir;
use zip::write::SimpleFileOptions;

fn make_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(body).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn write(root: &Path, rel: &str, data: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, data).unwrap();
}

/// `dir1/dir2` on disk and `dir2.zip/dir2` in an archive hold the same files.
fn nested_fixture(root: &Path) {
    write(root, "dir1/a", b"a\n");
    write(root, "dir1/foo", b"foo\n");
    write(root, "dir1/dir2/b.txt", b"b\n");
    write(root, "dir1/dir2/dir3/c.txt", b"c\n");
    write(root, "dir1/dir2/dir4/d.txt", b"d\n");
    let zip = make_zip(&[
        ("dir2/b.txt", b"b\n"),
        ("dir2/dir3/c.txt", b"c\n"),
        ("dir2/dir4/d.txt", b"d\n"),
        ("__MACOSX/dir2/._b.txt", b"resource fork"),
    ]);
    write(root, "dir2.zip", &zip);
}

#[test]
fn test_zip_on_disk_is_indexed_like_a_directory() {
    let dir = tempdir().unwrap();
    nested_fixture(dir.path());

    let walk = Walker::new(WalkerConfig::default())
        .walk(&DiskSource::new(dir.path()), &Fingerprinter::default())
        .unwrap();

    let keys: Vec<&str> = walk.index.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec![
            ".",
            "dir1",
            "dir1/dir2",
            "dir1/dir2/dir3",
            "dir1/dir2/dir4",
            "dir2.zip",
            "dir2.zip/dir2",
            "dir2.zip/dir2/dir3",
            "dir2.zip/dir2/dir4",
        ]
    );
    assert_eq!(walk.stats.archives, 1);
    assert_eq!(walk.index["dir1/dir2"].files, walk.index["dir2.zip/dir2"].files);
}

#[test]
fn test_archived_copy_is_reported_once() {
    let dir = tempdir().unwrap();
    nested_fixture(dir.path());

    let walk = Walker::new(WalkerConfig::default())
        .walk(&DiskSource::new(dir.path()), &Fingerprinter::default())
        .unwrap();
    let pairs = detect(&walk.index);

    let identical = Similarity {
        bytes_same: 6,
        bytes_diff: 0,
        path_similarity: 1.0,
    };
    assert_eq!(pairs, vec![PairSim::new("dir1/dir2", "dir2.zip/dir2", identical)]);
}

#[test]
fn test_archive_extension_is_configurable() {
    let dir = tempdir().unwrap();
    write(dir.path(), "lib.jar", &make_zip(&[("x.class", b"x")]));
    write(dir.path(), "plain.zip", &make_zip(&[("y", b"y")]));

    let config = WalkerConfig {
        archive_extensions: vec!["jar".into()],
        ..WalkerConfig::default()
    };
    let walk = Walker::new(config)
        .walk(&DiskSource::new(dir.path()), &Fingerprinter::default())
        .unwrap();

    let keys: Vec<&str> = walk.index.keys().map(String::as_str).collect();
    assert_eq!(keys, vec![".", "lib.jar"]);
    // the zip is fingerprinted as a plain file
    assert_eq!(walk.root.files.len(), 1);
    assert_eq!(walk.root.files[0].path, "plain.zip");
}

#[test]
fn test_zip_source_lists_implicit_directories() {
    let bytes = make_zip(&[("a/b/c.txt", b"c"), ("d.txt", b"d"), ("a/e.txt", b"e")]);
    let source = ZipSource::from_bytes("mem.zip", bytes).unwrap();

    let root: Vec<String> = source.read_dir(".").unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(root, vec!["a", "d.txt"]);

    let a: Vec<String> = source.read_dir("a").unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(a, vec!["b", "e.txt"]);

    let mut content = String::new();
    source
        .open("a/b/c.txt")
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "c");
}

#[test]
fn test_truncated_zip_on_disk_is_skipped() {
    let dir = tempdir().unwrap();
    let mut zip = make_zip(&[("inside", b"data")]);
    zip.truncate(zip.len() / 2);
    write(dir.path(), "broken.zip", &zip);
    write(dir.path(), "ok/file", b"fine");

    let walk = Walker::new(WalkerConfig::default())
        .walk(&DiskSource::new(dir.path()), &Fingerprinter::default())
        .unwrap();

    let keys: Vec<&str> = walk.index.keys().map(String::as_str).collect();
    assert_eq!(keys, vec![".", "ok"]);
    assert_eq!(walk.stats.skipped_subtrees, 1);
}
