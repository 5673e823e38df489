//! Read-only hierarchical byte-stream providers.
//!
//! A [`Source`] is what the walker traverses: something that can list a
//! directory and open a file, both addressed by canonical relative path
//! (`"."` for the source root). Three implementations are provided:
//!
//! - [`DiskSource`]: a directory on the local filesystem
//! - [`ZipSource`]: a zip archive held entirely in memory
//! - [`MemorySource`]: an in-memory tree with injectable failures, handy for
//!   exercising the walker's error isolation
//!
//! Archives are never extracted to disk. A nested archive is read into memory
//! and opened as a fresh [`ZipSource`].

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use zip::result::ZipResult;
use zip::ZipArchive;

use super::path_utils::{base_name, join_path, ROOT};

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Dir,
    /// Symlink, device, socket or anything else the walker ignores
    Other,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Basename of the entry
    pub name: String,
    /// What the entry is
    pub kind: EntryKind,
}

impl SourceEntry {
    /// Create a new entry.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Read-only filesystem abstraction walked by [`super::Walker`].
pub trait Source {
    /// Human readable description used in diagnostics.
    fn describe(&self) -> String;

    /// List the entries of the directory at `path`, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the directory cannot be opened or listed.
    fn read_dir(&self, path: &str) -> io::Result<Vec<SourceEntry>>;

    /// Open the file at `path` for reading.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the file cannot be opened.
    fn open(&self, path: &str) -> io::Result<Box<dyn Read + '_>>;
}

/// A directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct DiskSource {
    root: PathBuf,
}

impl DiskSource {
    /// Create a source rooted at `root`.
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// The root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        if path == ROOT || path.is_empty() {
            self.root.clone()
        } else {
            self.root.join(path)
        }
    }
}

impl Source for DiskSource {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn read_dir(&self, path: &str) -> io::Result<Vec<SourceEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.resolve(path))? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let kind = if file_type.is_symlink() {
                EntryKind::Other
            } else if file_type.is_dir() {
                EntryKind::Dir
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                EntryKind::Other
            };
            entries.push(SourceEntry::new(
                entry.file_name().to_string_lossy().into_owned(),
                kind,
            ));
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(fs::File::open(self.resolve(path))?))
    }
}

#[derive(Debug, Clone, Copy)]
enum ZipNode {
    Dir,
    File(usize),
}

/// A zip archive held in memory, presented as a directory tree.
///
/// The listing is synthesized from entry names: parent directories are
/// created implicitly, empty and `.` segments are dropped, and a name that
/// appears both as a directory and as a file is treated as a directory.
pub struct ZipSource {
    label: String,
    archive: Mutex<ZipArchive<Cursor<Vec<u8>>>>,
    dirs: BTreeMap<String, BTreeMap<String, ZipNode>>,
}

impl std::fmt::Debug for ZipSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipSource")
            .field("label", &self.label)
            .field("dirs", &self.dirs.len())
            .finish()
    }
}

impl ZipSource {
    /// Parse an archive from its raw bytes.
    ///
    /// # Errors
    ///
    /// Returns the zip error when the bytes are not a readable archive.
    pub fn from_bytes(label: impl Into<String>, bytes: Vec<u8>) -> ZipResult<Self> {
        let label = label.into();
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut dirs: BTreeMap<String, BTreeMap<String, ZipNode>> = BTreeMap::new();
        dirs.insert(ROOT.to_string(), BTreeMap::new());

        for index in 0..archive.len() {
            let (name, is_dir) = {
                let file = archive.by_index_raw(index)?;
                (file.name().to_string(), file.is_dir())
            };
            let segments: Vec<&str> = name
                .split('/')
                .filter(|s| !s.is_empty() && *s != ".")
                .collect();
            let Some((last, parents)) = segments.split_last() else {
                continue;
            };

            let mut dir = ROOT.to_string();
            for segment in parents {
                let child = join_path(&dir, segment);
                insert_node(&mut dirs, &dir, segment, ZipNode::Dir);
                dirs.entry(child.clone()).or_default();
                dir = child;
            }

            if is_dir {
                insert_node(&mut dirs, &dir, last, ZipNode::Dir);
                dirs.entry(join_path(&dir, last)).or_default();
            } else {
                insert_node(&mut dirs, &dir, last, ZipNode::File(index));
            }
        }

        log::trace!("{}: {} entries, {} directories", label, archive.len(), dirs.len());

        Ok(Self {
            label,
            archive: Mutex::new(archive),
            dirs,
        })
    }

    fn lookup(&self, path: &str) -> Option<ZipNode> {
        let parent = match path.rsplit_once('/') {
            Some((parent, _)) => parent,
            None => ROOT,
        };
        self.dirs.get(parent)?.get(base_name(path)).copied()
    }
}

fn insert_node(
    dirs: &mut BTreeMap<String, BTreeMap<String, ZipNode>>,
    dir: &str,
    name: &str,
    node: ZipNode,
) {
    let children = dirs.entry(dir.to_string()).or_default();
    match (children.get(name), node) {
        (None, _) | (Some(ZipNode::File(_)), ZipNode::Dir) => {
            children.insert(name.to_string(), node);
        }
        (Some(ZipNode::File(_)), ZipNode::File(_)) => {
            log::debug!("Duplicate archive entry {}, keeping the first", join_path(dir, name));
        }
        (Some(ZipNode::Dir), _) => {}
    }
}

impl Source for ZipSource {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn read_dir(&self, path: &str) -> io::Result<Vec<SourceEntry>> {
        let key = if path.is_empty() { ROOT } else { path };
        let children = self.dirs.get(key).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no directory {key} in archive"))
        })?;
        Ok(children
            .iter()
            .map(|(name, node)| {
                let kind = match node {
                    ZipNode::Dir => EntryKind::Dir,
                    ZipNode::File(_) => EntryKind::File,
                };
                SourceEntry::new(name.clone(), kind)
            })
            .collect())
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read + '_>> {
        let Some(ZipNode::File(index)) = self.lookup(path) else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no file {path} in archive"),
            ));
        };
        let mut archive = self
            .archive
            .lock()
            .map_err(|_| io::Error::other("archive lock poisoned"))?;
        let mut file = archive.by_index(index).map_err(io::Error::other)?;
        let mut content = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
        file.read_to_end(&mut content)?;
        Ok(Box::new(Cursor::new(content)))
    }
}

#[derive(Debug, Clone)]
enum MemoryNode {
    Dir,
    File(Vec<u8>),
}

/// An in-memory tree, with optional injected failures.
///
/// Paths are canonical relative paths; parent directories are created
/// implicitly when a file is added.
///
/// ```
/// use dupetree::scanner::source::{MemorySource, Source};
///
/// let source = MemorySource::new()
///     .with_file("a", b"foo")
///     .with_file("dir/b", b"bar");
/// let names: Vec<_> = source.read_dir(".").unwrap().into_iter().map(|e| e.name).collect();
/// assert_eq!(names, ["a", "dir"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    nodes: BTreeMap<String, MemoryNode>,
    list_errors: HashMap<String, io::ErrorKind>,
    open_errors: HashMap<String, io::ErrorKind>,
    read_errors: HashMap<String, io::ErrorKind>,
}

impl MemorySource {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, creating its parent directories.
    #[must_use]
    pub fn with_file(mut self, path: &str, content: &[u8]) -> Self {
        self.add_parents(path);
        self.nodes
            .insert(path.to_string(), MemoryNode::File(content.to_vec()));
        self
    }

    /// Add an empty directory, creating its parents.
    #[must_use]
    pub fn with_dir(mut self, path: &str) -> Self {
        self.add_parents(path);
        self.nodes.insert(path.to_string(), MemoryNode::Dir);
        self
    }

    /// Make listing the directory at `path` fail.
    #[must_use]
    pub fn fail_list(mut self, path: &str, kind: io::ErrorKind) -> Self {
        self.list_errors.insert(path.to_string(), kind);
        self
    }

    /// Make opening the file at `path` fail.
    #[must_use]
    pub fn fail_open(mut self, path: &str, kind: io::ErrorKind) -> Self {
        self.open_errors.insert(path.to_string(), kind);
        self
    }

    /// Make reading the file at `path` fail after it was opened.
    #[must_use]
    pub fn fail_read(mut self, path: &str, kind: io::ErrorKind) -> Self {
        self.read_errors.insert(path.to_string(), kind);
        self
    }

    fn add_parents(&mut self, path: &str) {
        let mut parent = path;
        while let Some((p, _)) = parent.rsplit_once('/') {
            self.nodes.entry(p.to_string()).or_insert(MemoryNode::Dir);
            parent = p;
        }
    }

    fn parent_of(path: &str) -> &str {
        path.rsplit_once('/').map_or(ROOT, |(parent, _)| parent)
    }
}

struct FailingRead(io::ErrorKind);

impl Read for FailingRead {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(self.0, "injected read failure"))
    }
}

impl Source for MemorySource {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn read_dir(&self, path: &str) -> io::Result<Vec<SourceEntry>> {
        let key = if path.is_empty() { ROOT } else { path };
        if let Some(kind) = self.list_errors.get(key) {
            return Err(io::Error::new(*kind, "injected list failure"));
        }
        if key != ROOT && !matches!(self.nodes.get(key), Some(MemoryNode::Dir)) {
            return Err(io::Error::new(io::ErrorKind::NotFound, key.to_string()));
        }
        Ok(self
            .nodes
            .iter()
            .filter(|(p, _)| Self::parent_of(p) == key)
            .map(|(p, node)| {
                let kind = match node {
                    MemoryNode::Dir => EntryKind::Dir,
                    MemoryNode::File(_) => EntryKind::File,
                };
                SourceEntry::new(base_name(p), kind)
            })
            .collect())
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read + '_>> {
        if let Some(kind) = self.open_errors.get(path) {
            return Err(io::Error::new(*kind, "injected open failure"));
        }
        if let Some(kind) = self.read_errors.get(path) {
            return Ok(Box::new(FailingRead(*kind)));
        }
        match self.nodes.get(path) {
            Some(MemoryNode::File(content)) => Ok(Box::new(content.as_slice())),
            _ => Err(io::Error::new(io::ErrorKind::NotFound, path.to_string())),
        }
    }
}
