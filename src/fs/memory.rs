use super::{FileKind, FileStat, FileSystem};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::io::{self, Cursor, Read};
use std::path::{Component, Path, PathBuf};

/// Upper bound on symlink hops while resolving a path.
const MAX_LINK_HOPS: usize = 40;

/// Size reported for directories, matching a typical block size.
const DIRECTORY_SIZE: u64 = 4096;

/// Timestamps of an in-memory node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileTimes {
    /// Creation time
    pub ctime: f64,
    /// Modification time
    pub mtime: f64,
    /// Access time
    pub atime: f64,
}

impl FileTimes {
    /// All three timestamps set to `secs`.
    #[must_use]
    pub const fn uniform(secs: f64) -> Self {
        Self {
            ctime: secs,
            mtime: secs,
            atime: secs,
        }
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    File(Vec<u8>),
    Directory,
    Symlink(PathBuf),
    Other,
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    times: FileTimes,
}

/// A single-threaded in-memory filesystem.
///
/// Paths are normalized by dropping `.` components, so `./a.txt` and `a.txt`
/// name the same node. The empty path and `/` are the always-present root.
/// Every mutation advances an internal clock by one second; helpers exist to
/// change contents without touching timestamps, to pin timestamps, and to
/// make individual paths fail on stat or read.
#[derive(Debug)]
pub struct MemoryFileSystem {
    nodes: RefCell<BTreeMap<PathBuf, Node>>,
    clock: Cell<f64>,
    unreadable: RefCell<BTreeSet<PathBuf>>,
    unstattable: RefCell<BTreeSet<PathBuf>>,
    opened: RefCell<Vec<PathBuf>>,
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFileSystem {
    /// An empty filesystem whose clock starts at 2023-11-14.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: RefCell::new(BTreeMap::new()),
            clock: Cell::new(1_700_000_000.0),
            unreadable: RefCell::new(BTreeSet::new()),
            unstattable: RefCell::new(BTreeSet::new()),
            opened: RefCell::new(Vec::new()),
        }
    }

    fn tick(&self) -> FileTimes {
        let now = self.clock.get() + 1.0;
        self.clock.set(now);
        FileTimes::uniform(now)
    }

    /// Create `path` and all missing parents as directories.
    pub fn create_dir_all(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        let mut acc = PathBuf::new();
        for component in path.components() {
            acc.push(component);
            if is_root(&acc) {
                continue;
            }
            if !self.nodes.borrow().contains_key(&acc) {
                let times = self.tick();
                self.nodes.borrow_mut().insert(
                    acc.clone(),
                    Node {
                        kind: NodeKind::Directory,
                        times,
                    },
                );
            }
        }
    }

    fn insert(&self, path: &Path, kind: NodeKind) {
        let path = normalize(path);
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent);
        }
        let times = self.tick();
        self.nodes.borrow_mut().insert(path, Node { kind, times });
    }

    /// Create or replace a regular file with fresh timestamps.
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) {
        self.insert(path.as_ref(), NodeKind::File(contents.into()));
    }

    /// Create a symlink at `path` pointing to `target`.
    pub fn add_symlink(&self, path: impl AsRef<Path>, target: impl Into<PathBuf>) {
        self.insert(path.as_ref(), NodeKind::Symlink(target.into()));
    }

    /// Create a node that is neither a file, a directory nor a symlink.
    pub fn add_special(&self, path: impl AsRef<Path>) {
        self.insert(path.as_ref(), NodeKind::Other);
    }

    /// Replace a file's contents while keeping its timestamps.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `path` is not a regular file.
    pub fn set_contents(
        &self,
        path: impl AsRef<Path>,
        contents: impl Into<Vec<u8>>,
    ) -> io::Result<()> {
        let path = normalize(path.as_ref());
        let mut nodes = self.nodes.borrow_mut();
        match nodes.get_mut(&path) {
            Some(Node {
                kind: NodeKind::File(data),
                ..
            }) => {
                *data = contents.into();
                Ok(())
            }
            _ => Err(not_found(&path)),
        }
    }

    /// Pin the timestamps of `path`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing exists at `path`.
    pub fn set_times(&self, path: impl AsRef<Path>, times: FileTimes) -> io::Result<()> {
        let path = normalize(path.as_ref());
        let mut nodes = self.nodes.borrow_mut();
        let node = nodes.get_mut(&path).ok_or_else(|| not_found(&path))?;
        node.times = times;
        Ok(())
    }

    /// Timestamps of `path`, if it exists.
    #[must_use]
    pub fn times(&self, path: impl AsRef<Path>) -> Option<FileTimes> {
        self.nodes
            .borrow()
            .get(&normalize(path.as_ref()))
            .map(|n| n.times)
    }

    /// Contents of the regular file at `path`.
    #[must_use]
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.nodes.borrow().get(&normalize(path.as_ref())) {
            Some(Node {
                kind: NodeKind::File(data),
                ..
            }) => Some(data.clone()),
            _ => None,
        }
    }

    /// Whether anything exists at `path` (symlinks are not followed).
    #[must_use]
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        let path = normalize(path.as_ref());
        is_root(&path) || self.nodes.borrow().contains_key(&path)
    }

    /// Make every future `open` of `path` fail with `PermissionDenied`.
    pub fn fail_reads(&self, path: impl AsRef<Path>) {
        self.unreadable
            .borrow_mut()
            .insert(normalize(path.as_ref()));
    }

    /// Make every future stat of `path` fail with `PermissionDenied`.
    pub fn fail_stat(&self, path: impl AsRef<Path>) {
        self.unstattable
            .borrow_mut()
            .insert(normalize(path.as_ref()));
    }

    /// Every path opened for reading so far, in order.
    #[must_use]
    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.borrow().clone()
    }

    /// Forget the open log.
    pub fn clear_opened(&self) {
        self.opened.borrow_mut().clear();
    }

    /// Resolve every symlink along `path`, including the last component.
    fn resolve(&self, path: &Path) -> io::Result<PathBuf> {
        let mut resolved = PathBuf::new();
        let mut hops = 0;
        for component in normalize(path).components() {
            match component {
                Component::ParentDir => {
                    resolved.pop();
                    continue;
                }
                other => resolved.push(other),
            }
            loop {
                let target = match self.nodes.borrow().get(&resolved) {
                    Some(Node {
                        kind: NodeKind::Symlink(target),
                        ..
                    }) => target.clone(),
                    _ => break,
                };
                hops += 1;
                if hops > MAX_LINK_HOPS {
                    return Err(io::Error::other(format!(
                        "too many levels of symbolic links: {}",
                        path.display()
                    )));
                }
                let base = resolved.parent().map(Path::to_path_buf).unwrap_or_default();
                resolved = resolve_lexically(&base.join(target));
            }
        }
        Ok(resolved)
    }

    /// Resolve only the parent directories of `path`, leaving the last
    /// component untouched.
    fn resolve_parent(&self, path: &Path) -> io::Result<PathBuf> {
        let path = normalize(path);
        match (path.parent(), path.file_name()) {
            (Some(parent), Some(name)) => Ok(self.resolve(parent)?.join(name)),
            _ => Ok(path),
        }
    }

    fn stat_node(&self, original: &Path, resolved: &Path) -> io::Result<FileStat> {
        {
            let unstattable = self.unstattable.borrow();
            if unstattable.contains(&normalize(original)) || unstattable.contains(resolved) {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    format!("stat denied: {}", original.display()),
                ));
            }
        }

        if is_root(resolved) {
            return Ok(FileStat {
                kind: FileKind::Directory,
                size: DIRECTORY_SIZE,
                ctime: 0.0,
                mtime: 0.0,
                atime: 0.0,
            });
        }

        let nodes = self.nodes.borrow();
        let node = nodes.get(resolved).ok_or_else(|| not_found(original))?;
        let (kind, size) = match &node.kind {
            NodeKind::File(data) => (FileKind::File, data.len() as u64),
            NodeKind::Directory => (FileKind::Directory, DIRECTORY_SIZE),
            NodeKind::Symlink(target) => (
                FileKind::Symlink,
                target.as_os_str().len() as u64,
            ),
            NodeKind::Other => (FileKind::Other, 0),
        };
        Ok(FileStat {
            kind,
            size,
            ctime: node.times.ctime,
            mtime: node.times.mtime,
            atime: node.times.atime,
        })
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<OsString>> {
        let dir = self.resolve(dir)?;
        if self.stat_node(&dir, &dir)?.kind != FileKind::Directory {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("not a directory: {}", dir.display()),
            ));
        }

        // BTreeMap iteration keeps the names sorted.
        let names = self
            .nodes
            .borrow()
            .keys()
            .filter(|p| p.parent() == Some(dir.as_path()))
            .filter_map(|p| p.file_name().map(ToOwned::to_owned))
            .collect();
        Ok(names)
    }

    fn symlink_metadata(&self, path: &Path) -> io::Result<FileStat> {
        let resolved = self.resolve_parent(path)?;
        self.stat_node(path, &resolved)
    }

    fn metadata(&self, path: &Path) -> io::Result<FileStat> {
        let resolved = self.resolve(path)?;
        self.stat_node(path, &resolved)
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        let resolved = self.resolve(path)?;
        self.opened.borrow_mut().push(normalize(path));

        {
            let unreadable = self.unreadable.borrow();
            if unreadable.contains(&normalize(path)) || unreadable.contains(&resolved) {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    format!("read denied: {}", path.display()),
                ));
            }
        }

        match self.nodes.borrow().get(&resolved) {
            Some(Node {
                kind: NodeKind::File(data),
                ..
            }) => Ok(Box::new(Cursor::new(data.clone()))),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            )),
            None => Err(not_found(path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let resolved = self.resolve_parent(path)?;
        if let Some(parent) = resolved.parent()
            && !self.exists(parent)
        {
            return Err(not_found(parent));
        }
        let times = self.tick();
        self.nodes.borrow_mut().insert(
            resolved,
            Node {
                kind: NodeKind::File(contents.to_vec()),
                times,
            },
        );
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let from = self.resolve_parent(from)?;
        let to = self.resolve_parent(to)?;
        let mut nodes = self.nodes.borrow_mut();
        let node = nodes.remove(&from).ok_or_else(|| not_found(&from))?;
        nodes.insert(to, node);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let resolved = self.resolve_parent(path)?;
        let mut nodes = self.nodes.borrow_mut();
        match nodes.get(&resolved) {
            Some(Node {
                kind: NodeKind::Directory,
                ..
            }) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {}", path.display()),
            )),
            Some(_) => {
                nodes.remove(&resolved);
                Ok(())
            }
            None => Err(not_found(path)),
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn resolve_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in normalize(path).components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn is_root(path: &Path) -> bool {
    path.as_os_str().is_empty() || path.parent().is_none()
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such file or directory: {}", path.display()),
    )
}
