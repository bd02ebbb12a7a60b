use super::IgnoreSet;
use crate::error::WalkError;
use crate::fs::{FileKind, FileSystem};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Traversal policy for one walk.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Descend into subdirectories
    pub recursive: bool,
    /// Treat symlinks as their targets instead of skipping them
    pub follow_symlinks: bool,
    /// Base names to skip
    pub ignore: IgnoreSet,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            follow_symlinks: false,
            ignore: IgnoreSet::default(),
        }
    }
}

/// A file or directory the walker emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Full path (parent directory joined with `name`)
    pub path: PathBuf,
    /// Base name, the entry's key in its directory's snapshot
    pub name: String,
    /// Either [`FileKind::File`] or [`FileKind::Directory`]; for followed
    /// symlinks this is the target's kind
    pub kind: FileKind,
}

/// One step of a depth-first walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEvent {
    /// Start of a directory's children
    EnterDir(PathBuf),
    /// A child of the innermost entered directory
    Entry(WalkEntry),
    /// End of a directory's children
    LeaveDir(PathBuf),
}

/// Directory whose children are being emitted.
struct Frame {
    dir: PathBuf,
    children: std::vec::IntoIter<OsString>,
}

/// Lazy depth-first walk over one root.
///
/// The root is always entered. A subdirectory is emitted as an entry of its
/// parent first; with `recursive` set, its own `EnterDir` .. `LeaveDir` block
/// follows immediately. A directory that cannot be listed yields an `Err`;
/// a child that cannot be stat'ed, or whose name is not UTF-8 or holds a
/// line break, is logged and skipped.
///
/// There is no cycle detection: following symlinks recursively through a
/// link that points at one of its ancestors does not terminate.
pub struct Walk<'a, F: FileSystem + ?Sized> {
    fs: &'a F,
    options: &'a WalkOptions,
    /// Directory to enter on the next call
    pending: Option<PathBuf>,
    stack: Vec<Frame>,
}

impl<'a, F: FileSystem + ?Sized> Walk<'a, F> {
    /// Start a walk at `root`.
    pub fn new(fs: &'a F, root: &Path, options: &'a WalkOptions) -> Self {
        Self {
            fs,
            options,
            pending: Some(root.to_path_buf()),
            stack: Vec::new(),
        }
    }

    fn enter(&mut self, dir: PathBuf) -> Result<WalkEvent, WalkError> {
        let children = self
            .fs
            .read_dir(&dir)
            .map_err(|source| WalkError::ListDir {
                path: dir.clone(),
                source,
            })?;
        self.stack.push(Frame {
            dir: dir.clone(),
            children: children.into_iter(),
        });
        Ok(WalkEvent::EnterDir(dir))
    }

    /// Decide whether a child is emitted, and as what.
    fn classify(&self, path: PathBuf, name: OsString) -> Option<WalkEntry> {
        let Ok(name) = name.into_string() else {
            warn!("skipping {}: name is not valid UTF-8", path.display());
            return None;
        };

        if self.options.ignore.is_match(&name) {
            debug!("ignoring {}", path.display());
            return None;
        }

        // Manifest entries are line based.
        if name.contains(['\r', '\n']) {
            warn!("skipping {path:?}: name contains a line break");
            return None;
        }

        let stat = match self.fs.symlink_metadata(&path) {
            Ok(stat) => stat,
            Err(e) => {
                warn!("cannot stat {}: {e}", path.display());
                return None;
            }
        };

        let kind = if stat.kind == FileKind::Symlink {
            if !self.options.follow_symlinks {
                debug!("skipping symlink {}", path.display());
                return None;
            }
            match self.fs.metadata(&path) {
                Ok(target) => target.kind,
                Err(e) => {
                    warn!("cannot stat {}: {e}", path.display());
                    return None;
                }
            }
        } else {
            stat.kind
        };

        match kind {
            FileKind::File | FileKind::Directory => Some(WalkEntry { path, name, kind }),
            FileKind::Symlink | FileKind::Other => {
                warn!("Skipping {}", path.display());
                None
            }
        }
    }
}

impl<F: FileSystem + ?Sized> Iterator for Walk<'_, F> {
    type Item = Result<WalkEvent, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(dir) = self.pending.take() {
            return Some(self.enter(dir));
        }

        loop {
            let frame = self.stack.last_mut()?;
            let Some(name) = frame.children.next() else {
                let frame = self.stack.pop()?;
                return Some(Ok(WalkEvent::LeaveDir(frame.dir)));
            };
            let path = frame.dir.join(&name);

            if let Some(entry) = self.classify(path, name) {
                if entry.kind == FileKind::Directory && self.options.recursive {
                    self.pending = Some(entry.path.clone());
                }
                return Some(Ok(WalkEvent::Entry(entry)));
            }
        }
    }
}
