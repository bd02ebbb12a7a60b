/// Manifest file format and persistence
pub mod manifest;

use crate::fs::{FileKind, FileSystem};
use crate::scanner::IgnoreSet;
use crate::utils::hash;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

/// Content hash of an entry, or the reason there is none.
///
/// On disk these are the hex digest, `<DIR>`, the empty string and `error`.
/// Keeping them as variants means a sentinel can never be mistaken for a
/// digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashState {
    /// Hex digest of the file contents
    Computed(String),
    /// The entry is a directory; directories are not hashed
    Directory,
    /// Not computed yet
    Pending,
    /// Hashing failed (unreadable file)
    Failed,
}

impl HashState {
    /// Manifest field for directories.
    pub const DIRECTORY_FIELD: &'static str = "<DIR>";
    /// Manifest field for a failed hash.
    pub const FAILED_FIELD: &'static str = "error";

    /// Decode a manifest hash field.
    #[must_use]
    pub fn from_field(field: &str) -> Self {
        match field {
            "" => Self::Pending,
            Self::DIRECTORY_FIELD => Self::Directory,
            Self::FAILED_FIELD => Self::Failed,
            hex => Self::Computed(hex.to_string()),
        }
    }

    /// Encode as a manifest hash field.
    #[must_use]
    pub fn as_field(&self) -> &str {
        match self {
            Self::Computed(hex) => hex,
            Self::Directory => Self::DIRECTORY_FIELD,
            Self::Pending => "",
            Self::Failed => Self::FAILED_FIELD,
        }
    }

    /// Whether two hashes describe the same content.
    ///
    /// Digests compare case-insensitively. `Failed` matches nothing, not even
    /// another `Failed`: content that could not be read cannot be vouched for.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Computed(a), Self::Computed(b)) => a.eq_ignore_ascii_case(b),
            (Self::Directory, Self::Directory) | (Self::Pending, Self::Pending) => true,
            _ => false,
        }
    }

    /// Whether the hash still has to be computed.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether this is the directory marker.
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        matches!(self, Self::Directory)
    }
}

impl fmt::Display for HashState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_field())
    }
}

/// Timestamp truncated toward zero to whole seconds.
///
/// Every timestamp comparison goes through this so sub-second jitter between
/// filesystems never counts as a change.
#[must_use]
pub fn whole_seconds(secs: f64) -> i64 {
    secs.trunc() as i64
}

/// One recorded file or directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Base name; the key within its snapshot
    pub file_name: String,
    /// Directory holding the entry (not persisted per entry)
    pub dir_name: PathBuf,
    /// Content hash state
    pub hash: HashState,
    /// Size in bytes
    pub size: u64,
    /// Creation (or inode change) time in seconds
    pub ctime: f64,
    /// Modification time in seconds
    pub mtime: f64,
    /// Access time in seconds
    pub atime: f64,
}

impl Entry {
    /// Full path of the entry.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir_name.join(&self.file_name)
    }

    /// Whether the entry records a directory.
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        self.hash.is_directory()
    }
}

/// Entries of exactly one directory level, keyed by base name.
///
/// Iteration is ordered by name, which is also the walker's visiting order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    dir: PathBuf,
    entries: BTreeMap<String, Entry>,
}

impl Snapshot {
    /// An empty snapshot for `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            entries: BTreeMap::new(),
        }
    }

    /// The directory this snapshot describes.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Insert `entry`, replacing any entry with the same name.
    pub fn insert(&mut self, entry: Entry) -> Option<Entry> {
        self.entries.insert(entry.file_name.clone(), entry)
    }

    /// Look up an entry by base name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// Remove and return an entry by base name.
    pub fn remove(&mut self, name: &str) -> Option<Entry> {
        self.entries.remove(name)
    }

    /// Whether an entry named `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in name order.
    pub fn iter(&self) -> btree_map::Values<'_, String, Entry> {
        self.entries.values()
    }

    /// Drop entries whose names match `ignore`.
    pub fn remove_ignored(&mut self, ignore: &IgnoreSet) {
        self.entries.retain(|name, _| !ignore.is_match(name));
    }
}

impl IntoIterator for Snapshot {
    type Item = Entry;
    type IntoIter = btree_map::IntoValues<String, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Entry;
    type IntoIter = btree_map::Values<'a, String, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

/// Build the entry for `path`.
///
/// Directories always get [`HashState::Directory`]. Files are hashed when
/// `compute_hash` is set and left [`HashState::Pending`] otherwise; a hashing
/// failure is recorded as [`HashState::Failed`] rather than returned.
///
/// # Errors
///
/// Returns an error if `path` cannot be stat'ed or has no UTF-8 base name.
pub fn build_entry<F: FileSystem + ?Sized>(fs: &F, path: &Path, compute_hash: bool) -> Result<Entry> {
    let stat = fs
        .metadata(path)
        .with_context(|| format!("Error getting file info for {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(OsStr::to_str)
        .with_context(|| format!("No UTF-8 file name in {}", path.display()))?
        .to_string();

    let hash = if stat.kind == FileKind::Directory {
        HashState::Directory
    } else if compute_hash {
        hash::hash_file(fs, path)
    } else {
        HashState::Pending
    };

    Ok(Entry {
        file_name,
        dir_name: path.parent().map(Path::to_path_buf).unwrap_or_default(),
        hash,
        size: stat.size,
        ctime: stat.ctime,
        mtime: stat.mtime,
        atime: stat.atime,
    })
}
