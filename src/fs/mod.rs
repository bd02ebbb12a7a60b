//! Filesystem provider used by the walker, the snapshot builder and the
//! manifest store.
//!
//! Everything above this module talks to disk through [`FileSystem`], so the
//! reconciliation logic can be exercised against [`MemoryFileSystem`] without
//! touching real files.

/// In-memory filesystem for tests.
pub mod memory;

pub use memory::{FileTimes, MemoryFileSystem};

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Type of a filesystem object as reported by stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link (only reported by [`FileSystem::symlink_metadata`])
    Symlink,
    /// Device node, socket, fifo, ...
    Other,
}

/// The subset of stat results filecheck records.
///
/// Timestamps are seconds since the Unix epoch with sub-second precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileStat {
    /// Object type
    pub kind: FileKind,
    /// Size in bytes
    pub size: u64,
    /// Creation time where the platform reports one, otherwise inode change time
    pub ctime: f64,
    /// Modification time
    pub mtime: f64,
    /// Access time
    pub atime: f64,
}

/// Narrow filesystem interface the engine depends on.
pub trait FileSystem {
    /// Names of the direct children of `dir`, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` cannot be listed.
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<OsString>>;

    /// Stat `path` without following a final symlink.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` cannot be stat'ed.
    fn symlink_metadata(&self, path: &Path) -> io::Result<FileStat>;

    /// Stat `path`, following symlinks.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` or a link target cannot be stat'ed.
    fn metadata(&self, path: &Path) -> io::Result<FileStat>;

    /// Open `path` for streamed reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + '_>>;

    /// Read the whole of `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.open(path)?.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Create or truncate `path` and write `contents` to it durably.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Atomically replace `to` with `from`.
    ///
    /// # Errors
    ///
    /// Returns an error if the rename fails.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Remove the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be removed.
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<OsString>> {
        let mut names = std::fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect::<io::Result<Vec<_>>>()?;
        names.sort();
        Ok(names)
    }

    fn symlink_metadata(&self, path: &Path) -> io::Result<FileStat> {
        std::fs::symlink_metadata(path).map(|m| FileStat::from(&m))
    }

    fn metadata(&self, path: &Path) -> io::Result<FileStat> {
        std::fs::metadata(path).map(|m| FileStat::from(&m))
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(File::open(path)?))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(contents)?;
        file.sync_all()
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

impl From<&std::fs::Metadata> for FileStat {
    fn from(meta: &std::fs::Metadata) -> Self {
        let file_type = meta.file_type();
        let kind = if file_type.is_symlink() {
            FileKind::Symlink
        } else if file_type.is_dir() {
            FileKind::Directory
        } else if file_type.is_file() {
            FileKind::File
        } else {
            FileKind::Other
        };

        Self {
            kind,
            size: meta.len(),
            ctime: creation_time(meta),
            mtime: meta.modified().map(epoch_seconds).unwrap_or_default(),
            atime: meta.accessed().map(epoch_seconds).unwrap_or_default(),
        }
    }
}

/// Seconds since the epoch, negative for times before it.
fn epoch_seconds(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    }
}

/// Birth time when the platform has one, otherwise the inode change time.
#[cfg(unix)]
fn creation_time(meta: &std::fs::Metadata) -> f64 {
    use std::os::unix::fs::MetadataExt;

    meta.created().map(epoch_seconds).unwrap_or_else(|_| {
        meta.ctime() as f64 + meta.ctime_nsec() as f64 / 1_000_000_000.0
    })
}

#[cfg(not(unix))]
fn creation_time(meta: &std::fs::Metadata) -> f64 {
    meta.created()
        .or_else(|_| meta.modified())
        .map(epoch_seconds)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn test_os_read_dir_is_sorted() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join("b.txt"), "b")?;
        std::fs::write(dir.path().join("a.txt"), "a")?;
        std::fs::create_dir(dir.path().join("c"))?;

        let names = OsFileSystem.read_dir(dir.path())?;
        assert_eq!(names, vec!["a.txt", "b.txt", "c"]);
        Ok(())
    }

    #[test]
    fn test_os_stat_kinds() -> Result<()> {
        let dir = tempdir()?;
        let file = dir.path().join("file.txt");
        std::fs::write(&file, "hello")?;

        let stat = OsFileSystem.metadata(&file)?;
        assert_eq!(stat.kind, FileKind::File);
        assert_eq!(stat.size, 5);
        assert!(stat.mtime > 0.0);

        let stat = OsFileSystem.metadata(dir.path())?;
        assert_eq!(stat.kind, FileKind::Directory);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_os_symlink_metadata_does_not_follow() -> Result<()> {
        let dir = tempdir()?;
        let target = dir.path().join("target.txt");
        let link = dir.path().join("link");
        std::fs::write(&target, "x")?;
        std::os::unix::fs::symlink(&target, &link)?;

        assert_eq!(OsFileSystem.symlink_metadata(&link)?.kind, FileKind::Symlink);
        assert_eq!(OsFileSystem.metadata(&link)?.kind, FileKind::File);
        Ok(())
    }

    #[test]
    fn test_os_write_and_rename_replace_target() -> Result<()> {
        let dir = tempdir()?;
        let tmp = dir.path().join("tmp");
        let dst = dir.path().join("dst");
        std::fs::write(&dst, "old")?;

        OsFileSystem.write(&tmp, b"new")?;
        OsFileSystem.rename(&tmp, &dst)?;

        assert_eq!(std::fs::read(&dst)?, b"new");
        assert!(!tmp.exists());
        Ok(())
    }
}
