#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch directory tree plus a `filecheck` command that runs inside it.
///
/// `HOME` points into the fixture so a developer's own configuration file
/// never leaks into a test.
pub struct TestTree {
    pub temp_dir: TempDir,
    home: PathBuf,
    root: PathBuf,
}

impl TestTree {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let home = temp_dir.path().join("home");
        let root = temp_dir.path().join("tree");
        fs::create_dir_all(&home)?;
        fs::create_dir_all(&root)?;
        Ok(Self {
            temp_dir,
            home,
            root,
        })
    }

    /// The directory the command runs in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of `rel` inside the tree.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Write a file, creating parent directories.
    pub fn write(&self, rel: &str, contents: impl AsRef<[u8]>) -> Result<PathBuf> {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Raw bytes of the manifest in `rel_dir` ("." for the root).
    pub fn manifest(&self, rel_dir: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.path(rel_dir).join(".filecheck"))?)
    }

    /// `filecheck <args>` run from the tree root.
    pub fn cmd(&self, args: &[&str]) -> Result<Command> {
        let mut cmd = Command::cargo_bin("filecheck")?;
        cmd.current_dir(&self.root)
            .env("HOME", &self.home)
            .env_remove("FILECHECK_CONFIG")
            .env_remove("FILECHECK_LOG")
            .env("NO_COLOR", "1")
            .args(args);
        Ok(cmd)
    }
}
