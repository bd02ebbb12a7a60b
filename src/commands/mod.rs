//! The three filecheck operations.
//!
//! Each command is a [`DirectoryVisitor`](crate::scanner::DirectoryVisitor)
//! driven over the walk, writing its report to the `out` writer it is given
//! and returning a summary of what it did.

/// Compare the tree with its manifests.
pub mod check;
/// Write fresh manifests.
pub mod generate;
/// Refresh manifests, re-hashing only what changed.
pub mod update;

use crate::error::ManifestError;
use crate::fs::FileSystem;
use crate::output;
use crate::scanner::IgnoreSet;
use crate::storage::{Entry, Snapshot, build_entry, manifest};
use anyhow::Result;
use std::io::Write;
use std::path::Path;

/// Build the entry for `path`, reporting a stat failure instead of
/// returning it.
fn stat_entry<F: FileSystem + ?Sized>(fs: &F, path: &Path, compute_hash: bool) -> Option<Entry> {
    match build_entry(fs, path, compute_hash) {
        Ok(entry) => Some(entry),
        Err(e) => {
            output::error(&format!("{e:#}"));
            None
        }
    }
}

/// Load the baseline of `dir` with ignored names removed.
///
/// A corrupt manifest is reported and yields `Ok(None)`, so the caller can
/// skip this one directory; any other failure is returned.
fn load_baseline<F: FileSystem + ?Sized>(
    fs: &F,
    dir: &Path,
    ignore: &IgnoreSet,
) -> Result<Option<Snapshot>> {
    match manifest::load(fs, dir) {
        Ok(mut baseline) => {
            baseline.remove_ignored(ignore);
            Ok(Some(baseline))
        }
        Err(e @ ManifestError::Corrupt { .. }) => {
            output::error(&e.to_string());
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Print the directory name when running verbosely.
fn announce(out: &mut dyn Write, verbose: bool, dir: &Path) -> Result<()> {
    if verbose {
        writeln!(out, "{}", dir.display())?;
    }
    Ok(())
}
