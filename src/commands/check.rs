use super::{announce, load_baseline, stat_entry};
use crate::FilecheckContext;
use crate::config::CheckOptions;
use crate::fs::FileSystem;
use crate::scanner::{self, DirectoryVisitor, IgnoreSet, WalkEntry, WalkOptions};
use crate::storage::Snapshot;
use crate::tracking::{Status, reconcile};
use crate::utils::hash;
use anyhow::Result;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// What a check run found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckSummary {
    /// Directories visited
    pub directories: usize,
    /// Entries compared against a baseline
    pub entries: usize,
    /// Files whose content had to be hashed
    pub hashed: usize,
    /// Report lines other than `same file`
    pub differences: usize,
    /// Directories skipped because their manifest is corrupt
    pub corrupt_manifests: usize,
    /// Entries skipped because they could not be stat'ed
    pub stat_failures: usize,
}

impl CheckSummary {
    /// Whether every compared entry matched its baseline.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.differences == 0 && self.corrupt_manifests == 0
    }
}

struct Checker<'a, F: FileSystem + ?Sized> {
    fs: &'a F,
    verbose: bool,
    ignore: &'a IgnoreSet,
    options: CheckOptions,
    out: &'a mut dyn Write,
    summary: CheckSummary,
}

impl<F: FileSystem + ?Sized> DirectoryVisitor for Checker<'_, F> {
    type Frame = Snapshot;

    fn enter(&mut self, dir: &Path) -> Result<Snapshot> {
        announce(&mut *self.out, self.verbose, dir)?;
        self.summary.directories += 1;
        Ok(Snapshot::new(dir))
    }

    fn visit(&mut self, frame: &mut Snapshot, entry: &WalkEntry) -> Result<()> {
        match stat_entry(self.fs, &entry.path, false) {
            Some(record) => {
                frame.insert(record);
            }
            None => self.summary.stat_failures += 1,
        }
        Ok(())
    }

    /// The baseline is read once the whole directory has been stat'ed, so
    /// the report for a directory follows the reports of its subdirectories.
    fn leave(&mut self, dir: &Path, current: Snapshot) -> Result<()> {
        let Some(baseline) = load_baseline(self.fs, dir, self.ignore)? else {
            self.summary.corrupt_manifests += 1;
            return Ok(());
        };

        let fs = self.fs;
        let mut hashed = 0;
        let report = reconcile(&current, &baseline, &self.options, |entry| {
            hashed += 1;
            hash::hash_file(fs, &entry.path())
        });
        debug!("{}: {} entries, {hashed} hashed", dir.display(), current.len());

        self.summary.entries += current.len();
        self.summary.hashed += hashed;
        for line in &report {
            if line.status != Status::SameFile {
                self.summary.differences += 1;
            }
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }
}

/// Compare the tree under `dir` with its manifests and print the
/// differences.
///
/// Prints `CHECK: <dir>` first, then one `<status>: <path>` line per
/// difference. Nothing is written to disk. A directory with a corrupt
/// manifest is reported and skipped.
///
/// # Errors
///
/// Returns an error if a directory cannot be listed, a manifest cannot be
/// read, or the run is interrupted.
pub fn execute<F: FileSystem + ?Sized>(
    ctx: &FilecheckContext,
    fs: &F,
    dir: &Path,
    walk: &WalkOptions,
    options: &CheckOptions,
    out: &mut dyn Write,
) -> Result<CheckSummary> {
    writeln!(out, "CHECK: {}", dir.display())?;

    let mut checker = Checker {
        fs,
        verbose: ctx.verbose,
        ignore: &walk.ignore,
        options: *options,
        out,
        summary: CheckSummary::default(),
    };
    scanner::drive(fs, dir, walk, ctx.interrupt(), &mut checker)?;

    Ok(checker.summary)
}
