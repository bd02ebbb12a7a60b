use super::{announce, stat_entry};
use crate::FilecheckContext;
use crate::fs::FileSystem;
use crate::scanner::{self, DirectoryVisitor, WalkEntry, WalkOptions};
use crate::storage::manifest::{self, SaveOutcome};
use crate::storage::{HashState, Snapshot};
use anyhow::Result;
use std::io::Write;
use std::path::Path;

/// What a generate run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateSummary {
    /// Directories visited
    pub directories: usize,
    /// Entries recorded
    pub entries: usize,
    /// Files whose content was hashed
    pub hashed: usize,
    /// Files recorded with a failed hash
    pub hash_failures: usize,
    /// Entries skipped because they could not be stat'ed
    pub stat_failures: usize,
    /// Manifests written
    pub manifests_written: usize,
    /// Manifests removed because their directory had nothing to record
    pub manifests_removed: usize,
}

struct Generator<'a, F: FileSystem + ?Sized> {
    fs: &'a F,
    verbose: bool,
    out: &'a mut dyn Write,
    summary: GenerateSummary,
}

impl<F: FileSystem + ?Sized> DirectoryVisitor for Generator<'_, F> {
    type Frame = Snapshot;

    fn enter(&mut self, dir: &Path) -> Result<Snapshot> {
        announce(&mut *self.out, self.verbose, dir)?;
        self.summary.directories += 1;
        Ok(Snapshot::new(dir))
    }

    fn visit(&mut self, frame: &mut Snapshot, entry: &WalkEntry) -> Result<()> {
        let Some(record) = stat_entry(self.fs, &entry.path, true) else {
            self.summary.stat_failures += 1;
            return Ok(());
        };

        match record.hash {
            HashState::Computed(_) => self.summary.hashed += 1,
            HashState::Failed => self.summary.hash_failures += 1,
            HashState::Directory | HashState::Pending => {}
        }
        self.summary.entries += 1;
        frame.insert(record);
        Ok(())
    }

    fn leave(&mut self, _dir: &Path, frame: Snapshot) -> Result<()> {
        match manifest::save(self.fs, &frame)? {
            SaveOutcome::Written => self.summary.manifests_written += 1,
            SaveOutcome::Removed => self.summary.manifests_removed += 1,
            SaveOutcome::Absent => {}
        }
        Ok(())
    }
}

/// Hash every entry under `dir` and replace each directory's manifest.
///
/// Prints `GENERATE: <dir>` first. Directories with nothing to record end
/// up without a manifest.
///
/// # Errors
///
/// Returns an error if a directory cannot be listed, a manifest cannot be
/// written, or the run is interrupted.
pub fn execute<F: FileSystem + ?Sized>(
    ctx: &FilecheckContext,
    fs: &F,
    dir: &Path,
    walk: &WalkOptions,
    out: &mut dyn Write,
) -> Result<GenerateSummary> {
    writeln!(out, "GENERATE: {}", dir.display())?;

    let mut generator = Generator {
        fs,
        verbose: ctx.verbose,
        out,
        summary: GenerateSummary::default(),
    };
    scanner::drive(fs, dir, walk, ctx.interrupt(), &mut generator)?;

    Ok(generator.summary)
}
