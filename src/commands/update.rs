use super::{announce, load_baseline, stat_entry};
use crate::FilecheckContext;
use crate::config::UpdateOptions;
use crate::fs::FileSystem;
use crate::scanner::{self, DirectoryVisitor, IgnoreSet, WalkEntry, WalkOptions};
use crate::storage::manifest::{self, SaveOutcome};
use crate::tracking::Merger;
use crate::utils::hash;
use anyhow::Result;
use std::io::Write;
use std::path::Path;
use tracing::warn;

/// What an update run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Directories visited
    pub directories: usize,
    /// Entries recorded
    pub entries: usize,
    /// Entries whose hash was recomputed
    pub regenerated: usize,
    /// Entries skipped because they could not be stat'ed
    pub stat_failures: usize,
    /// Directories left untouched because their manifest is corrupt
    pub corrupt_manifests: usize,
    /// Manifests written
    pub manifests_written: usize,
    /// Manifests removed because their directory had nothing to record
    pub manifests_removed: usize,
}

struct Updater<'a, F: FileSystem + ?Sized> {
    fs: &'a F,
    verbose: bool,
    ignore: &'a IgnoreSet,
    options: UpdateOptions,
    out: &'a mut dyn Write,
    summary: UpdateSummary,
}

impl<F: FileSystem + ?Sized> DirectoryVisitor for Updater<'_, F> {
    /// `None` while inside a directory whose manifest must not be touched.
    type Frame = Option<Merger>;

    fn enter(&mut self, dir: &Path) -> Result<Self::Frame> {
        announce(&mut *self.out, self.verbose, dir)?;
        self.summary.directories += 1;

        let Some(baseline) = load_baseline(self.fs, dir, self.ignore)? else {
            warn!("leaving the manifest of {} as it is", dir.display());
            self.summary.corrupt_manifests += 1;
            return Ok(None);
        };
        Ok(Some(Merger::new(baseline, self.options)))
    }

    fn visit(&mut self, frame: &mut Self::Frame, entry: &WalkEntry) -> Result<()> {
        let Some(merger) = frame else {
            return Ok(());
        };
        let Some(fresh) = stat_entry(self.fs, &entry.path, false) else {
            self.summary.stat_failures += 1;
            return Ok(());
        };

        let fs = self.fs;
        if merger
            .merge_entry(fresh, |record| hash::hash_file(fs, &record.path()))
            .is_some()
        {
            writeln!(self.out, "Regenerating {}.", entry.path.display())?;
            self.summary.regenerated += 1;
        }
        self.summary.entries += 1;
        Ok(())
    }

    fn leave(&mut self, _dir: &Path, frame: Self::Frame) -> Result<()> {
        let Some(merger) = frame else {
            return Ok(());
        };
        match manifest::save(self.fs, &merger.finish())? {
            SaveOutcome::Written => self.summary.manifests_written += 1,
            SaveOutcome::Removed => self.summary.manifests_removed += 1,
            SaveOutcome::Absent => {}
        }
        Ok(())
    }
}

/// Refresh the manifests under `dir`.
///
/// Prints `UPDATE: <dir>` first and `Regenerating <path>.` for every entry
/// that is new or whose enabled signals changed. All other entries keep
/// their recorded hash. A directory with a corrupt manifest is reported and
/// its manifest left as it is.
///
/// # Errors
///
/// Returns an error if a directory cannot be listed, a manifest cannot be
/// read or written, or the run is interrupted.
pub fn execute<F: FileSystem + ?Sized>(
    ctx: &FilecheckContext,
    fs: &F,
    dir: &Path,
    walk: &WalkOptions,
    options: &UpdateOptions,
    out: &mut dyn Write,
) -> Result<UpdateSummary> {
    writeln!(out, "UPDATE: {}", dir.display())?;

    let mut updater = Updater {
        fs,
        verbose: ctx.verbose,
        ignore: &walk.ignore,
        options: *options,
        out,
        summary: UpdateSummary::default(),
    };
    scanner::drive(fs, dir, walk, ctx.interrupt(), &mut updater)?;

    Ok(updater.summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::generate;
    use crate::config::Config;
    use crate::fs::{FileTimes, MemoryFileSystem};
    use crate::storage::HashState;
    use std::path::PathBuf;

    fn context() -> FilecheckContext {
        FilecheckContext::with_config(Config::default())
    }

    fn record_baseline(fs: &MemoryFileSystem, recursive: bool) -> Result<()> {
        let ctx = context();
        let walk = ctx.walk_options(recursive, false);
        generate::execute(&ctx, fs, Path::new("."), &walk, &mut std::io::sink())?;
        Ok(())
    }

    fn update(
        fs: &MemoryFileSystem,
        recursive: bool,
        options: &UpdateOptions,
    ) -> Result<(UpdateSummary, Vec<String>)> {
        let ctx = context();
        let walk = ctx.walk_options(recursive, false);
        let mut out = Vec::new();
        let summary = execute(&ctx, fs, Path::new("."), &walk, options, &mut out)?;
        let lines = String::from_utf8(out)?.lines().map(str::to_string).collect();
        Ok((summary, lines))
    }

    fn stored_hash(fs: &MemoryFileSystem, dir: &str, name: &str) -> Result<Option<HashState>> {
        Ok(manifest::load(fs, Path::new(dir))?
            .get(name)
            .map(|entry| entry.hash.clone()))
    }

    #[test]
    fn test_update_without_changes_reads_no_content() -> Result<()> {
        let fs = MemoryFileSystem::new();
        fs.add_file("a.txt", "hello");
        fs.add_file("b.txt", "bye");
        record_baseline(&fs, false)?;
        let before = fs.contents(".filecheck");
        fs.clear_opened();

        let (summary, lines) = update(&fs, false, &UpdateOptions::default())?;

        assert_eq!(lines, vec!["UPDATE: ."]);
        assert_eq!(summary.regenerated, 0);
        assert_eq!(fs.opened(), vec![PathBuf::from(".filecheck")]);
        assert_eq!(fs.contents(".filecheck"), before);
        Ok(())
    }

    #[test]
    fn test_update_preserves_hash_when_signals_agree() -> Result<()> {
        let fs = MemoryFileSystem::new();
        fs.add_file("a.txt", "hello");
        record_baseline(&fs, false)?;
        let original = stored_hash(&fs, ".", "a.txt")?;
        // Same size and timestamps, different content: update must not notice.
        fs.set_contents("a.txt", "jello")?;

        update(&fs, false, &UpdateOptions::default())?;

        assert_eq!(stored_hash(&fs, ".", "a.txt")?, original);
        Ok(())
    }

    #[test]
    fn test_changed_and_new_entries_are_regenerated() -> Result<()> {
        let fs = MemoryFileSystem::new();
        fs.add_file("a.txt", "hello");
        fs.add_file("gone.txt", "x");
        record_baseline(&fs, false)?;
        fs.set_contents("a.txt", "hello!")?;
        fs.add_file("c.txt", "new");
        fs.remove_file(Path::new("gone.txt"))?;

        let (summary, lines) = update(&fs, false, &UpdateOptions::default())?;

        assert_eq!(
            lines,
            vec!["UPDATE: .", "Regenerating ./a.txt.", "Regenerating ./c.txt."]
        );
        assert_eq!(summary.regenerated, 2);
        assert_eq!(
            stored_hash(&fs, ".", "a.txt")?,
            Some(HashState::Computed(hash::hash_bytes(b"hello!")))
        );
        assert_eq!(stored_hash(&fs, ".", "gone.txt")?, None);
        Ok(())
    }

    #[test]
    fn test_ignore_mtime_skips_touched_files() -> Result<()> {
        let fs = MemoryFileSystem::new();
        fs.add_file("a.txt", "hello");
        record_baseline(&fs, false)?;
        let times = fs.times("a.txt").expect("file exists");
        fs.set_times("a.txt", FileTimes { mtime: times.mtime + 60.0, ..times })?;

        let options = UpdateOptions {
            ignore_mtime: true,
            ..UpdateOptions::default()
        };
        let (summary, _) = update(&fs, false, &options)?;
        assert_eq!(summary.regenerated, 0);

        let (summary, lines) = update(&fs, false, &UpdateOptions::default())?;
        assert_eq!(summary.regenerated, 1);
        assert_eq!(lines[1], "Regenerating ./a.txt.");
        Ok(())
    }

    #[test]
    fn test_corrupt_manifest_is_left_alone() -> Result<()> {
        let fs = MemoryFileSystem::new();
        fs.add_file("a.txt", "hello");
        fs.add_file("sub/b.txt", "b");
        record_baseline(&fs, true)?;
        fs.set_contents(".filecheck", "garbage")?;
        fs.add_file("sub/new.txt", "n");

        let (summary, lines) = update(&fs, true, &UpdateOptions::default())?;

        assert_eq!(summary.corrupt_manifests, 1);
        assert_eq!(lines, vec!["UPDATE: .", "Regenerating ./sub/new.txt."]);
        assert_eq!(fs.contents(".filecheck"), Some(b"garbage".to_vec()));
        assert!(stored_hash(&fs, "sub", "new.txt")?.is_some());
        Ok(())
    }

    #[test]
    fn test_update_without_baseline_hashes_everything() -> Result<()> {
        let fs = MemoryFileSystem::new();
        fs.add_file("a.txt", "hello");

        let (summary, _) = update(&fs, false, &UpdateOptions::default())?;

        assert_eq!(summary.regenerated, 1);
        assert_eq!(summary.manifests_written, 1);
        assert_eq!(
            stored_hash(&fs, ".", "a.txt")?,
            Some(HashState::Computed(hash::hash_bytes(b"hello")))
        );
        Ok(())
    }
}
