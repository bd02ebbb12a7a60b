use crate::config::UpdateOptions;
use crate::storage::{Entry, HashState, Snapshot, whole_seconds};
use std::fmt;
use std::path::PathBuf;
use tracing::info;

/// First signal that marked an entry as changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeReason {
    /// Not in the baseline
    New,
    /// Became a directory, or stopped being one
    Kind,
    /// Size differs
    Size,
    /// Creation time differs
    Ctime,
    /// Access time differs
    Atime,
    /// Modification time differs
    Mtime,
}

impl fmt::Display for ChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::New => "new",
            Self::Kind => "kind",
            Self::Size => "size",
            Self::Ctime => "ctime",
            Self::Atime => "atime",
            Self::Mtime => "mtime",
        })
    }
}

/// An entry whose hash was recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Regenerated {
    /// Directory joined with the entry name
    pub path: PathBuf,
    /// Why it was recomputed
    pub reason: ChangeReason,
}

/// Result of merging one directory.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    /// The new baseline
    pub snapshot: Snapshot,
    /// Recomputed entries in visiting order
    pub regenerated: Vec<Regenerated>,
}

/// Incremental merge of fresh entries into a baseline, one entry at a time.
///
/// The update command feeds entries as the walker produces them so it can
/// announce each re-hash immediately; [`merge`] is the whole-snapshot form.
#[derive(Debug)]
pub struct Merger {
    baseline: Snapshot,
    options: UpdateOptions,
    merged: Snapshot,
}

impl Merger {
    /// Start merging into a copy of `baseline`'s directory.
    #[must_use]
    pub fn new(baseline: Snapshot, options: UpdateOptions) -> Self {
        let merged = Snapshot::new(baseline.dir());
        Self {
            baseline,
            options,
            merged,
        }
    }

    /// Merge one freshly stat'ed entry.
    ///
    /// Returns the reason when the entry was treated as changed. Changed
    /// files are hashed with `hasher`; changed directories keep their
    /// directory marker. Unchanged entries keep the stored hash and take the
    /// fresh size and timestamps.
    pub fn merge_entry<H>(&mut self, mut fresh: Entry, hasher: H) -> Option<ChangeReason>
    where
        H: FnOnce(&Entry) -> HashState,
    {
        let stored = self.baseline.remove(&fresh.file_name);
        let reason = match &stored {
            None => Some(ChangeReason::New),
            Some(stored) => change_reason(&fresh, stored, &self.options),
        };

        match (&reason, stored) {
            (None, Some(stored)) => fresh.hash = stored.hash,
            (Some(reason), _) => {
                info!("{}: {reason}", fresh.path().display());
                if !fresh.is_directory() {
                    fresh.hash = hasher(&fresh);
                }
            }
            (None, None) => {}
        }

        self.merged.insert(fresh);
        reason
    }

    /// The merged snapshot. Baseline entries never seen are dropped.
    #[must_use]
    pub fn finish(self) -> Snapshot {
        self.merged
    }
}

fn change_reason(fresh: &Entry, stored: &Entry, options: &UpdateOptions) -> Option<ChangeReason> {
    if fresh.is_directory() != stored.is_directory() {
        Some(ChangeReason::Kind)
    } else if !options.ignore_size && fresh.size != stored.size {
        Some(ChangeReason::Size)
    } else if options.check_ctime && whole_seconds(fresh.ctime) != whole_seconds(stored.ctime) {
        Some(ChangeReason::Ctime)
    } else if options.check_atime && whole_seconds(fresh.atime) != whole_seconds(stored.atime) {
        Some(ChangeReason::Atime)
    } else if !options.ignore_mtime && whole_seconds(fresh.mtime) != whole_seconds(stored.mtime) {
        Some(ChangeReason::Mtime)
    } else {
        None
    }
}

/// Merge a freshly built light snapshot with `baseline`.
///
/// Every entry of `fresh` appears in the result. An entry is re-hashed when
/// it is new, changed kind, or any enabled signal (size, ctime, atime,
/// mtime) differs; otherwise the stored hash is carried over unchanged.
pub fn merge<H>(
    fresh: Snapshot,
    baseline: Snapshot,
    options: &UpdateOptions,
    mut hasher: H,
) -> UpdateOutcome
where
    H: FnMut(&Entry) -> HashState,
{
    let mut merger = Merger::new(baseline, *options);
    let mut regenerated = Vec::new();

    for entry in fresh {
        let path = entry.path();
        if let Some(reason) = merger.merge_entry(entry, &mut hasher) {
            regenerated.push(Regenerated { path, reason });
        }
    }

    UpdateOutcome {
        snapshot: merger.finish(),
        regenerated,
    }
}
