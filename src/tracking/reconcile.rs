use crate::config::CheckOptions;
use crate::storage::{Entry, HashState, Snapshot, whole_seconds};
use std::fmt;
use std::path::PathBuf;

/// Outcome of comparing one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Not in the baseline
    NewItem,
    /// Exactly one side is a directory
    DirectoryMismatch,
    /// Sizes differ
    SizeMismatch,
    /// Modification times differ
    MtimeMismatch,
    /// Access times differ
    AtimeMismatch,
    /// Creation times differ
    CtimeMismatch,
    /// Content hashes differ
    HashMismatch,
    /// Nothing that was compared differs
    SameFile,
    /// In the baseline but no longer present
    DeletedFile,
}

impl Status {
    /// Label used in report lines.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NewItem => "new item",
            Self::DirectoryMismatch => "directory mismatch",
            Self::SizeMismatch => "size mismatch",
            Self::MtimeMismatch => "mtime mismatch",
            Self::AtimeMismatch => "atime mismatch",
            Self::CtimeMismatch => "ctime mismatch",
            Self::HashMismatch => "MD5 mismatch",
            Self::SameFile => "same file",
            Self::DeletedFile => "deleted file",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One line of a check report, printed as `<status>: <path>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    /// What was found
    pub status: Status,
    /// Directory joined with the entry name
    pub path: PathBuf,
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.path.display())
    }
}

/// Diff `current` against `baseline`.
///
/// `current` is normally built without hashes. Each of its entries is looked
/// up in the baseline and classified by the first differing signal in this
/// order: directory-ness, size, mtime, atime, ctime, content. `hasher` is
/// called only for the last step, and only when the current hash is still
/// pending while the stored one is not.
///
/// `same file` lines are included only with `show_same_files`. Baseline
/// entries that no longer exist follow as `deleted file`, in name order.
/// The baseline is expected to be filtered against the ignore list already.
pub fn reconcile<H>(
    current: &Snapshot,
    baseline: &Snapshot,
    options: &CheckOptions,
    mut hasher: H,
) -> Vec<ReportLine>
where
    H: FnMut(&Entry) -> HashState,
{
    let mut remaining = baseline.clone();
    let mut report = Vec::new();

    for entry in current {
        let status = match remaining.remove(&entry.file_name) {
            None => Status::NewItem,
            Some(stored) => compare(entry, &stored, options, &mut hasher),
        };

        if status != Status::SameFile || options.show_same_files {
            report.push(ReportLine {
                status,
                path: entry.path(),
            });
        }
    }

    report.extend(remaining.iter().map(|stored| ReportLine {
        status: Status::DeletedFile,
        path: current.dir().join(&stored.file_name),
    }));

    report
}

fn compare<H>(current: &Entry, stored: &Entry, options: &CheckOptions, hasher: &mut H) -> Status
where
    H: FnMut(&Entry) -> HashState,
{
    if current.is_directory() || stored.is_directory() {
        return if current.is_directory() == stored.is_directory() {
            Status::SameFile
        } else {
            Status::DirectoryMismatch
        };
    }

    if !options.ignore_size && current.size != stored.size {
        return Status::SizeMismatch;
    }
    if !options.ignore_mtime && whole_seconds(current.mtime) != whole_seconds(stored.mtime) {
        return Status::MtimeMismatch;
    }
    if options.check_atime && whole_seconds(current.atime) != whole_seconds(stored.atime) {
        return Status::AtimeMismatch;
    }
    if options.check_ctime && whole_seconds(current.ctime) != whole_seconds(stored.ctime) {
        return Status::CtimeMismatch;
    }

    if options.ignore_hash {
        return Status::SameFile;
    }

    let computed;
    let hash = if current.hash.is_pending() && !stored.hash.is_pending() {
        computed = hasher(current);
        &computed
    } else {
        &current.hash
    };

    if hash.matches(&stored.hash) {
        Status::SameFile
    } else {
        Status::HashMismatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const T: f64 = 1_700_000_000.25;

    fn file(name: &str, hash: HashState, size: u64) -> Entry {
        Entry {
            file_name: name.to_string(),
            dir_name: PathBuf::from("."),
            hash,
            size,
            ctime: T,
            mtime: T,
            atime: T,
        }
    }

    fn computed(hex: &str) -> HashState {
        HashState::Computed(hex.to_string())
    }

    fn snapshot(entries: impl IntoIterator<Item = Entry>) -> Snapshot {
        let mut snapshot = Snapshot::new(".");
        for entry in entries {
            snapshot.insert(entry);
        }
        snapshot
    }

    /// Compare a single pair and count hasher calls.
    fn status_of(current: Entry, stored: Entry, options: &CheckOptions) -> (Option<Status>, usize) {
        let mut calls = 0;
        let report = reconcile(
            &snapshot([current]),
            &snapshot([stored]),
            &CheckOptions {
                show_same_files: true,
                ..*options
            },
            |_| {
                calls += 1;
                computed("aaaa")
            },
        );
        (report.first().map(|line| line.status), calls)
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(Status::HashMismatch.to_string(), "MD5 mismatch");
        let line = ReportLine {
            status: Status::SizeMismatch,
            path: PathBuf::from("./a.txt"),
        };
        assert_eq!(line.to_string(), "size mismatch: ./a.txt");
    }

    #[rstest]
    #[case::size_before_mtime(6, T + 5.0, T, T, Status::SizeMismatch)]
    #[case::mtime_before_atime(5, T + 5.0, T + 5.0, T + 5.0, Status::MtimeMismatch)]
    #[case::atime_before_ctime(5, T, T + 5.0, T + 5.0, Status::AtimeMismatch)]
    #[case::ctime_alone(5, T, T, T + 5.0, Status::CtimeMismatch)]
    #[case::sub_second_jitter(5, T + 0.5, T + 0.5, T + 0.5, Status::SameFile)]
    fn test_precedence_short_circuits(
        #[case] size: u64,
        #[case] mtime: f64,
        #[case] atime: f64,
        #[case] ctime: f64,
        #[case] expected: Status,
    ) {
        let stored = file("a.txt", computed("aaaa"), 5);
        let current = Entry {
            size,
            mtime,
            atime,
            ctime,
            ..file("a.txt", HashState::Pending, 5)
        };
        let options = CheckOptions {
            check_atime: true,
            check_ctime: true,
            ..CheckOptions::default()
        };

        let (status, calls) = status_of(current, stored, &options);
        assert_eq!(status, Some(expected));
        let reached_hash = expected == Status::SameFile;
        assert_eq!(calls, usize::from(reached_hash));
    }

    #[rstest]
    #[case::ignore_size(CheckOptions { ignore_size: true, ..CheckOptions::default() }, 6, T, Status::SameFile)]
    #[case::ignore_mtime(CheckOptions { ignore_mtime: true, ..CheckOptions::default() }, 5, T + 9.0, Status::SameFile)]
    #[case::atime_off_by_default(CheckOptions::default(), 5, T, Status::SameFile)]
    fn test_disabled_signals_are_skipped(
        #[case] options: CheckOptions,
        #[case] size: u64,
        #[case] mtime: f64,
        #[case] expected: Status,
    ) {
        let stored = file("a.txt", computed("aaaa"), 5);
        let current = Entry {
            size,
            mtime,
            atime: T + 100.0,
            ctime: T + 100.0,
            ..file("a.txt", HashState::Pending, 5)
        };

        assert_eq!(status_of(current, stored, &options).0, Some(expected));
    }

    #[test]
    fn test_hash_mismatch_after_cheap_checks_pass() {
        let stored = file("a.txt", computed("bbbb"), 5);
        let current = file("a.txt", HashState::Pending, 5);

        let (status, calls) = status_of(current, stored, &CheckOptions::default());
        assert_eq!(status, Some(Status::HashMismatch));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_hash_comparison_is_case_insensitive() {
        let stored = file("a.txt", computed("AAAA"), 5);
        let current = file("a.txt", HashState::Pending, 5);

        assert_eq!(
            status_of(current, stored, &CheckOptions::default()).0,
            Some(Status::SameFile)
        );
    }

    #[test]
    fn test_ignore_hash_never_hashes() {
        let stored = file("a.txt", computed("bbbb"), 5);
        let current = file("a.txt", HashState::Pending, 5);
        let options = CheckOptions {
            ignore_hash: true,
            ..CheckOptions::default()
        };

        assert_eq!(status_of(current, stored, &options), (Some(Status::SameFile), 0));
    }

    #[test]
    fn test_pending_baseline_is_not_hashed_against() {
        let stored = file("a.txt", HashState::Pending, 5);
        let current = file("a.txt", HashState::Pending, 5);

        assert_eq!(
            status_of(current, stored, &CheckOptions::default()),
            (Some(Status::SameFile), 0)
        );
    }

    #[test]
    fn test_failed_hash_is_always_reported() {
        let stored = file("a.txt", HashState::Failed, 5);
        let current = file("a.txt", HashState::Pending, 5);

        let mut calls = 0;
        let report = reconcile(
            &snapshot([current]),
            &snapshot([stored]),
            &CheckOptions::default(),
            |_| {
                calls += 1;
                HashState::Failed
            },
        );
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].status, Status::HashMismatch);
        assert_eq!(calls, 1);
    }

    #[rstest]
    #[case::dir_vs_file(HashState::Directory, computed("aaaa"), Status::DirectoryMismatch)]
    #[case::file_vs_dir(HashState::Pending, HashState::Directory, Status::DirectoryMismatch)]
    #[case::dir_vs_dir(HashState::Directory, HashState::Directory, Status::SameFile)]
    fn test_directory_check_comes_first(
        #[case] current_hash: HashState,
        #[case] stored_hash: HashState,
        #[case] expected: Status,
    ) {
        // Sizes and times differ too; the directory rule must win regardless.
        let stored = file("x", stored_hash, 4096);
        let current = Entry {
            mtime: T + 60.0,
            ..file("x", current_hash, 1)
        };

        assert_eq!(
            status_of(current, stored, &CheckOptions::default()),
            (Some(expected), 0)
        );
    }

    #[test]
    fn test_report_order_new_then_deleted() {
        let baseline = snapshot([
            file("b.txt", computed("bbbb"), 1),
            file("gone.txt", computed("cccc"), 1),
            file("also-gone", computed("dddd"), 1),
        ]);
        let current = snapshot([
            file("a.txt", HashState::Pending, 1),
            file("b.txt", HashState::Pending, 1),
            file("c.txt", HashState::Pending, 1),
        ]);

        let report = reconcile(&current, &baseline, &CheckOptions::default(), |_| computed("bbbb"));
        let lines: Vec<String> = report.iter().map(ToString::to_string).collect();

        assert_eq!(
            lines,
            vec![
                "new item: ./a.txt",
                "new item: ./c.txt",
                "deleted file: ./also-gone",
                "deleted file: ./gone.txt",
            ]
        );
    }

    #[test]
    fn test_show_same_files() {
        let baseline = snapshot([file("a.txt", computed("aaaa"), 1)]);
        let current = snapshot([file("a.txt", HashState::Pending, 1)]);

        let quiet = reconcile(&current, &baseline, &CheckOptions::default(), |_| computed("aaaa"));
        assert!(quiet.is_empty());

        let options = CheckOptions {
            show_same_files: true,
            ..CheckOptions::default()
        };
        let loud = reconcile(&current, &baseline, &options, |_| computed("aaaa"));
        assert_eq!(loud.len(), 1);
        assert_eq!(loud[0].to_string(), "same file: ./a.txt");
    }
}
