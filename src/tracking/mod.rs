//! Comparing a directory's current state with its recorded baseline.
//!
//! Both halves are pure over [`Snapshot`](crate::storage::Snapshot)s. Hashing
//! is injected as a closure so the callers decide where bytes come from and
//! the tests can count how often content was actually read.
//!
//! - [`reconcile`]: the `check` diff. Signals are tested in a fixed order and
//!   the first mismatch wins; content is hashed only when every cheap signal
//!   already agrees.
//! - [`update`]: the `update` merge. Any enabled signal marks an entry as
//!   changed; changed entries are re-hashed and the rest keep their stored
//!   hash.
//!
//! # Usage
//!
//! ```
//! use filecheck::config::CheckOptions;
//! use filecheck::storage::{Entry, HashState, Snapshot};
//! use filecheck::tracking::reconcile::{Status, reconcile};
//! use std::path::PathBuf;
//!
//! let entry = Entry {
//!     file_name: "a.txt".to_string(),
//!     dir_name: PathBuf::from("."),
//!     hash: HashState::Pending,
//!     size: 6,
//!     ctime: 0.0,
//!     mtime: 0.0,
//!     atime: 0.0,
//! };
//! let mut current = Snapshot::new(".");
//! current.insert(entry.clone());
//! let mut baseline = Snapshot::new(".");
//! baseline.insert(Entry { size: 5, ..entry });
//!
//! let report = reconcile(&current, &baseline, &CheckOptions::default(), |_| HashState::Failed);
//! assert_eq!(report[0].status, Status::SizeMismatch);
//! assert_eq!(report[0].to_string(), "size mismatch: ./a.txt");
//! ```

/// The check diff.
pub mod reconcile;

/// The update merge.
pub mod update;

pub use reconcile::{ReportLine, Status, reconcile};
pub use update::{ChangeReason, Merger, Regenerated, UpdateOutcome, merge};
