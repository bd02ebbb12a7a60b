//! Typed errors for the conditions callers branch on.
//!
//! Command-level code works with `anyhow::Result` and adds context; these
//! types exist where a caller has to tell one failure apart from another,
//! e.g. a corrupt manifest (skip the directory) versus an unreadable one
//! (abort the run).

use std::path::PathBuf;
use thiserror::Error;

/// Failure to load a directory's manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest exists but its header or an entry line is invalid.
    #[error("corrupt manifest {path}: {reason}")]
    Corrupt {
        /// Manifest file
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// The manifest exists but could not be read.
    #[error("cannot read manifest {path}")]
    Io {
        /// Manifest file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ManifestError {
    /// Whether this is the recoverable, directory-scoped corruption case.
    #[must_use]
    pub const fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }
}

/// Failure while walking a directory tree.
#[derive(Debug, Error)]
pub enum WalkError {
    /// A directory could not be listed.
    #[error("cannot list directory {path}")]
    ListDir {
        /// Directory being listed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// The run was stopped by SIGINT/SIGTERM.
#[derive(Debug, Error)]
#[error("operation cancelled by user")]
pub struct Interrupted;
