#![warn(missing_docs)]
#![allow(clippy::cast_possible_truncation)] // Timestamps are truncated to whole seconds on purpose
#![allow(clippy::cast_precision_loss)] // Nanosecond timestamps converted to f64 seconds

//! # Filecheck - Per-Directory File Integrity Manifests
//!
//! Filecheck records a small manifest (`.filecheck`) in every directory it
//! visits. Each manifest lists the directory's direct children with their
//! MD5 content hash, size and timestamps. Later runs compare the tree
//! against those manifests and report what changed.
//!
//! ## Operations
//!
//! - **generate**: hash everything and write fresh manifests
//! - **check**: compare the tree to the manifests without writing anything;
//!   content is only hashed once size and timestamps already agree
//! - **update**: rewrite the manifests, re-hashing only entries whose size or
//!   timestamps changed
//!
//! ## Architecture
//!
//! - [`fs`]: filesystem provider trait with on-disk and in-memory implementations
//! - [`scanner`]: lazy depth-first walker and the per-directory driver
//! - [`storage`]: entries, snapshots and the manifest format
//! - [`tracking`]: the check reconciler and the update merger
//! - [`commands`]: generate/check/update glued together per directory
//! - [`config`]: configuration file and per-command options
//!
//! ## Example Usage
//!
//! ```no_run
//! use filecheck::FilecheckContext;
//! use filecheck::config::CheckOptions;
//! use filecheck::fs::OsFileSystem;
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let ctx = FilecheckContext::new(None)?;
//! let walk = ctx.walk_options(true, false);
//! let mut out = std::io::stdout();
//!
//! filecheck::commands::generate::execute(&ctx, &OsFileSystem, Path::new("."), &walk, &mut out)?;
//! filecheck::commands::check::execute(
//!     &ctx,
//!     &OsFileSystem,
//!     Path::new("."),
//!     &walk,
//!     &CheckOptions::default(),
//!     &mut out,
//! )?;
//! # Ok(())
//! # }
//! ```

/// Command-line interface definitions (argument parsing structures).
pub mod cli;

/// Generate, check and update command implementations.
pub mod commands;

/// Configuration file handling and per-command option sets.
pub mod config;

/// Typed errors callers need to branch on.
pub mod error;

/// Filesystem provider abstraction.
pub mod fs;

/// Console output helpers.
pub mod output;

/// Directory traversal and ignore policy.
pub mod scanner;

/// Entries, snapshots and manifest persistence.
pub mod storage;

/// Reconciliation (check) and merging (update) of snapshots.
pub mod tracking;

/// Utility functions and helpers.
pub mod utils;

use anyhow::Result;
use config::Config;
use scanner::{IgnoreSet, WalkOptions};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Current version of the filecheck binary.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the per-directory manifest file.
pub const MANIFEST_FILE: &str = ".filecheck";

/// Name of the working file a manifest is written to before being renamed.
pub const MANIFEST_TEMP_FILE: &str = ".filecheck.tmp";

/// Manifest format version written in the header.
pub const FORMAT_VERSION: &str = "0.1";

/// Header signature: LONG RIGHTWARDS DOUBLE ARROW (U+27F9).
pub const SIGNATURE: char = '\u{27F9}';

/// Names skipped during traversal regardless of configuration.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    MANIFEST_FILE,
    MANIFEST_TEMP_FILE,
    ".git",
    ".svn",
    ".hg",
    "._Icon*",
    "Icon*",
    ".DS_Store",
    "Thumbs.db",
];

/// Central context shared by all filecheck commands.
///
/// Holds the loaded configuration, the verbosity switch and the interrupt
/// flag that signal handlers set. Commands poll the flag between walk
/// events so a cancelled run never stops in the middle of a manifest write.
#[derive(Debug, Clone)]
pub struct FilecheckContext {
    /// Loaded configuration
    pub config: Config,
    /// Print every directory as it is entered
    pub verbose: bool,
    /// Set when the run should stop at the next safe point
    interrupt: Arc<AtomicBool>,
}

impl FilecheckContext {
    /// Create a context from the configuration file at `config_path`, or the
    /// default location when `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or parsed.
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => Config::load(path)?,
            None => Config::load_default()?,
        };
        Ok(Self::with_config(config))
    }

    /// Create a context around an already loaded configuration.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            verbose: false,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The flag signal handlers should set to stop the run.
    #[must_use]
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    /// The interrupt flag, for polling.
    #[must_use]
    pub fn interrupt(&self) -> &AtomicBool {
        &self.interrupt
    }

    /// Build the walk options for one run, layering the command-line switches
    /// over the configured defaults.
    #[must_use]
    pub fn walk_options(&self, recursive: bool, follow_symlinks: bool) -> WalkOptions {
        WalkOptions {
            recursive: recursive || self.config.tracking.recursive,
            follow_symlinks: follow_symlinks || self.config.tracking.follow_symlinks,
            ignore: self.ignore_set(),
        }
    }

    /// The built-in ignore list extended with the configured patterns.
    #[must_use]
    pub fn ignore_set(&self) -> IgnoreSet {
        let mut ignore = IgnoreSet::default();
        for pattern in &self.config.tracking.ignore_patterns {
            // Patterns were validated when the configuration was loaded.
            if let Err(e) = ignore.add(pattern) {
                tracing::warn!("skipping ignore pattern {pattern:?}: {e}");
            }
        }
        ignore
    }
}
