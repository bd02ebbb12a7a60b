//! Directory traversal.
//!
//! [`Walk`] is a pure, lazy depth-first sequence of [`WalkEvent`]s. [`drive`]
//! feeds those events to a [`DirectoryVisitor`], which keeps one frame per
//! open directory; that is where the commands build their per-directory
//! snapshots.

/// Glob-based ignore list.
pub mod ignore;

/// Lazy depth-first walker.
pub mod walker;

pub use ignore::IgnoreSet;
pub use walker::{Walk, WalkEntry, WalkEvent, WalkOptions};

use crate::error::Interrupted;
use crate::fs::FileSystem;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Level, span};

/// Per-directory callbacks driven by [`drive`].
pub trait DirectoryVisitor {
    /// State kept while a directory is open.
    type Frame;

    /// Called when `dir` is entered, before any of its entries.
    ///
    /// # Errors
    ///
    /// An error aborts the walk.
    fn enter(&mut self, dir: &Path) -> Result<Self::Frame>;

    /// Called for every emitted child of the innermost open directory.
    ///
    /// # Errors
    ///
    /// An error aborts the walk.
    fn visit(&mut self, frame: &mut Self::Frame, entry: &WalkEntry) -> Result<()>;

    /// Called when `dir` is left, after all of its entries and nested
    /// directories.
    ///
    /// # Errors
    ///
    /// An error aborts the walk.
    fn leave(&mut self, dir: &Path, frame: Self::Frame) -> Result<()>;
}

/// Walk `root` and dispatch every event to `visitor`.
///
/// `interrupt` is polled before each event; once set, the walk stops with
/// [`Interrupted`] without calling `leave` for the open directories, so no
/// further manifest is written.
///
/// # Errors
///
/// Returns an error if a directory cannot be listed, if the visitor fails,
/// or if the walk was interrupted.
pub fn drive<F, V>(
    fs: &F,
    root: &Path,
    options: &WalkOptions,
    interrupt: &AtomicBool,
    visitor: &mut V,
) -> Result<()>
where
    F: FileSystem + ?Sized,
    V: DirectoryVisitor,
{
    let span = span!(Level::DEBUG, "walk", root = %root.display(), recursive = options.recursive);
    let _guard = span.enter();

    let mut frames: Vec<V::Frame> = Vec::new();

    for event in Walk::new(fs, root, options) {
        if interrupt.load(Ordering::Relaxed) {
            return Err(Interrupted.into());
        }

        match event? {
            WalkEvent::EnterDir(dir) => frames.push(visitor.enter(&dir)?),
            WalkEvent::Entry(entry) => {
                let frame = frames
                    .last_mut()
                    .context("walk produced an entry outside of any directory")?;
                visitor.visit(frame, &entry)?;
            }
            WalkEvent::LeaveDir(dir) => {
                let frame = frames
                    .pop()
                    .context("walk left a directory it never entered")?;
                visitor.leave(&dir, frame)?;
            }
        }
    }

    Ok(())
}
