//! The `.filecheck` manifest format.
//!
//! ```text
//! \u{FEFF}FILECHECK:0.1:⟹\r\r\n
//! <hash>:<size>:<ctime>:<mtime>:<atime>:<fileName>\r\r\n
//! ...
//! ```
//!
//! Timestamps are written with ten decimals. The file name is the last field
//! and may itself contain `:`. Readers accept any mix of `\r` and `\n` as line
//! terminators and skip blank lines; only terminators are trimmed, so names
//! with leading or trailing spaces survive.

use super::{Entry, HashState, Snapshot};
use crate::error::ManifestError;
use crate::fs::FileSystem;
use crate::{FORMAT_VERSION, MANIFEST_FILE, MANIFEST_TEMP_FILE, SIGNATURE};
use anyhow::{Context, Result};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Byte-order mark opening every manifest.
pub const BOM: char = '\u{FEFF}';

/// Tag in the first header field.
pub const HEADER_TAG: &str = "FILECHECK";

/// Terminator written after every line.
pub const LINE_TERMINATOR: &str = "\r\r\n";

/// Number of `:`-separated fields in an entry line.
const ENTRY_FIELDS: usize = 6;

/// What [`save`] did on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A manifest was written
    Written,
    /// The snapshot was empty and an existing manifest was removed
    Removed,
    /// The snapshot was empty and there was no manifest to remove
    Absent,
}

/// Path of the manifest for `dir`.
#[must_use]
pub fn manifest_path(dir: &Path) -> PathBuf {
    dir.join(MANIFEST_FILE)
}

/// Render `snapshot` in the manifest format, entries in name order.
#[must_use]
pub fn serialize(snapshot: &Snapshot) -> String {
    let mut out = String::with_capacity(64 + snapshot.len() * 96);
    out.push_str(&format!(
        "{BOM}{HEADER_TAG}:{FORMAT_VERSION}:{SIGNATURE}{LINE_TERMINATOR}"
    ));
    for entry in snapshot {
        out.push_str(&format!(
            "{}:{}:{:.10}:{:.10}:{:.10}:{}{LINE_TERMINATOR}",
            entry.hash, entry.size, entry.ctime, entry.mtime, entry.atime, entry.file_name
        ));
    }
    out
}

/// Parse manifest text into a snapshot of `dir`.
///
/// Entry lines with fewer than six fields are logged and skipped. A later
/// line for a name already seen replaces the earlier one.
///
/// # Errors
///
/// Returns [`ManifestError::Corrupt`] if the header is missing or does not
/// carry the expected tag, version and signature, or if a numeric field does
/// not parse.
pub fn parse(text: &str, dir: &Path) -> Result<Snapshot, ManifestError> {
    let path = manifest_path(dir);
    let corrupt = |reason: String| ManifestError::Corrupt {
        path: path.clone(),
        reason,
    };

    let mut lines = text
        .split('\n')
        .enumerate()
        .flat_map(|(index, line)| line.split('\r').map(move |part| (index, part)))
        .filter(|(_, line)| !line.is_empty());

    let Some((_, header)) = lines.next() else {
        return Err(corrupt("file is empty".to_string()));
    };
    check_header(header).map_err(corrupt)?;

    let mut snapshot = Snapshot::new(dir);
    for (index, line) in lines {
        let line_number = index + 1;
        let fields: Vec<&str> = line.splitn(ENTRY_FIELDS, ':').collect();
        let [hash, size, ctime, mtime, atime, file_name] = fields[..] else {
            warn!(
                "{}:{line_number}: expected {ENTRY_FIELDS} fields, skipping line",
                path.display()
            );
            continue;
        };
        if file_name.is_empty() {
            warn!("{}:{line_number}: empty file name, skipping line", path.display());
            continue;
        }

        let size = size
            .parse::<u64>()
            .map_err(|e| corrupt(format!("line {line_number}: invalid size {size:?}: {e}")))?;
        let [ctime, mtime, atime] = [("ctime", ctime), ("mtime", mtime), ("atime", atime)]
            .map(|(label, field)| {
                field.parse::<f64>().map_err(|e| {
                    corrupt(format!("line {line_number}: invalid {label} {field:?}: {e}"))
                })
            });

        snapshot.insert(Entry {
            file_name: file_name.to_string(),
            dir_name: dir.to_path_buf(),
            hash: HashState::from_field(hash),
            size,
            ctime: ctime?,
            mtime: mtime?,
            atime: atime?,
        });
    }

    Ok(snapshot)
}

/// Validate the header line. Fields past the signature are tolerated.
fn check_header(line: &str) -> Result<(), String> {
    let Some(rest) = line.strip_prefix(BOM) else {
        return Err("header lacks the byte-order mark".to_string());
    };

    let fields: Vec<&str> = rest.split(':').collect();
    let signature = SIGNATURE.to_string();
    let expected = [HEADER_TAG, FORMAT_VERSION, signature.as_str()];

    if fields.len() < expected.len() || fields[..expected.len()] != expected {
        return Err(format!("unrecognized header {rest:?}"));
    }
    Ok(())
}

/// Load the manifest of `dir`.
///
/// A missing manifest is the valid "no baseline" state and yields an empty
/// snapshot.
///
/// # Errors
///
/// Returns [`ManifestError::Corrupt`] for a manifest that is present but
/// invalid (including invalid UTF-8), and [`ManifestError::Io`] if it cannot
/// be read.
pub fn load<F: FileSystem + ?Sized>(fs: &F, dir: &Path) -> Result<Snapshot, ManifestError> {
    let path = manifest_path(dir);
    let bytes = match fs.read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("no manifest in {}", dir.display());
            return Ok(Snapshot::new(dir));
        }
        Err(source) => return Err(ManifestError::Io { path, source }),
    };

    let text = String::from_utf8(bytes).map_err(|e| ManifestError::Corrupt {
        path: path.clone(),
        reason: format!("not valid UTF-8: {e}"),
    })?;
    parse(&text, dir)
}

/// Persist `snapshot` as its directory's manifest.
///
/// The text goes to `.filecheck.tmp` first and is then renamed over
/// `.filecheck`, so the manifest is always either the old file or the
/// complete new one. An empty snapshot removes the manifest instead of
/// writing a header-only file.
///
/// # Errors
///
/// Returns an error if the working file cannot be written or renamed, or if
/// an existing manifest cannot be removed.
pub fn save<F: FileSystem + ?Sized>(fs: &F, snapshot: &Snapshot) -> Result<SaveOutcome> {
    let path = manifest_path(snapshot.dir());

    if snapshot.is_empty() {
        return match fs.remove_file(&path) {
            Ok(()) => {
                debug!("removed {}", path.display());
                Ok(SaveOutcome::Removed)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(SaveOutcome::Absent),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        };
    }

    let temp = snapshot.dir().join(MANIFEST_TEMP_FILE);
    fs.write(&temp, serialize(snapshot).as_bytes())
        .with_context(|| format!("Failed to write {}", temp.display()))?;

    if let Err(e) = fs.rename(&temp, &path) {
        if let Err(cleanup) = fs.remove_file(&temp) {
            warn!("could not remove {}: {cleanup}", temp.display());
        }
        return Err(e).with_context(|| format!("Failed to replace {}", path.display()));
    }

    debug!("wrote {} ({} entries)", path.display(), snapshot.len());
    Ok(SaveOutcome::Written)
}
