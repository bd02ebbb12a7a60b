use crate::fs::FileSystem;
use crate::storage::HashState;
use md5::{Digest, Md5};
use std::io::{self, Read};
use std::path::Path;
use tracing::warn;

/// Bytes read per chunk while hashing, bounding per-file memory.
pub const CHUNK_SIZE: usize = 65536;

/// MD5 of `data` as lowercase hex.
#[must_use]
pub fn hash_bytes(data: &[u8]) -> String {
    format!("{:x}", Md5::digest(data))
}

/// Stream `reader` through MD5 in [`CHUNK_SIZE`] chunks.
///
/// # Errors
///
/// Returns the first read error.
pub fn hash_reader<R: Read + ?Sized>(reader: &mut R) -> io::Result<String> {
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Hash the file at `path`.
///
/// Never fails: an I/O error is logged and recorded as
/// [`HashState::Failed`], which compares unequal to every real hash.
pub fn hash_file<F: FileSystem + ?Sized>(fs: &F, path: &Path) -> HashState {
    match fs.open(path).and_then(|mut reader| hash_reader(&mut reader)) {
        Ok(hex) => HashState::Computed(hex),
        Err(e) => {
            warn!("Error calculating MD5 for {}: {e}", path.display());
            HashState::Failed
        }
    }
}
