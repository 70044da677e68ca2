//! File size probe.

use std::io;
use std::path::Path;

/// Byte length of the file at `path`.
///
/// Fails if the path does not exist, cannot be read, or is a directory.
pub fn size_of(path: &Path) -> io::Result<u64> {
    let meta = std::fs::metadata(path)?;
    if meta.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is a directory", path.display()),
        ));
    }
    Ok(meta.len())
}
