//! Persisting rewritten output.
//!
//! Writes are atomic (tempfile + fsync + rename) and bump the target's mtime
//! so incremental builds pick up generated files.

use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Output is not valid UTF-8 (first invalid byte at {valid_up_to})")]
    InvalidUtf8 { valid_up_to: usize },

    #[error("Output path has no parent directory: {0}")]
    NoParent(std::path::PathBuf),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Check that generated bytes are valid UTF-8 source text.
pub fn ensure_utf8(content: &[u8]) -> Result<&str, OutputError> {
    std::str::from_utf8(content).map_err(|e| OutputError::InvalidUtf8 {
        valid_up_to: e.valid_up_to(),
    })
}

/// Write `content` to `path` atomically and touch its mtime.
pub fn write_output(path: &Path, content: &[u8]) -> Result<(), OutputError> {
    atomic_write(path, content)?;

    let now = filetime::FileTime::now();
    filetime::set_file_mtime(path, now)?;
    Ok(())
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write lands or the target is left untouched.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), OutputError> {
    // Same directory keeps the rename on one filesystem
    let parent = match path.parent() {
        Some(dir) if dir.as_os_str().is_empty() => Path::new("."),
        Some(dir) => dir,
        None => return Err(OutputError::NoParent(path.to_path_buf())),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
