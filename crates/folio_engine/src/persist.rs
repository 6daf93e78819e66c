use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("cache directory {path:?} unusable: {reason}")]
    CacheDir { path: PathBuf, reason: String },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

fn cache_dir_error(dir: &Path, reason: impl ToString) -> PersistError {
    PersistError::CacheDir {
        path: dir.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Creates `dir` when missing and checks that documents can be written to it.
pub fn ensure_cache_dir(dir: &Path) -> Result<(), PersistError> {
    match fs::metadata(dir) {
        Ok(meta) if !meta.is_dir() => return Err(cache_dir_error(dir, "not a directory")),
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(|e| cache_dir_error(dir, e))?;
        }
        Err(err) => return Err(cache_dir_error(dir, err)),
    }
    NamedTempFile::new_in(dir).map_err(|e| cache_dir_error(dir, e))?;
    Ok(())
}

/// Writes whole files through a temp file in the same directory, so readers
/// never observe a partially written document.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, PersistError> {
        ensure_cache_dir(&self.dir)?;

        let mut staged = NamedTempFile::new_in(&self.dir)?;
        staged.write_all(bytes)?;
        staged.as_file_mut().sync_all()?;

        // `persist` renames over an existing copy.
        let target = self.dir.join(filename);
        staged.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}
