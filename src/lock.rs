use crate::{Error, Result};
use fs4::FileExt;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

const LOCK_FILE_NAME: &str = ".lock";

/// Exclusive advisory lock on a cache root, released on drop.
#[derive(Debug)]
pub struct CacheLock {
    _file: File,
    path: PathBuf,
}

impl CacheLock {
    /// Takes the lock without waiting. Fails with [`Error::CacheLocked`]
    /// if another process holds it.
    pub fn acquire(root: &Path) -> Result<Self> {
        let path = root.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| Error::StorageIo {
                path: path.clone(),
                source,
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!(lock = %path.display(), "cache lock acquired");
                Ok(Self { _file: file, path })
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Err(Error::CacheLocked(root.to_path_buf())),
            Err(source) => Err(Error::StorageIo { path, source }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn second_lock_is_refused_until_first_drops() -> Result<()> {
        let dir = tempdir()?;

        let held = CacheLock::acquire(dir.path())?;
        assert!(held.path().exists());
        assert!(matches!(
            CacheLock::acquire(dir.path()),
            Err(Error::CacheLocked(_))
        ));

        drop(held);
        CacheLock::acquire(dir.path())?;
        Ok(())
    }
}
