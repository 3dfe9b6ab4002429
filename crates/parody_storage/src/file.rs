//! File-based storage backend for persistent node files.

use crate::backend::StorageBackend;
use crate::config::Config;
use crate::error::{NodeError, NodeResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A file-based storage backend.
///
/// The file is opened for combined reading and writing. When locking is
/// enabled an exclusive advisory lock is held for the backend's lifetime,
/// so only one node file can own a given path at a time.
///
/// # Example
///
/// ```no_run
/// use parody_storage::{Config, FileBackend};
/// use std::path::Path;
///
/// let backend = FileBackend::open(Path::new("data.nodes"), &Config::default()).unwrap();
/// assert_eq!(backend.path(), Path::new("data.nodes"));
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: File,
}

impl FileBackend {
    /// Opens or creates a file backend at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file is missing and `create_if_missing` is false
    /// - The file exists and `error_if_exists` is true
    /// - The file cannot be opened or created
    /// - Locking is enabled and another handle holds the lock (`Locked`)
    pub fn open(path: &Path, config: &Config) -> NodeResult<Self> {
        let mut options = OpenOptions::new();
        options.read(true).write(true).truncate(false);

        if config.error_if_exists {
            options.create_new(true);
        } else {
            options.create(config.create_if_missing);
        }

        let file = options
            .open(path)
            .map_err(|e| NodeError::open(path, e))?;

        if config.lock && file.try_lock_exclusive().is_err() {
            return Err(NodeError::Locked {
                path: path.to_path_buf(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for FileBackend {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for FileBackend {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for FileBackend {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl StorageBackend for FileBackend {
    fn size(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn sync(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.file.sync_all()
    }
}
