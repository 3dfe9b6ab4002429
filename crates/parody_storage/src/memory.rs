//! In-memory storage backend for testing.

use crate::backend::StorageBackend;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

/// An in-memory storage backend.
///
/// This backend keeps the whole node file in a `Vec<u8>` and is suitable for:
/// - Unit tests
/// - Benchmarks that should not measure the file system
/// - Scratch node files that don't need persistence
///
/// # Example
///
/// ```rust
/// use parody_storage::{InMemoryBackend, StorageBackend};
/// use std::io::Write;
///
/// let mut backend = InMemoryBackend::new();
/// backend.write_all(b"test data").unwrap();
/// assert_eq!(backend.size().unwrap(), 9);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    cursor: Cursor<Vec<u8>>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory backend with pre-existing data.
    ///
    /// Useful for reopening a node file image captured with [`Self::data`].
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    /// Returns a copy of all data in the backend.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.cursor.get_ref().clone()
    }
}

impl Read for InMemoryBackend {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Write for InMemoryBackend {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.cursor.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        // Nothing is buffered outside the vector
        Ok(())
    }
}

impl Seek for InMemoryBackend {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl StorageBackend for InMemoryBackend {
    fn size(&self) -> io::Result<u64> {
        Ok(self.cursor.get_ref().len() as u64)
    }

    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}
