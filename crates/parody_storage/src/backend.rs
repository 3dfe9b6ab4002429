//! Storage backend trait definition.

use std::io::{self, Read, Seek, Write};

/// A byte store underneath a [`crate::NodeFile`].
///
/// Backends are plain seekable streams. They know nothing about headers,
/// nodes, or free lists; the node file owns all layout interpretation.
///
/// # Invariants
///
/// - Reads and writes share a single stream position, so a write issued
///   without a seek lands right after the bytes last read, and vice versa
/// - Writing past the end extends the store, zero-filling any gap
/// - `read_exact` past the end fails with [`io::ErrorKind::UnexpectedEof`]
///
/// # Implementors
///
/// - [`super::FileBackend`] - For persistent storage
/// - [`super::InMemoryBackend`] - For testing
pub trait StorageBackend: Read + Write + Seek + Send {
    /// Returns the current size of the store in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> io::Result<u64>;

    /// Syncs all data and metadata to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&mut self) -> io::Result<()>;
}
