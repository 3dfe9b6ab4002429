//! Error types for node file operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for node file operations.
pub type NodeResult<T> = Result<T, NodeError>;

/// Errors that can occur while operating on a node file.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The node file could not be opened or created.
    #[error("cannot open node file {}: {source}", path.display())]
    Open {
        /// Path that was being opened.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Another handle holds the exclusive lock on the node file.
    #[error("node file locked: {}", path.display())]
    Locked {
        /// Path of the locked file.
        path: PathBuf,
    },

    /// A positioned read failed or came up short.
    #[error("read of {len} bytes at offset {offset} failed: {source}")]
    Read {
        /// Offset the read started at.
        offset: u64,
        /// Requested length.
        len: usize,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A positioned write failed.
    #[error("write of {len} bytes at offset {offset} failed: {source}")]
    Write {
        /// Offset the write started at.
        offset: u64,
        /// Requested length.
        len: usize,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An I/O error outside a positioned read or write (size, sync).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A slot operation was attempted on node 0.
    #[error("node 0 is the null node and has no slot")]
    NullNode,

    /// Every node number has been handed out.
    #[error("node file is full: no node numbers left")]
    FileFull,

    /// A payload does not fit in a single node.
    #[error("payload of {len} bytes exceeds node capacity of {max}")]
    PayloadTooLarge {
        /// Length of the rejected payload.
        len: usize,
        /// Capacity of a node's payload area.
        max: usize,
    },

    /// The file's chain structure is inconsistent.
    #[error("node file corrupted: {0}")]
    Corrupted(String),
}

impl NodeError {
    /// Creates an open error for `path`.
    pub fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }

    /// Returns true for errors raised by a failed or short read.
    #[must_use]
    pub fn is_read(&self) -> bool {
        matches!(self, Self::Read { .. })
    }
}
