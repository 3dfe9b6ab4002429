//! # Parody Storage
//!
//! The node-storage layer of the Parody database file format.
//!
//! A node file is a small header followed by fixed-length slots ("nodes")
//! numbered from 1. Each slot starts with a next pointer, so callers can
//! link nodes into chains. Deleted nodes are linked into a free list rooted
//! in the header and are reused before the file grows.
//!
//! ## File Layout
//!
//! ```text
//! offset 0              FileHeader  deleted_head: u16, highest_allocated: u16
//! offset 4              node 1      next: u16, payload: [u8; 126]
//! offset 4 + 128        node 2
//! offset 4 + 128*(n-1)  node n
//! ```
//!
//! All integers are little-endian. Node number 0 terminates every chain.
//! A deleted slot's payload is zeroed except for a leading `0xFF` byte.
//!
//! ## Design Principles
//!
//! - One [`NodeFile`] owns a file for the whole session
//! - [`Node`] handles borrow their file and write back exactly once
//! - Reads and writes share one stream position
//! - Higher layers (indexes, object streams) interpret payloads
//!
//! ## Available Backends
//!
//! - [`FileBackend`] - For persistent storage using OS file APIs
//! - [`InMemoryBackend`] - For testing and scratch files
//!
//! ## Example
//!
//! ```rust
//! use parody_storage::{Node, NodeFile};
//!
//! let file = NodeFile::open_in_memory().unwrap();
//! let number = file.new_node().unwrap();
//!
//! let mut node = Node::acquire(&file, number).unwrap();
//! node.mark_deleted();
//! node.release().unwrap();
//!
//! assert_eq!(file.deleted_head(), number);
//! assert_eq!(file.new_node().unwrap(), number);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod config;
mod error;
mod file;
mod header;
mod memory;
mod node;
mod node_file;

pub use backend::StorageBackend;
pub use config::Config;
pub use error::{NodeError, NodeResult};
pub use file::FileBackend;
pub use header::{FileHeader, NodeNbr, HEADER_LENGTH};
pub use memory::InMemoryBackend;
pub use node::Node;
pub use node_file::{
    node_address, NodeFile, VerifyReport, NODE_DATA_LENGTH, NODE_LENGTH, NODE_POINTER_LENGTH,
    TOMBSTONE,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
