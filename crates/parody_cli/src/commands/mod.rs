//! CLI command implementations.

pub mod alloc;
pub mod free_list;
pub mod inspect;
pub mod verify;

use parody_storage::{Config, NodeFile, NodeResult};
use std::path::Path;

/// Opens an existing node file; maintenance commands never create one.
pub fn open_existing(path: &Path) -> NodeResult<NodeFile> {
    NodeFile::open_with_config(path, Config::new().create_if_missing(false))
}
