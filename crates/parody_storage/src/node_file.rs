//! The node file: header state, positioned I/O, and node allocation.

use crate::backend::StorageBackend;
use crate::config::Config;
use crate::error::{NodeError, NodeResult};
use crate::file::FileBackend;
use crate::header::{FileHeader, NodeNbr, HEADER_LENGTH};
use crate::memory::InMemoryBackend;
use crate::node::Node;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Total size of a node slot in bytes.
pub const NODE_LENGTH: usize = 128;

/// Size of the next-pointer field at the start of every slot.
pub const NODE_POINTER_LENGTH: usize = std::mem::size_of::<NodeNbr>();

/// Size of the payload area following the next pointer.
pub const NODE_DATA_LENGTH: usize = NODE_LENGTH - NODE_POINTER_LENGTH;

/// First payload byte of a deleted slot.
pub const TOMBSTONE: u8 = 0xFF;

/// Returns the byte offset of node `node`'s slot, or `None` for node 0.
#[must_use]
pub const fn node_address(node: NodeNbr) -> Option<u64> {
    if node == 0 {
        None
    } else {
        Some(slot_offset(node))
    }
}

/// Byte offset of a slot; `node` must be non-zero.
pub(crate) const fn slot_offset(node: NodeNbr) -> u64 {
    (node.saturating_sub(1) as u64) * NODE_LENGTH as u64 + HEADER_LENGTH as u64
}

#[derive(Debug, Clone, Copy, Default)]
struct HeaderState {
    live: FileHeader,
    /// Header as last read from or written to the file.
    baseline: FileHeader,
}

/// Outcome of [`NodeFile::verify`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Number of slots present in the file, counting a trailing partial slot.
    pub slot_count: u64,
    /// Free-list chain from head to tail.
    pub free_nodes: Vec<NodeNbr>,
    /// Human-readable descriptions of every inconsistency found.
    pub problems: Vec<String>,
}

impl VerifyReport {
    /// Returns true if no problems were found.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

/// A file of fixed-length nodes with an embedded free list.
///
/// The file starts with a [`FileHeader`] followed by `NODE_LENGTH`-byte
/// slots numbered from 1. Each slot begins with a little-endian next
/// pointer; deleted slots are chained through that pointer from the
/// header's `deleted_head`.
///
/// Reads and writes share one stream position. An operation issued with
/// `offset: None` continues where the previous read or write stopped.
///
/// # Header persistence
///
/// Counter setters only touch the in-memory header. The header reaches
/// the file through [`Self::flush_header`], [`Self::close`], or on drop
/// when [`Config::flush_on_drop`] is set.
///
/// # Example
///
/// ```rust
/// use parody_storage::{Node, NodeFile};
///
/// let file = NodeFile::open_in_memory().unwrap();
/// let number = file.new_node().unwrap();
///
/// let mut node = Node::acquire(&file, number).unwrap();
/// node.set_next(0);
/// node.release().unwrap();
/// assert_eq!(file.highest_allocated(), 1);
/// ```
#[derive(Debug)]
pub struct NodeFile<S: StorageBackend = FileBackend> {
    backend: Mutex<S>,
    header: RwLock<HeaderState>,
    created: bool,
    config: Config,
}

impl NodeFile<FileBackend> {
    /// Opens the node file at `path`, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns `Open` or `Locked` if the file cannot be opened, and `Read`
    /// if an existing file is too short to hold a header.
    pub fn open(path: impl AsRef<Path>) -> NodeResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens the node file at `path` with explicit options.
    ///
    /// # Errors
    ///
    /// See [`Self::open`] and [`FileBackend::open`].
    pub fn open_with_config(path: impl AsRef<Path>, config: Config) -> NodeResult<Self> {
        let path = path.as_ref();
        let backend = FileBackend::open(path, &config)?;
        let file = Self::with_backend(backend, config)?;
        debug!(path = %path.display(), created = file.created, "opened node file");
        Ok(file)
    }

    /// Returns the path of the underlying file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.backend.lock().path().to_path_buf()
    }
}

impl NodeFile<InMemoryBackend> {
    /// Creates an empty node file held entirely in memory.
    ///
    /// # Errors
    ///
    /// Returns an error only if writing the initial header fails.
    pub fn open_in_memory() -> NodeResult<Self> {
        Self::with_backend(InMemoryBackend::new(), Config::default())
    }

    /// Returns a copy of the raw file image.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.backend.lock().data()
    }
}

impl<S: StorageBackend> NodeFile<S> {
    /// Builds a node file on top of an arbitrary backend.
    ///
    /// An empty backend is bootstrapped with a zeroed header; otherwise the
    /// header is read from offset 0 into both the live and baseline copies.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be read or written.
    pub fn with_backend(backend: S, config: Config) -> NodeResult<Self> {
        let created = backend.size()? == 0;
        let file = Self {
            backend: Mutex::new(backend),
            header: RwLock::new(HeaderState::default()),
            created,
            config,
        };

        if created {
            file.write(&FileHeader::new().encode(), Some(0))?;
            debug!("bootstrapped empty node file");
        } else {
            let mut buf = [0u8; HEADER_LENGTH];
            file.read(&mut buf, Some(0))?;
            let header = FileHeader::decode(&buf);
            *file.header.write() = HeaderState {
                live: header,
                baseline: header,
            };
        }

        Ok(file)
    }

    /// Returns true if the file was empty or missing when opened.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.created
    }

    /// Returns the options this file was opened with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Reads exactly `buf.len()` bytes.
    ///
    /// With `Some(offset)` the read starts there; with `None` it continues
    /// from the current stream position. On success the position is left
    /// just past the bytes read. On failure it is restored to where the
    /// read began.
    ///
    /// # Errors
    ///
    /// Returns `Read` on a short read, end of file, or I/O failure.
    pub fn read(&self, buf: &mut [u8], offset: Option<u64>) -> NodeResult<()> {
        read_at(&mut *self.backend.lock(), buf, offset)
    }

    /// Writes all of `buf`.
    ///
    /// Positioning follows the same rules as [`Self::read`]. Writing past
    /// the end of the file extends it.
    ///
    /// # Errors
    ///
    /// Returns `Write` on any I/O failure.
    pub fn write(&self, buf: &[u8], offset: Option<u64>) -> NodeResult<()> {
        write_at(&mut *self.backend.lock(), buf, offset)
    }

    /// Hands out a node number.
    ///
    /// Reuses the head of the free list when there is one, clearing the
    /// reused slot's next pointer. Otherwise returns the node just past
    /// the allocation watermark and advances the watermark.
    ///
    /// The free-list head only moves once the reused slot has been
    /// rewritten, so a failed call leaves the list intact.
    ///
    /// # Errors
    ///
    /// Returns `FileFull` when the watermark is already `NodeNbr::MAX`, or
    /// an I/O error from touching the reused slot.
    pub fn new_node(&self) -> NodeResult<NodeNbr> {
        // Held for the whole pop so no two callers see the same head
        let mut header = self.header.write();
        let head = header.live.deleted_head();
        if head != 0 {
            let mut node = Node::acquire(self, head)?;
            let next = node.next();
            node.set_next(0);
            node.release()?;
            header.live.set_deleted_head(next);
            debug!(node = head, "reused node from free list");
            return Ok(head);
        }

        let node = header
            .live
            .highest_allocated()
            .checked_add(1)
            .ok_or(NodeError::FileFull)?;
        header.live.set_highest_allocated(node);
        debug!(node, "allocated node past watermark");
        Ok(node)
    }

    /// Pushes `node` onto the free list and tombstones its payload.
    ///
    /// The slot's pointer and payload are written under one backend lock,
    /// and the head is updated only after both writes succeed. Returns the
    /// previous head, which is now `node`'s next pointer.
    pub(crate) fn free_slot(&self, node: NodeNbr) -> NodeResult<NodeNbr> {
        let mut header = self.header.write();
        let previous = header.live.deleted_head();

        let mut tombstone = [0u8; NODE_DATA_LENGTH];
        tombstone[0] = TOMBSTONE;
        {
            let mut backend = self.backend.lock();
            write_at(&mut *backend, &previous.to_le_bytes(), Some(slot_offset(node)))?;
            // Continues right after the pointer just written
            write_at(&mut *backend, &tombstone, None)?;
        }

        header.live.set_deleted_head(node);
        Ok(previous)
    }

    /// First node of the free list, or 0.
    #[must_use]
    pub fn deleted_head(&self) -> NodeNbr {
        self.header.read().live.deleted_head()
    }

    /// Sets the free-list head in the live header.
    pub fn set_deleted_head(&self, node: NodeNbr) {
        self.header.write().live.set_deleted_head(node);
    }

    /// Highest node number handed out from the end of the file.
    #[must_use]
    pub fn highest_allocated(&self) -> NodeNbr {
        self.header.read().live.highest_allocated()
    }

    /// Sets the allocation watermark in the live header.
    pub fn set_highest_allocated(&self, node: NodeNbr) {
        self.header.write().live.set_highest_allocated(node);
    }

    /// Returns a copy of the live header.
    #[must_use]
    pub fn header(&self) -> FileHeader {
        self.header.read().live
    }

    /// Returns the header as last read from or written to the file.
    #[must_use]
    pub fn baseline_header(&self) -> FileHeader {
        self.header.read().baseline
    }

    /// Returns true if the live header differs from the one on disk.
    #[must_use]
    pub fn is_header_dirty(&self) -> bool {
        let state = self.header.read();
        state.live != state.baseline
    }

    /// Writes the live header to offset 0 and makes it the new baseline.
    ///
    /// Leaves the stream positioned just past the header.
    ///
    /// # Errors
    ///
    /// Returns `Write` if the header cannot be written, or `Io` if the
    /// follow-up sync fails.
    pub fn flush_header(&self) -> NodeResult<()> {
        let live = self.header();
        self.write(&live.encode(), Some(0))?;
        if self.config.sync_on_flush {
            self.sync()?;
        }
        self.header.write().baseline = live;
        debug!(
            deleted_head = live.deleted_head(),
            highest_allocated = live.highest_allocated(),
            "flushed node file header"
        );
        Ok(())
    }

    /// Flushes a modified header and syncs the file, reporting any failure.
    ///
    /// # Errors
    ///
    /// Returns the first error from the flush or the sync.
    pub fn close(self) -> NodeResult<()> {
        if self.is_header_dirty() {
            self.flush_header()?;
        }
        self.sync()
    }

    /// Syncs all data to durable storage.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the backend fails to sync.
    pub fn sync(&self) -> NodeResult<()> {
        self.backend.lock().sync()?;
        Ok(())
    }

    /// Returns the file size in bytes.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the size cannot be determined.
    pub fn size(&self) -> NodeResult<u64> {
        Ok(self.backend.lock().size()?)
    }

    /// Returns the number of slots in the file, counting a trailing slot
    /// whose payload has not been written yet.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the size cannot be determined.
    pub fn slot_count(&self) -> NodeResult<u64> {
        let body = self.size()?.saturating_sub(HEADER_LENGTH as u64);
        Ok(body.div_ceil(NODE_LENGTH as u64))
    }

    /// Reads the next pointer stored in `node`'s slot without touching
    /// the slot otherwise.
    pub(crate) fn read_pointer(&self, node: NodeNbr) -> NodeResult<NodeNbr> {
        let mut buf = [0u8; NODE_POINTER_LENGTH];
        self.read(&mut buf, Some(slot_offset(node)))?;
        Ok(NodeNbr::from_le_bytes(buf))
    }

    /// Walks the free list from its head.
    ///
    /// Read-only apart from moving the stream position.
    ///
    /// # Errors
    ///
    /// Returns `Corrupted` if the chain leaves the file or loops, and
    /// `Read` if a link cannot be read.
    pub fn free_list(&self) -> NodeResult<Vec<NodeNbr>> {
        let slots = self.slot_count()?;
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.deleted_head();

        while current != 0 {
            if u64::from(current) > slots {
                return Err(NodeError::corrupted(format!(
                    "free list links to node {current} but the file holds {slots} slots"
                )));
            }
            if !seen.insert(current) {
                return Err(NodeError::corrupted(format!(
                    "free list loops back to node {current}"
                )));
            }
            chain.push(current);
            current = self.read_pointer(current)?;
        }

        Ok(chain)
    }

    /// Checks the file's allocation state for consistency.
    ///
    /// Verifies that the watermark covers every slot in the file, that the
    /// free list is a finite chain of allocated nodes, and that every free
    /// slot carries the tombstone byte.
    ///
    /// # Errors
    ///
    /// Only I/O failures are errors; inconsistencies are collected in the
    /// returned report.
    pub fn verify(&self) -> NodeResult<VerifyReport> {
        let header = self.header();
        let mut report = VerifyReport {
            slot_count: self.slot_count()?,
            ..VerifyReport::default()
        };

        if report.slot_count > u64::from(header.highest_allocated()) {
            report.problems.push(format!(
                "file holds {} slots but the highest allocated node is {}",
                report.slot_count,
                header.highest_allocated()
            ));
        }

        let free_nodes = match self.free_list() {
            Ok(nodes) => nodes,
            Err(NodeError::Corrupted(message)) => {
                report.problems.push(message);
                return Ok(report);
            }
            Err(e) => return Err(e),
        };

        for &node in &free_nodes {
            if node > header.highest_allocated() {
                report.problems.push(format!(
                    "free node {node} lies above the highest allocated node {}",
                    header.highest_allocated()
                ));
            }

            let mut marker = [0u8; 1];
            let payload = slot_offset(node) + NODE_POINTER_LENGTH as u64;
            match self.read(&mut marker, Some(payload)) {
                Ok(()) if marker[0] == TOMBSTONE => {}
                Ok(()) => report.problems.push(format!(
                    "free node {node} is missing its tombstone byte (found {:#04x})",
                    marker[0]
                )),
                Err(NodeError::Read { .. }) => report
                    .problems
                    .push(format!("free node {node} has no payload area")),
                Err(e) => return Err(e),
            }
        }

        report.free_nodes = free_nodes;
        Ok(report)
    }
}

impl<S: StorageBackend> Drop for NodeFile<S> {
    fn drop(&mut self) {
        if self.config.flush_on_drop && self.is_header_dirty() {
            if let Err(e) = self.flush_header() {
                warn!(error = %e, "failed to flush node file header on drop");
            }
        }
    }
}

fn position<S: Seek>(backend: &mut S, offset: Option<u64>) -> io::Result<u64> {
    match offset {
        Some(offset) => backend.seek(SeekFrom::Start(offset)),
        None => backend.stream_position(),
    }
}

/// Reads exactly `buf.len()` bytes, restoring the position on failure.
fn read_at<S: StorageBackend>(
    backend: &mut S,
    buf: &mut [u8],
    offset: Option<u64>,
) -> NodeResult<()> {
    let start = position(backend, offset).map_err(|source| NodeError::Read {
        offset: offset.unwrap_or_default(),
        len: buf.len(),
        source,
    })?;

    if let Err(source) = backend.read_exact(buf) {
        let _ = backend.seek(SeekFrom::Start(start));
        return Err(NodeError::Read {
            offset: start,
            len: buf.len(),
            source,
        });
    }

    Ok(())
}

/// Writes all of `buf`, restoring the position on failure.
fn write_at<S: StorageBackend>(backend: &mut S, buf: &[u8], offset: Option<u64>) -> NodeResult<()> {
    let start = position(backend, offset).map_err(|source| NodeError::Write {
        offset: offset.unwrap_or_default(),
        len: buf.len(),
        source,
    })?;

    if let Err(source) = backend.write_all(buf) {
        let _ = backend.seek(SeekFrom::Start(start));
        return Err(NodeError::Write {
            offset: start,
            len: buf.len(),
            source,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn address_of_first_nodes() {
        assert_eq!(node_address(1), Some(4));
        assert_eq!(node_address(2), Some(132));
        assert_eq!(node_address(3), Some(260));
    }

    #[test]
    fn null_node_has_no_address() {
        assert_eq!(node_address(0), None);
    }

    #[test]
    fn bootstrap_in_memory() {
        let file = NodeFile::open_in_memory().unwrap();
        assert!(file.is_new());
        assert_eq!(file.data(), vec![0u8; HEADER_LENGTH]);
        assert_eq!(file.header(), FileHeader::new());
        assert!(!file.is_header_dirty());
    }

    #[test]
    fn existing_header_is_loaded() {
        let image = vec![3, 0, 9, 0];
        let file =
            NodeFile::with_backend(InMemoryBackend::with_data(image), Config::default()).unwrap();

        assert!(!file.is_new());
        assert_eq!(file.deleted_head(), 3);
        assert_eq!(file.highest_allocated(), 9);
        assert_eq!(file.baseline_header(), file.header());
    }

    #[test]
    fn truncated_header_fails_to_open() {
        let result = NodeFile::with_backend(InMemoryBackend::with_data(vec![1, 0]), Config::default());
        assert!(matches!(result, Err(NodeError::Read { .. })));
    }

    #[test]
    fn failed_read_restores_position() {
        let file = NodeFile::open_in_memory().unwrap();
        file.write(&[1, 2, 3, 4], Some(4)).unwrap();

        let mut too_long = [0u8; 16];
        assert!(file.read(&mut too_long, Some(5)).unwrap_err().is_read());

        file.write(&[9], None).unwrap();
        assert_eq!(file.data(), vec![0, 0, 0, 0, 1, 9, 3, 4]);
    }

    #[test]
    fn new_node_advances_watermark() {
        let file = NodeFile::open_in_memory().unwrap();
        assert_eq!(file.new_node().unwrap(), 1);
        assert_eq!(file.new_node().unwrap(), 2);
        assert_eq!(file.highest_allocated(), 2);
        assert!(file.is_header_dirty());
    }

    #[test]
    fn new_node_fails_when_full() {
        let file = NodeFile::open_in_memory().unwrap();
        file.set_highest_allocated(NodeNbr::MAX);
        assert!(matches!(file.new_node(), Err(NodeError::FileFull)));
    }

    #[test]
    fn flush_header_resets_baseline() {
        let file = NodeFile::open_in_memory().unwrap();
        file.set_deleted_head(5);
        file.set_highest_allocated(8);
        assert!(file.is_header_dirty());
        assert_eq!(file.baseline_header(), FileHeader::new());

        file.flush_header().unwrap();
        assert!(!file.is_header_dirty());
        assert_eq!(&file.data()[..HEADER_LENGTH], &[5, 0, 8, 0]);
    }

    #[test]
    fn slot_count_counts_partial_slot() {
        let file = NodeFile::open_in_memory().unwrap();
        assert_eq!(file.slot_count().unwrap(), 0);

        drop(Node::acquire(&file, 1).unwrap());
        assert_eq!(file.slot_count().unwrap(), 1);

        drop(Node::acquire(&file, 3).unwrap());
        assert_eq!(file.slot_count().unwrap(), 3);
    }

    #[test]
    fn free_list_detects_cycle() {
        let file = NodeFile::open_in_memory().unwrap();
        file.set_highest_allocated(2);
        file.write(&2u16.to_le_bytes(), Some(slot_offset(1))).unwrap();
        file.write(&1u16.to_le_bytes(), Some(slot_offset(2))).unwrap();
        file.set_deleted_head(1);

        assert!(matches!(file.free_list(), Err(NodeError::Corrupted(_))));
        let report = file.verify().unwrap();
        assert!(!report.is_ok());
    }

    #[test]
    fn free_list_detects_link_past_end() {
        let file = NodeFile::open_in_memory().unwrap();
        file.set_deleted_head(40);
        assert!(matches!(file.free_list(), Err(NodeError::Corrupted(_))));
    }

    #[test]
    fn verify_clean_file() {
        let file = NodeFile::open_in_memory().unwrap();
        for _ in 0..4 {
            let number = file.new_node().unwrap();
            let node = Node::acquire(&file, number).unwrap();
            node.write_payload(b"payload").unwrap();
            node.release().unwrap();
        }
        let mut node = Node::acquire(&file, 2).unwrap();
        node.mark_deleted();
        node.release().unwrap();

        let report = file.verify().unwrap();
        assert!(report.is_ok(), "{:?}", report.problems);
        assert_eq!(report.slot_count, 4);
        assert_eq!(report.free_nodes, vec![2]);
    }

    #[test]
    fn verify_reports_missing_tombstone() {
        let file = NodeFile::open_in_memory().unwrap();
        let number = file.new_node().unwrap();
        let mut node = Node::acquire(&file, number).unwrap();
        node.mark_deleted();
        node.release().unwrap();

        file.write(&[0], Some(slot_offset(number) + NODE_POINTER_LENGTH as u64))
            .unwrap();

        let report = file.verify().unwrap();
        assert_eq!(report.problems.len(), 1);
        assert!(report.problems[0].contains("tombstone"));
    }

    #[test]
    fn verify_reports_slots_above_watermark() {
        let file = NodeFile::open_in_memory().unwrap();
        drop(Node::acquire(&file, 2).unwrap());
        let report = file.verify().unwrap();
        assert!(!report.is_ok());
    }

    #[test]
    fn close_persists_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("close.nodes");

        let file = NodeFile::open_with_config(&path, Config::new().flush_on_drop(false)).unwrap();
        file.new_node().unwrap();
        file.close().unwrap();

        let reopened = NodeFile::open(&path).unwrap();
        assert_eq!(reopened.highest_allocated(), 1);
        assert_eq!(reopened.path(), path);
    }

    #[test]
    fn concurrent_allocations_are_distinct() {
        let file = NodeFile::open_in_memory().unwrap();
        let nodes: Vec<NodeNbr> = (0..64).map(|_| file.new_node().unwrap()).collect();
        for &number in &nodes {
            let mut node = Node::acquire(&file, number).unwrap();
            node.mark_deleted();
        }

        let mut handed_out: Vec<NodeNbr> = std::thread::scope(|scope| {
            let file = &file;
            let workers: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(move || {
                        (0..16)
                            .map(|_| file.new_node().unwrap())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            workers
                .into_iter()
                .flat_map(|worker| worker.join().unwrap())
                .collect()
        });

        handed_out.sort_unstable();
        assert_eq!(handed_out, nodes);
        assert_eq!(file.deleted_head(), 0);
        assert_eq!(file.highest_allocated(), 64);
    }

    #[test]
    fn concurrent_frees_keep_tombstones_in_place() {
        let file = NodeFile::open_in_memory().unwrap();
        for _ in 0..64 {
            let number = file.new_node().unwrap();
            let node = Node::acquire(&file, number).unwrap();
            node.write_payload(&[0xAB; NODE_DATA_LENGTH]).unwrap();
        }

        std::thread::scope(|scope| {
            for worker in 0..4u16 {
                let file = &file;
                scope.spawn(move || {
                    for number in (1..=64u16).filter(|n| n % 4 == worker) {
                        let mut node = Node::acquire(file, number).unwrap();
                        node.mark_deleted();
                        node.release().unwrap();
                    }
                });
            }
        });

        let report = file.verify().unwrap();
        assert!(report.is_ok(), "{:?}", report.problems);
        assert_eq!(report.free_nodes.len(), 64);
    }

    proptest! {
        #[test]
        fn address_is_strictly_increasing(n in 1u16..u16::MAX) {
            prop_assert_eq!(
                node_address(n),
                Some((u64::from(n) - 1) * NODE_LENGTH as u64 + HEADER_LENGTH as u64)
            );
            prop_assert!(node_address(n + 1) > node_address(n));
        }
    }
}
