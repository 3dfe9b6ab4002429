//! The header record at the front of every node file.

/// A node number. `0` means "no node" and terminates every chain.
pub type NodeNbr = u16;

/// Size of the encoded header in bytes.
pub const HEADER_LENGTH: usize = 4;

/// Allocation counters persisted at offset 0 of a node file.
///
/// Encoded as two little-endian `u16` values:
///
/// ```text
/// ┌──────────────┬───────────────────┐
/// │ deleted_head │ highest_allocated │
/// │   2 bytes    │      2 bytes      │
/// └──────────────┴───────────────────┘
/// ```
///
/// The record does no validation; [`crate::NodeFile`] owns the invariants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileHeader {
    deleted_head: NodeNbr,
    highest_allocated: NodeNbr,
}

impl FileHeader {
    /// Creates a header with both counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            deleted_head: 0,
            highest_allocated: 0,
        }
    }

    /// First node of the free list, or 0 when the list is empty.
    #[must_use]
    pub const fn deleted_head(&self) -> NodeNbr {
        self.deleted_head
    }

    /// Sets the free-list head.
    pub fn set_deleted_head(&mut self, node: NodeNbr) {
        self.deleted_head = node;
    }

    /// Highest node number handed out from the end of the file.
    #[must_use]
    pub const fn highest_allocated(&self) -> NodeNbr {
        self.highest_allocated
    }

    /// Sets the allocation watermark.
    pub fn set_highest_allocated(&mut self, node: NodeNbr) {
        self.highest_allocated = node;
    }

    /// Encodes the header to its on-disk form.
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_LENGTH] {
        let mut buf = [0u8; HEADER_LENGTH];
        buf[0..2].copy_from_slice(&self.deleted_head.to_le_bytes());
        buf[2..4].copy_from_slice(&self.highest_allocated.to_le_bytes());
        buf
    }

    /// Decodes a header from its on-disk form.
    #[must_use]
    pub fn decode(buf: &[u8; HEADER_LENGTH]) -> Self {
        Self {
            deleted_head: u16::from_le_bytes([buf[0], buf[1]]),
            highest_allocated: u16::from_le_bytes([buf[2], buf[3]]),
        }
    }
}
