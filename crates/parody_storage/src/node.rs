//! Scoped handles over single node slots.

use crate::backend::StorageBackend;
use crate::error::{NodeError, NodeResult};
use crate::file::FileBackend;
use crate::header::NodeNbr;
use crate::node_file::{node_address, slot_offset, NodeFile, NODE_DATA_LENGTH, NODE_POINTER_LENGTH};
use std::fmt;
use tracing::{debug, trace, warn};

/// A handle to one slot of a [`NodeFile`].
///
/// Acquiring a handle reads the slot's next pointer. Changes are kept in
/// memory and written back once, when the handle is released, either
/// explicitly through [`Node::release`] or implicitly on drop. A handle
/// that was neither changed nor marked deleted performs no I/O on release.
///
/// Releasing a handle marked deleted pushes the slot onto the file's free
/// list and overwrites its payload with a tombstone: a `0xFF` byte followed
/// by zeros.
///
/// # Example
///
/// ```rust
/// use parody_storage::{Node, NodeFile};
///
/// let file = NodeFile::open_in_memory().unwrap();
/// let first = file.new_node().unwrap();
/// let second = file.new_node().unwrap();
///
/// let mut node = Node::acquire(&file, first).unwrap();
/// node.set_next(second);
/// node.release().unwrap();
///
/// assert_eq!(Node::acquire(&file, first).unwrap().next(), second);
/// ```
pub struct Node<'a, S: StorageBackend = FileBackend> {
    /// `None` once the handle has been written back.
    owner: Option<&'a NodeFile<S>>,
    number: NodeNbr,
    next: NodeNbr,
    changed: bool,
    marked_for_deletion: bool,
}

impl<'a, S: StorageBackend> Node<'a, S> {
    /// Acquires a handle to node `number` of `owner`.
    ///
    /// Node 0 yields an inert handle that never touches the file. A slot
    /// that cannot be read yet, typically because it lies past the end of
    /// the file, is materialised by writing a zero next pointer.
    ///
    /// # Errors
    ///
    /// Returns `Write` if materialising a new slot fails.
    pub fn acquire(owner: &'a NodeFile<S>, number: NodeNbr) -> NodeResult<Self> {
        let next = if number == 0 {
            0
        } else {
            match owner.read_pointer(number) {
                Ok(next) => next,
                Err(NodeError::Read { .. }) => {
                    trace!(node = number, "materialising node slot");
                    owner.write(&[0u8; NODE_POINTER_LENGTH], Some(slot_offset(number)))?;
                    0
                }
                Err(e) => return Err(e),
            }
        };

        Ok(Self {
            owner: Some(owner),
            number,
            next,
            changed: false,
            marked_for_deletion: false,
        })
    }

    /// This node's number.
    #[must_use]
    pub fn number(&self) -> NodeNbr {
        self.number
    }

    /// The next node in this node's chain, or 0.
    #[must_use]
    pub fn next(&self) -> NodeNbr {
        self.next
    }

    /// Returns true if the handle will write back its next pointer.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Returns true if the slot will be freed on release.
    #[must_use]
    pub fn is_marked_deleted(&self) -> bool {
        self.marked_for_deletion
    }

    /// Byte offset of this node's slot, or `None` for node 0.
    #[must_use]
    pub fn address(&self) -> Option<u64> {
        node_address(self.number)
    }

    /// Points this node at `node` and marks it changed.
    pub fn set_next(&mut self, node: NodeNbr) {
        self.next = node;
        self.mark_changed();
    }

    /// Forces a write-back on release.
    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    /// Requests that the slot be returned to the free list on release.
    pub fn mark_deleted(&mut self) {
        self.marked_for_deletion = true;
    }

    /// Reads the slot's payload area.
    ///
    /// # Errors
    ///
    /// Returns `NullNode` for node 0, and `Read` if the payload has never
    /// been written (the slot only holds its next pointer).
    pub fn read_payload(&self) -> NodeResult<Vec<u8>> {
        let (owner, payload) = self.payload_location()?;
        let mut buf = vec![0u8; NODE_DATA_LENGTH];
        owner.read(&mut buf, Some(payload))?;
        Ok(buf)
    }

    /// Writes `data` at the start of the slot's payload area immediately.
    ///
    /// # Errors
    ///
    /// Returns `PayloadTooLarge` if `data` exceeds the payload area,
    /// `NullNode` for node 0, and `Write` on I/O failure.
    pub fn write_payload(&self, data: &[u8]) -> NodeResult<()> {
        if data.len() > NODE_DATA_LENGTH {
            return Err(NodeError::PayloadTooLarge {
                len: data.len(),
                max: NODE_DATA_LENGTH,
            });
        }
        let (owner, payload) = self.payload_location()?;
        owner.write(data, Some(payload))
    }

    /// Writes back the handle's state and reports any failure.
    ///
    /// # Errors
    ///
    /// Returns `Write` if the next pointer or tombstone cannot be written.
    pub fn release(mut self) -> NodeResult<()> {
        self.write_back()
    }

    fn payload_location(&self) -> NodeResult<(&'a NodeFile<S>, u64)> {
        match (self.owner, self.address()) {
            (Some(owner), Some(address)) => Ok((owner, address + NODE_POINTER_LENGTH as u64)),
            _ => Err(NodeError::NullNode),
        }
    }

    fn write_back(&mut self) -> NodeResult<()> {
        let Some(owner) = self.owner.take() else {
            return Ok(());
        };
        if self.number == 0 || !(self.changed || self.marked_for_deletion) {
            return Ok(());
        }

        if self.marked_for_deletion {
            self.next = owner.free_slot(self.number)?;
            debug!(node = self.number, next = self.next, "freed node");
        } else {
            owner.write(&self.next.to_le_bytes(), Some(slot_offset(self.number)))?;
        }

        Ok(())
    }
}

impl<S: StorageBackend> Drop for Node<'_, S> {
    fn drop(&mut self) {
        if let Err(e) = self.write_back() {
            warn!(node = self.number, error = %e, "node write-back failed");
        }
    }
}

impl<S: StorageBackend> fmt::Debug for Node<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("number", &self.number)
            .field("next", &self.next)
            .field("changed", &self.changed)
            .field("marked_for_deletion", &self.marked_for_deletion)
            .field("released", &self.owner.is_none())
            .finish()
    }
}
