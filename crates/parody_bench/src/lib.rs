//! Benchmark utilities.

use parody_storage::{Node, NodeFile, NodeNbr, StorageBackend, NODE_DATA_LENGTH};

/// Deterministic payload filling a whole node.
pub fn payload() -> Vec<u8> {
    (0..NODE_DATA_LENGTH).map(|i| (i % 256) as u8).collect()
}

/// Allocates `count` nodes with full payloads and returns their numbers.
pub fn populate<S: StorageBackend>(file: &NodeFile<S>, count: usize) -> Vec<NodeNbr> {
    let data = payload();
    (0..count)
        .map(|_| {
            let number = file.new_node().unwrap();
            let node = Node::acquire(file, number).unwrap();
            node.write_payload(&data).unwrap();
            number
        })
        .collect()
}

/// Frees every node in `nodes`, in order.
pub fn free_all<S: StorageBackend>(file: &NodeFile<S>, nodes: &[NodeNbr]) {
    for &number in nodes {
        let mut node = Node::acquire(file, number).unwrap();
        node.mark_deleted();
        node.release().unwrap();
    }
}
