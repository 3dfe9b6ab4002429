//! Alloc and free command implementations.

use super::open_existing;
use parody_storage::{Node, NodeFile, NodeNbr, NodeResult};
use std::path::Path;
use tracing::info;

/// Allocates `count` nodes, materialising each slot, and persists the header.
pub fn allocate(path: &Path, count: usize) -> NodeResult<Vec<NodeNbr>> {
    let file = NodeFile::open(path)?;
    let mut nodes = Vec::with_capacity(count);

    for _ in 0..count {
        let number = file.new_node()?;
        Node::acquire(&file, number)?.release()?;
        nodes.push(number);
    }

    file.close()?;
    Ok(nodes)
}

/// Runs the alloc command.
pub fn run(path: &Path, count: usize) -> Result<(), Box<dyn std::error::Error>> {
    let nodes = allocate(path, count)?;
    info!(count = nodes.len(), "allocated nodes");

    for node in nodes {
        println!("{node}");
    }

    Ok(())
}

/// Marks `node` deleted, releases it, and persists the header.
pub fn free(path: &Path, node: NodeNbr) -> Result<(), Box<dyn std::error::Error>> {
    if node == 0 {
        return Err("node 0 is the null node".into());
    }

    let file = open_existing(path)?;
    if node > file.highest_allocated() {
        return Err(format!(
            "node {node} was never allocated (highest is {})",
            file.highest_allocated()
        )
        .into());
    }
    if file.free_list()?.contains(&node) {
        return Err(format!("node {node} is already free").into());
    }

    let mut handle = Node::acquire(&file, node)?;
    handle.mark_deleted();
    handle.release()?;
    file.close()?;

    info!(node, "freed node");
    Ok(())
}
