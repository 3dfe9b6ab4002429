//! Inspect command implementation.

use super::open_existing;
use parody_storage::NodeNbr;
use serde::Serialize;
use std::path::Path;

/// Node file inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Node file path.
    pub path: String,
    /// File size in bytes.
    pub file_size: u64,
    /// Number of slots present, including a trailing partial slot.
    pub slot_count: u64,
    /// Head of the free list (0 when empty).
    pub deleted_head: NodeNbr,
    /// Allocation watermark.
    pub highest_allocated: NodeNbr,
    /// Number of nodes on the free list, if the chain is readable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_count: Option<usize>,
    /// Allocated nodes not on the free list, if the chain is readable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_count: Option<usize>,
}

/// Gathers statistics for the node file at `path`.
pub fn collect(path: &Path) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let file = open_existing(path)?;
    let header = file.header();
    let free_count = file.free_list().ok().map(|chain| chain.len());

    Ok(InspectResult {
        path: path.display().to_string(),
        file_size: file.size()?,
        slot_count: file.slot_count()?,
        deleted_head: header.deleted_head(),
        highest_allocated: header.highest_allocated(),
        free_count,
        live_count: free_count
            .map(|free| usize::from(header.highest_allocated()).saturating_sub(free)),
    })
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = collect(path)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Node file: {}", result.path);
    println!();
    println!("Header:");
    println!("  Deleted head:      {}", result.deleted_head);
    println!("  Highest allocated: {}", result.highest_allocated);
    println!();
    println!("Storage:");
    println!("  File size:  {} bytes", result.file_size);
    println!("  Slots:      {}", result.slot_count);
    match (result.free_count, result.live_count) {
        (Some(free), Some(live)) => {
            println!("  Free nodes: {free}");
            println!("  Live nodes: {live}");
        }
        _ => println!("  Free list unreadable (run `parody verify`)"),
    }
}
