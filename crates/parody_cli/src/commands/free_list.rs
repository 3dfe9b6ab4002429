//! Free-list command implementation.

use super::open_existing;
use parody_storage::NodeNbr;
use std::path::Path;

/// Formats a free-list chain as `head -> ... -> 0`.
pub fn format_chain(chain: &[NodeNbr]) -> String {
    chain
        .iter()
        .map(NodeNbr::to_string)
        .chain(std::iter::once("0".to_string()))
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Runs the free-list command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let file = open_existing(path)?;
    let chain = file.free_list()?;

    println!("Free nodes: {}", chain.len());
    println!("{}", format_chain(&chain));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_chain_is_terminator() {
        assert_eq!(format_chain(&[]), "0");
    }

    #[test]
    fn chain_ends_in_terminator() {
        assert_eq!(format_chain(&[3, 2]), "3 -> 2 -> 0");
    }
}
