//! Verify command implementation.

use super::open_existing;
use parody_storage::VerifyReport;
use std::path::Path;

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying node file at {:?}", path);
    println!();

    let file = open_existing(path)?;
    let report = file.verify()?;
    print_report(&report);

    println!();
    if report.is_ok() {
        println!("✓ Node file verification passed");
        Ok(())
    } else {
        println!("✗ Node file verification failed");
        Err("Verification failed".into())
    }
}

fn print_report(report: &VerifyReport) {
    println!("  Slots checked: {}", report.slot_count);
    println!("  Free nodes:    {}", report.free_nodes.len());

    if !report.problems.is_empty() {
        println!("  Problems:");
        for problem in report.problems.iter().take(10) {
            println!("    - {}", problem);
        }
        if report.problems.len() > 10 {
            println!("    ... and {} more", report.problems.len() - 10);
        }
    }
}
