//! Checkpoint command implementation.

use super::{open_workspace, print_json};
use crate::Format;
use serde::Serialize;
use std::path::Path;

/// Journal sizes around a checkpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointResult {
    /// Sequence number recorded in the checkpoint.
    pub sequence: u64,
    /// Journal size before, in bytes.
    pub size_before: u64,
    /// Journal size after, in bytes.
    pub size_after: u64,
}

/// Runs the checkpoint command.
pub fn run(path: &Path, format: Format) -> Result<(), Box<dyn std::error::Error>> {
    let ws = open_workspace(path)?;
    let size_before = ws.store().journal_size()?;
    let sequence = ws.checkpoint()?;
    let result = CheckpointResult {
        sequence: sequence.as_u64(),
        size_before,
        size_after: ws.store().journal_size()?,
    };
    ws.close()?;

    match format {
        Format::Json => print_json(&result)?,
        Format::Text => {
            println!("Checkpoint at sequence {}", result.sequence);
            println!(
                "  Journal: {} -> {} bytes",
                result.size_before, result.size_after
            );
        }
    }
    Ok(())
}
