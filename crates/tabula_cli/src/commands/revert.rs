//! Revert command implementation.

use super::{open_workspace, print_json};
use crate::Format;
use std::path::Path;
use tabula_core::{HistoryId, TableId};

/// Runs the revert command.
pub fn run(
    path: &Path,
    table: &str,
    history_id: &str,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let ws = open_workspace(path)?;
    let summary = ws.revert_history(&TableId::new(table), &HistoryId::new(history_id))?;

    match format {
        Format::Json => print_json(&summary)?,
        Format::Text => {
            println!("Reverted {table} to {history_id}");
            println!("  Inserted:    {}", summary.inserted);
            println!("  Overwritten: {}", summary.overwritten);
            println!("  Deleted:     {}", summary.deleted);
            println!("  Ordered:     {}", summary.ordered);
        }
    }
    Ok(())
}
