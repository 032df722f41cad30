//! Snapshot command implementation.

use super::{open_workspace, print_json};
use crate::Format;
use std::path::Path;
use tabula_core::{HistoryRequest, TableId};

/// Source tag stored on entries recorded from the command line.
const SOURCE: &str = "cli";

/// Runs the snapshot command.
pub fn run(
    path: &Path,
    table: &str,
    label: Option<String>,
    actor: Option<String>,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let ws = open_workspace(path)?;
    let meta = ws.create_history(
        &TableId::new(table),
        HistoryRequest {
            label,
            source: Some(SOURCE.to_string()),
            actor,
            snapshot: None,
        },
    )?;

    match format {
        Format::Json => print_json(&meta)?,
        Format::Text => println!("Recorded history entry {}", meta.id),
    }
    Ok(())
}
