//! History command implementation.

use super::{open_workspace, print_json};
use crate::Format;
use std::path::Path;
use tabula_core::TableId;

/// Runs the history command.
pub fn run(
    path: &Path,
    table: &str,
    limit: Option<usize>,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let ws = open_workspace(path)?;
    let entries = ws.list_history(&TableId::new(table), limit)?;

    match format {
        Format::Json => print_json(&entries)?,
        Format::Text => {
            if entries.is_empty() {
                println!("No history");
            }
            for entry in &entries {
                println!(
                    "{}  {}  {}{}",
                    entry.id,
                    entry.created_at,
                    entry.label.as_deref().unwrap_or("-"),
                    entry
                        .actor
                        .as_deref()
                        .map(|actor| format!(" by {actor}"))
                        .unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}
