//! Rows command implementation.

use super::{open_workspace, print_json};
use crate::Format;
use serde_json::Value;
use std::path::Path;
use tabula_core::TableId;

/// Runs the rows command.
pub fn run(path: &Path, table: &str, format: Format) -> Result<(), Box<dyn std::error::Error>> {
    let ws = open_workspace(path)?;
    let rows = ws.list_rows(&TableId::new(table))?;

    match format {
        Format::Json => print_json(&rows)?,
        Format::Text => {
            println!("{} rows", rows.len());
            for row in &rows {
                println!("{}  {}", row.id, Value::Object(row.fields.clone()));
            }
        }
    }
    Ok(())
}
