//! References command implementation.

use super::{open_workspace, print_json};
use crate::Format;
use std::path::Path;
use tabula_core::{ColumnId, ReferenceKind, TableId};

/// Runs the references command.
pub fn run(
    path: &Path,
    table: &str,
    column: Option<&str>,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let ws = open_workspace(path)?;
    let column = column.map(ColumnId::new);
    let references = ws.references(&TableId::new(table), column.as_ref())?;

    match format {
        Format::Json => print_json(&references)?,
        Format::Text => {
            if references.is_empty() {
                println!("No references");
            }
            for reference in &references {
                let kind = match reference.kind {
                    ReferenceKind::DictRef => "dictRef",
                    ReferenceKind::Relation => "relation",
                };
                println!(
                    "{}.{} ({} / {}) via {}",
                    reference.table_id,
                    reference.column_id,
                    reference.table_name,
                    reference.column_name,
                    kind
                );
            }
        }
    }
    Ok(())
}
