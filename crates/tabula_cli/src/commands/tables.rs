//! Tables command implementation.

use super::{open_workspace, print_json};
use crate::Format;
use std::path::Path;
use tabula_core::{Column, ColumnKind};

/// Runs the tables command.
pub fn run(path: &Path, format: Format) -> Result<(), Box<dyn std::error::Error>> {
    let ws = open_workspace(path)?;
    let tables = ws.list_tables()?;

    match format {
        Format::Json => print_json(&tables)?,
        Format::Text => {
            if tables.is_empty() {
                println!("No tables");
            }
            for table in &tables {
                println!("{} ({})", table.name, table.id);
                for column in &table.columns {
                    println!("  {}", describe_column(column));
                }
            }
        }
    }
    Ok(())
}

fn describe_column(column: &Column) -> String {
    let mut line = format!("{:<20} {:<10} {}", column.name, kind_name(&column.kind), column.id);
    if let Some(dict_ref) = &column.dict_ref {
        line.push_str(&format!("  dictRef -> {}.{}", dict_ref.table_id, dict_ref.column_id));
    }
    if let Some(relation) = &column.relation {
        line.push_str(&format!(
            "  relation -> {}.{}",
            relation.target_table_id, relation.target_column_id
        ));
    }
    line
}

fn kind_name(kind: &ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Text => "text",
        ColumnKind::Number => "number",
        ColumnKind::Date => "date",
        ColumnKind::Checkbox => "checkbox",
        ColumnKind::Url => "url",
        ColumnKind::Email => "email",
        ColumnKind::File => "file",
        ColumnKind::Select { .. } => "select",
        ColumnKind::Relation => "relation",
    }
}
