//! Reference resolution.
//!
//! Tables point at each other only through weak `dictRef` and `relation`
//! entries in their column definitions. Nothing enforces them, so the only
//! way to learn who depends on a table or column is to scan every schema.

use crate::schema::{Column, TableRecord};
use crate::types::{ColumnId, TableId};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// How a referencing column points at its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceKind {
    /// Through the column's `dictRef`.
    DictRef,
    /// Through the column's `relation`.
    Relation,
}

/// A column in some table that points at the queried table or column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    /// Table holding the referencing column.
    pub table_id: TableId,
    /// Its display name.
    pub table_name: String,
    /// Referencing column.
    pub column_id: ColumnId,
    /// Its display name.
    pub column_name: String,
    /// Reference type.
    #[serde(rename = "type")]
    pub kind: ReferenceKind,
}

impl Reference {
    fn new(table: &TableRecord, column: &Column, kind: ReferenceKind) -> Self {
        Self {
            table_id: table.id.clone(),
            table_name: table.name.clone(),
            column_id: column.id.clone(),
            column_name: column.name.clone(),
            kind,
        }
    }
}

/// Finds every column that points at `target_table`, or at
/// `target_column` within it when given.
///
/// A column matches through its `dictRef` when the reference names the table
/// (and the column, if filtered), and through its `relation` when the
/// relation targets the table (and uses the column as key or display column,
/// if filtered). A column matching both ways yields two entries.
///
/// Results follow table order, then column order. Tables whose column list
/// cannot be decoded are skipped with a warning.
#[must_use]
pub fn find_references(
    tables: &[TableRecord],
    target_table: &TableId,
    target_column: Option<&ColumnId>,
) -> Vec<Reference> {
    let mut references = Vec::new();

    for table in tables {
        let columns = match table.decode_columns() {
            Ok(columns) => columns,
            Err(e) => {
                warn!(table_id = %table.id, error = %e, "skipping table with malformed schema");
                continue;
            }
        };

        for column in &columns {
            if let Some(dict_ref) = &column.dict_ref {
                if &dict_ref.table_id == target_table
                    && target_column.map_or(true, |c| &dict_ref.column_id == c)
                {
                    references.push(Reference::new(table, column, ReferenceKind::DictRef));
                }
            }

            if let Some(relation) = &column.relation {
                if &relation.target_table_id == target_table
                    && target_column.map_or(true, |c| relation.touches_column(c))
                {
                    references.push(Reference::new(table, column, ReferenceKind::Relation));
                }
            }
        }
    }

    references
}
