//! Rows and row order entries.

use crate::types::{RowId, TableId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field payload of a row: column id to arbitrary JSON value.
pub type Fields = Map<String, Value>;

/// A stored row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    /// Row identifier.
    pub id: RowId,
    /// Owning table.
    pub table_id: TableId,
    /// Field payload.
    pub fields: Fields,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last update time.
    pub updated_at: Timestamp,
}

impl Row {
    /// Creates a row stamped with `now` for both timestamps.
    pub fn new(table_id: TableId, id: RowId, fields: Fields, now: Timestamp) -> Self {
        Self {
            id,
            table_id,
            fields,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns a field value.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// Merges top-level keys of `patch` into the payload.
    ///
    /// An `id` key is ignored; a row's id never changes.
    pub fn merge(&mut self, patch: Fields, now: Timestamp) {
        for (key, value) in patch {
            if key != "id" {
                self.fields.insert(key, value);
            }
        }
        self.updated_at = now;
    }
}

/// Explicit position of a row in its table's order overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowOrderEntry {
    /// Owning table.
    pub table_id: TableId,
    /// Positioned row.
    pub row_id: RowId,
    /// Rank; lower sorts first.
    pub position: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_overwrites_only_given_keys() {
        let fields = json!({"a": 1, "b": 2}).as_object().cloned().unwrap();
        let mut row = Row::new("t".into(), "r".into(), fields, 10);

        let patch = json!({"b": 3, "c": 4, "id": "other"}).as_object().cloned().unwrap();
        row.merge(patch, 20);

        assert_eq!(Value::Object(row.fields.clone()), json!({"a": 1, "b": 3, "c": 4}));
        assert_eq!(row.id, RowId::new("r"));
        assert_eq!(row.created_at, 10);
        assert_eq!(row.updated_at, 20);
    }
}
