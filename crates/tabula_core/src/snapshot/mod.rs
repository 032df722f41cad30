//! Table snapshots, history entries and revert.
//!
//! A [`TableSnapshot`] captures one table's schema, row payloads and row order
//! at one instant. [`HistoryEntry`] wraps a snapshot with metadata and is
//! immutable once written. The [`SnapshotEngine`] captures and catalogues
//! snapshots; the [`RevertExecutor`] restores one in a single transaction.

mod engine;
mod revert;

pub use engine::SnapshotEngine;
pub use revert::{RevertExecutor, RevertSummary};

use crate::row::Fields;
use crate::schema::Column;
use crate::types::{HistoryId, RowId, TableId, Timestamp};
use serde::{Deserialize, Serialize};

/// A row as captured in a snapshot: its id plus its full field payload.
///
/// Serialized flat, e.g. `{"id": "r1", "a": "x"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    /// Row identifier.
    pub id: RowId,
    /// Field payload.
    #[serde(flatten)]
    pub fields: Fields,
}

/// A table's schema, rows and order at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSnapshot {
    /// Table identifier at capture time.
    pub id: TableId,
    /// Table name at capture time.
    pub name: String,
    /// Column definitions.
    pub columns: Vec<Column>,
    /// Rows in canonical table order.
    pub rows: Vec<SnapshotRow>,
    /// Row order; when absent, the order of `rows` is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Vec<RowId>>,
}

impl TableSnapshot {
    /// Returns the order to restore: `order` if present, else the row sequence.
    #[must_use]
    pub fn effective_order(&self) -> Vec<RowId> {
        match &self.order {
            Some(order) => order.clone(),
            None => self.rows.iter().map(|r| r.id.clone()).collect(),
        }
    }
}

/// An immutable history record wrapping a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Entry identifier.
    pub id: HistoryId,
    /// Owning table.
    pub table_id: TableId,
    /// Free-form label, e.g. "before import".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// What produced the entry, e.g. "manual" or "revert".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Who produced the entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// Captured state.
    pub snapshot: TableSnapshot,
    /// Creation time.
    pub created_at: Timestamp,
}

impl HistoryEntry {
    /// Returns the entry's metadata without the snapshot body.
    #[must_use]
    pub fn meta(&self) -> HistoryEntryMeta {
        HistoryEntryMeta {
            id: self.id.clone(),
            table_id: self.table_id.clone(),
            label: self.label.clone(),
            source: self.source.clone(),
            actor: self.actor.clone(),
            created_at: self.created_at,
        }
    }
}

/// History entry metadata, as returned by list and create calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntryMeta {
    /// Entry identifier.
    pub id: HistoryId,
    /// Owning table.
    pub table_id: TableId,
    /// Free-form label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// What produced the entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Who produced the entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// Creation time.
    pub created_at: Timestamp,
}

/// Caller input for creating a history entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRequest {
    /// Free-form label.
    #[serde(default)]
    pub label: Option<String>,
    /// What produced the entry.
    #[serde(default)]
    pub source: Option<String>,
    /// Who produced the entry.
    #[serde(default)]
    pub actor: Option<String>,
    /// Snapshot to store; the current state is captured when absent.
    #[serde(default)]
    pub snapshot: Option<TableSnapshot>,
}

impl HistoryRequest {
    /// A request carrying only a label.
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_rows_serialize_flat() {
        let snapshot = TableSnapshot {
            id: "T".into(),
            name: "Tasks".into(),
            columns: vec![Column::text("a", "A")],
            rows: vec![SnapshotRow {
                id: "r1".into(),
                fields: json!({"a": "x"}).as_object().cloned().unwrap(),
            }],
            order: Some(vec!["r1".into()]),
        };

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["rows"], json!([{"id": "r1", "a": "x"}]));
        assert_eq!(value["order"], json!(["r1"]));

        let back: TableSnapshot = serde_json::from_value(value).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn effective_order_falls_back_to_rows() {
        let snapshot: TableSnapshot = serde_json::from_value(json!({
            "id": "T", "name": "T", "columns": [],
            "rows": [{"id": "b"}, {"id": "a"}]
        }))
        .unwrap();
        assert_eq!(snapshot.effective_order(), vec![RowId::new("b"), RowId::new("a")]);
    }

    #[test]
    fn meta_has_no_snapshot_field() {
        let entry = HistoryEntry {
            id: "h".into(),
            table_id: "T".into(),
            label: Some("l".into()),
            source: None,
            actor: None,
            snapshot: TableSnapshot {
                id: "T".into(),
                name: "T".into(),
                columns: vec![],
                rows: vec![],
                order: None,
            },
            created_at: 5,
        };
        let value = serde_json::to_value(entry.meta()).unwrap();
        assert!(value.get("snapshot").is_none());
        assert_eq!(value["label"], json!("l"));
    }
}
