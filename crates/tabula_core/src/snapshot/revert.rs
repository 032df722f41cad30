//! Restoring a table from a snapshot.

use crate::error::{CoreError, CoreResult};
use crate::row::Row;
use crate::schema::{validate_schema, TableRecord};
use crate::snapshot::TableSnapshot;
use crate::store::{TableReader, TableStore};
use crate::types::{now_millis, RowId, TableId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Counts of what a revert changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevertSummary {
    /// Rows created from the snapshot.
    pub inserted: usize,
    /// Existing rows whose payload was replaced.
    pub overwritten: usize,
    /// Rows removed because the snapshot lacks them.
    pub deleted: usize,
    /// Length of the restored order.
    pub ordered: usize,
}

/// Restores schema, rows and order from a snapshot in one transaction.
#[derive(Debug)]
pub struct RevertExecutor<'a, S> {
    store: &'a S,
}

impl<'a, S: TableStore> RevertExecutor<'a, S> {
    /// Creates an executor over `store`.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Makes the table match `snapshot`.
    ///
    /// Name and columns are overwritten, rows missing from the snapshot are
    /// deleted, snapshot rows are inserted or have their payload replaced
    /// wholesale, and the order is replaced by `snapshot.order` (or the
    /// snapshot's row sequence). Row creation times of surviving rows are
    /// kept. Any failure leaves the table untouched.
    ///
    /// # Errors
    ///
    /// - [`CoreError::TableNotFound`] if the table no longer exists
    /// - [`CoreError::Validation`] if the snapshot's schema is invalid or it
    ///   lists a row id twice
    /// - the commit error
    pub fn revert_to_snapshot(
        &self,
        table_id: &TableId,
        snapshot: &TableSnapshot,
    ) -> CoreResult<RevertSummary> {
        validate_schema(table_id, &snapshot.name, &snapshot.columns)?;
        reject_duplicates("rows", snapshot.rows.iter().map(|row| &row.id))?;
        if let Some(order) = &snapshot.order {
            reject_duplicates("order", order.iter())?;
        }

        let summary = self.store.transaction(|txn| {
            let record: TableRecord = txn
                .table_record(table_id)?
                .ok_or_else(|| CoreError::table_not_found(table_id))?;
            let existing: HashMap<RowId, Row> = txn
                .rows(table_id)?
                .unwrap_or_default()
                .into_iter()
                .map(|row| (row.id.clone(), row))
                .collect();
            let now = now_millis();
            let mut summary = RevertSummary::default();

            txn.put_table(record.with_schema(&snapshot.name, &snapshot.columns, now)?);

            let desired: HashSet<&RowId> = snapshot.rows.iter().map(|row| &row.id).collect();
            let mut doomed: Vec<&Row> = existing
                .values()
                .filter(|row| !desired.contains(&row.id))
                .collect();
            doomed.sort_by(|a, b| a.id.cmp(&b.id));
            for row in doomed {
                txn.delete_row(table_id.clone(), row.id.clone());
                summary.deleted += 1;
            }

            for snap_row in &snapshot.rows {
                let mut fields = snap_row.fields.clone();
                fields.remove("id");
                match existing.get(&snap_row.id) {
                    Some(current) => {
                        txn.put_row(Row {
                            id: current.id.clone(),
                            table_id: table_id.clone(),
                            fields,
                            created_at: current.created_at,
                            updated_at: now,
                        });
                        summary.overwritten += 1;
                    }
                    None => {
                        txn.put_row(Row::new(table_id.clone(), snap_row.id.clone(), fields, now));
                        summary.inserted += 1;
                    }
                }
            }

            let order = snapshot.effective_order();
            summary.ordered = order.len();
            txn.replace_order(table_id.clone(), order);
            Ok(summary)
        })?;

        debug!(
            table_id = %table_id,
            inserted = summary.inserted,
            overwritten = summary.overwritten,
            deleted = summary.deleted,
            "table reverted"
        );
        Ok(summary)
    }
}

fn reject_duplicates<'r>(what: &str, ids: impl Iterator<Item = &'r RowId>) -> CoreResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(CoreError::validation(format!(
                "row {id} appears more than once in snapshot {what}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::order::RowOrderIndex;
    use crate::row::Fields;
    use crate::schema::{Column, Table};
    use crate::snapshot::{SnapshotEngine, SnapshotRow};
    use crate::store::{Mutation, RecordStore};
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    fn seeded() -> RecordStore {
        let store = RecordStore::in_memory();
        let table = Table {
            id: "t".into(),
            name: "Tasks".into(),
            columns: vec![Column::text("a", "A"), Column::number("n", "N")],
            created_at: 0,
            updated_at: 0,
        };
        store
            .apply(vec![
                Mutation::PutTable(table.to_record().unwrap()),
                Mutation::PutRow(Row::new("t".into(), "r1".into(), fields(json!({"a": "x"})), 1)),
                Mutation::PutRow(Row::new("t".into(), "r2".into(), fields(json!({"a": "y", "n": 2})), 2)),
            ])
            .unwrap();
        store
    }

    #[test]
    fn reverting_to_current_state_is_a_no_op() {
        let store = seeded();
        let config = Config::default();
        RowOrderIndex::new(&store)
            .set_order(&"t".into(), vec!["r2".into(), "r1".into()])
            .unwrap();
        let engine = SnapshotEngine::new(&store, &config);
        let before = engine.capture_snapshot(&"t".into()).unwrap();

        let summary = RevertExecutor::new(&store)
            .revert_to_snapshot(&"t".into(), &before)
            .unwrap();

        assert_eq!(summary.overwritten, 2);
        assert_eq!(summary.inserted + summary.deleted, 0);
        assert_eq!(engine.capture_snapshot(&"t".into()).unwrap(), before);
    }

    #[test]
    fn revert_restores_rows_schema_and_order() {
        let store = seeded();
        let config = Config::default();
        let engine = SnapshotEngine::new(&store, &config);
        let target = engine.capture_snapshot(&"t".into()).unwrap();

        let record = store.table_record(&"t".into()).unwrap().unwrap();
        store
            .apply(vec![
                Mutation::PutTable(
                    record
                        .with_schema("Renamed", &[Column::text("a", "A")], 5)
                        .unwrap(),
                ),
                Mutation::DeleteRow {
                    table_id: "t".into(),
                    row_id: "r1".into(),
                },
                Mutation::PutRow(Row::new("t".into(), "r2".into(), fields(json!({"a": "z"})), 2)),
                Mutation::PutRow(Row::new("t".into(), "r3".into(), fields(json!({"a": "new"})), 3)),
            ])
            .unwrap();

        let summary = RevertExecutor::new(&store)
            .revert_to_snapshot(&"t".into(), &target)
            .unwrap();
        assert_eq!(
            summary,
            RevertSummary {
                inserted: 1,
                overwritten: 1,
                deleted: 1,
                ordered: 2
            }
        );

        let after = engine.capture_snapshot(&"t".into()).unwrap();
        assert_eq!(after.name, "Tasks");
        assert_eq!(after.columns.len(), 2);
        assert_eq!(after.order, Some(vec!["r1".into(), "r2".into()]));
        assert_eq!(after.rows[1].fields, fields(json!({"a": "y", "n": 2})));
    }

    #[test]
    fn payload_is_replaced_not_merged() {
        let store = seeded();
        let snapshot = TableSnapshot {
            id: "t".into(),
            name: "Tasks".into(),
            columns: vec![Column::text("a", "A")],
            rows: vec![SnapshotRow {
                id: "r2".into(),
                fields: fields(json!({"a": "only"})),
            }],
            order: None,
        };

        RevertExecutor::new(&store)
            .revert_to_snapshot(&"t".into(), &snapshot)
            .unwrap();

        let row = store.row(&"t".into(), &"r2".into()).unwrap().unwrap();
        assert_eq!(row.fields, fields(json!({"a": "only"})));
        assert_eq!(row.created_at, 2);
        assert!(store.row(&"t".into(), &"r1".into()).unwrap().is_none());
        assert_eq!(
            RowOrderIndex::new(&store).get_order(&"t".into()).unwrap(),
            vec![RowId::new("r2")]
        );
    }

    #[test]
    fn duplicate_snapshot_rows_are_rejected() {
        let store = seeded();
        let config = Config::default();
        let engine = SnapshotEngine::new(&store, &config);
        let before = engine.capture_snapshot(&"t".into()).unwrap();
        let mut snapshot = before.clone();
        snapshot.rows.push(SnapshotRow {
            id: "r1".into(),
            fields: fields(json!({"a": "again"})),
        });

        let result = RevertExecutor::new(&store).revert_to_snapshot(&"t".into(), &snapshot);
        assert!(matches!(result, Err(CoreError::Validation { .. })));

        snapshot = before.clone();
        snapshot.order = Some(vec!["r1".into(), "r1".into()]);
        let result = RevertExecutor::new(&store).revert_to_snapshot(&"t".into(), &snapshot);
        assert!(matches!(result, Err(CoreError::Validation { .. })));
        assert_eq!(engine.capture_snapshot(&"t".into()).unwrap(), before);
    }

    #[test]
    fn missing_table_is_not_found() {
        let store = seeded();
        let config = Config::default();
        let snapshot = SnapshotEngine::new(&store, &config)
            .capture_snapshot(&"t".into())
            .unwrap();
        store
            .apply(vec![Mutation::DeleteTable {
                table_id: "t".into(),
            }])
            .unwrap();

        let result = RevertExecutor::new(&store).revert_to_snapshot(&"t".into(), &snapshot);
        assert!(matches!(result, Err(CoreError::TableNotFound { .. })));
    }
}
