//! Snapshot capture and history catalogue.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::order::merged_view;
use crate::schema::Table;
use crate::snapshot::{HistoryEntry, HistoryEntryMeta, HistoryRequest, SnapshotRow, TableSnapshot};
use crate::store::{TableReader, TableStore};
use crate::types::{now_millis, HistoryId, TableId};
use tracing::debug;

/// Captures table snapshots and manages their history entries.
#[derive(Debug)]
pub struct SnapshotEngine<'a, S> {
    store: &'a S,
    config: &'a Config,
}

impl<'a, S: TableStore> SnapshotEngine<'a, S> {
    /// Creates an engine over `store`.
    pub fn new(store: &'a S, config: &'a Config) -> Self {
        Self { store, config }
    }

    /// Captures the table's schema, rows in display order, and order.
    ///
    /// The captured order is the row id sequence of the merged view, so it is
    /// present even when no explicit order was ever set.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TableNotFound`] if the table is absent, or
    /// [`CoreError::MalformedSchema`] if its column list does not decode.
    pub fn capture_snapshot(&self, table_id: &TableId) -> CoreResult<TableSnapshot> {
        capture(self.store, table_id)
    }

    /// Stores a new immutable history entry and returns its metadata.
    ///
    /// When the request carries no snapshot the current state is captured.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TableNotFound`] if the table is absent, or the
    /// commit error.
    pub fn create_history_entry(
        &self,
        table_id: &TableId,
        request: HistoryRequest,
    ) -> CoreResult<HistoryEntryMeta> {
        let HistoryRequest {
            label,
            source,
            actor,
            snapshot,
        } = request;

        let entry = self.store.transaction(|txn| {
            let snapshot = match snapshot {
                Some(snapshot) => {
                    if txn.table_record(table_id)?.is_none() {
                        return Err(CoreError::table_not_found(table_id));
                    }
                    snapshot
                }
                None => capture(&*txn, table_id)?,
            };
            let entry = HistoryEntry {
                id: HistoryId::generate(),
                table_id: table_id.clone(),
                label,
                source,
                actor,
                snapshot,
                created_at: now_millis(),
            };
            txn.put_history(entry.clone());
            Ok(entry)
        })?;

        debug!(table_id = %table_id, history_id = %entry.id, "history entry created");
        Ok(entry.meta())
    }

    /// Lists history metadata, newest first.
    ///
    /// `limit` defaults to [`Config::default_history_limit`] and is capped at
    /// [`Config::max_history_limit`]. A missing table has no history.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn list_history(
        &self,
        table_id: &TableId,
        limit: Option<usize>,
    ) -> CoreResult<Vec<HistoryEntryMeta>> {
        let limit = self.config.history_limit(limit);
        Ok(self
            .store
            .history_entries(table_id)?
            .iter()
            .take(limit)
            .map(HistoryEntry::meta)
            .collect())
    }

    /// Returns one full history entry.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::HistoryNotFound`] if the entry does not exist or
    /// belongs to another table.
    pub fn get_history_entry(
        &self,
        table_id: &TableId,
        history_id: &HistoryId,
    ) -> CoreResult<HistoryEntry> {
        self.store
            .history_entry(table_id, history_id)?
            .ok_or_else(|| CoreError::HistoryNotFound {
                table_id: table_id.clone(),
                history_id: history_id.clone(),
            })
    }

    /// Deletes every history entry of the table and returns how many there
    /// were. A missing table has nothing to clear.
    ///
    /// # Errors
    ///
    /// Returns the commit error.
    pub fn clear_history(&self, table_id: &TableId) -> CoreResult<usize> {
        let removed = self.store.transaction(|txn| {
            if txn.table_record(table_id)?.is_none() {
                return Ok(0);
            }
            let count = txn.history_entries(table_id)?.len();
            if count > 0 {
                txn.clear_history(table_id.clone());
            }
            Ok(count)
        })?;
        debug!(table_id = %table_id, removed, "history cleared");
        Ok(removed)
    }
}

fn capture<R: TableReader + ?Sized>(reader: &R, table_id: &TableId) -> CoreResult<TableSnapshot> {
    let record = reader
        .table_record(table_id)?
        .ok_or_else(|| CoreError::table_not_found(table_id))?;
    let table = Table::from_record(&record)?;
    let rows = merged_view(reader, table_id)?;

    let order = rows.iter().map(|row| row.id.clone()).collect();
    let rows = rows
        .into_iter()
        .map(|row| SnapshotRow {
            id: row.id,
            fields: row.fields,
        })
        .collect();

    Ok(TableSnapshot {
        id: table.id,
        name: table.name,
        columns: table.columns,
        rows,
        order: Some(order),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::{Fields, Row};
    use crate::schema::{Column, TableRecord};
    use crate::store::{Mutation, RecordStore};
    use serde_json::json;

    fn seeded() -> RecordStore {
        let store = RecordStore::in_memory();
        let table = Table {
            id: "t".into(),
            name: "Tasks".into(),
            columns: vec![Column::text("a", "A")],
            created_at: 0,
            updated_at: 0,
        };
        let fields = |v: &str| -> Fields { json!({"a": v}).as_object().cloned().unwrap() };
        store
            .apply(vec![
                Mutation::PutTable(table.to_record().unwrap()),
                Mutation::PutRow(Row::new("t".into(), "r1".into(), fields("x"), 1)),
                Mutation::PutRow(Row::new("t".into(), "r2".into(), fields("y"), 2)),
            ])
            .unwrap();
        store
    }

    #[test]
    fn capture_includes_schema_rows_and_order() {
        let store = seeded();
        let config = Config::default();
        let snapshot = SnapshotEngine::new(&store, &config)
            .capture_snapshot(&"t".into())
            .unwrap();

        assert_eq!(snapshot.name, "Tasks");
        assert_eq!(snapshot.columns.len(), 1);
        assert_eq!(snapshot.order, Some(vec!["r1".into(), "r2".into()]));
        assert_eq!(snapshot.rows[0].fields["a"], json!("x"));
    }

    #[test]
    fn capture_of_malformed_schema_fails() {
        let store = RecordStore::in_memory();
        store
            .apply(vec![Mutation::PutTable(TableRecord {
                id: "bad".into(),
                name: "Bad".into(),
                columns: json!(42),
                created_at: 0,
                updated_at: 0,
            })])
            .unwrap();
        let config = Config::default();
        let result = SnapshotEngine::new(&store, &config).capture_snapshot(&"bad".into());
        assert!(matches!(result, Err(CoreError::MalformedSchema { .. })));
    }

    #[test]
    fn history_is_newest_first_and_limited() {
        let store = seeded();
        let config = Config::default().max_history_limit(2);
        let engine = SnapshotEngine::new(&store, &config);
        for label in ["one", "two", "three"] {
            engine
                .create_history_entry(&"t".into(), HistoryRequest::labeled(label))
                .unwrap();
        }

        let labels: Vec<String> = engine
            .list_history(&"t".into(), Some(10))
            .unwrap()
            .into_iter()
            .filter_map(|m| m.label)
            .collect();
        assert_eq!(labels, ["three", "two"]);
        assert!(engine.list_history(&"t".into(), Some(0)).unwrap().is_empty());
        assert!(engine.list_history(&"ghost".into(), None).unwrap().is_empty());
    }

    #[test]
    fn history_entry_is_scoped_to_its_table() {
        let store = seeded();
        store
            .apply(vec![Mutation::PutTable(TableRecord {
                id: "other".into(),
                name: "Other".into(),
                columns: json!([]),
                created_at: 0,
                updated_at: 0,
            })])
            .unwrap();
        let config = Config::default();
        let engine = SnapshotEngine::new(&store, &config);
        let meta = engine
            .create_history_entry(&"t".into(), HistoryRequest::default())
            .unwrap();

        assert!(engine.get_history_entry(&"t".into(), &meta.id).is_ok());
        assert!(matches!(
            engine.get_history_entry(&"other".into(), &meta.id),
            Err(CoreError::HistoryNotFound { .. })
        ));
    }

    #[test]
    fn explicit_snapshot_is_stored_verbatim() {
        let store = seeded();
        let config = Config::default();
        let engine = SnapshotEngine::new(&store, &config);
        let snapshot = TableSnapshot {
            id: "t".into(),
            name: "Imported".into(),
            columns: vec![],
            rows: vec![],
            order: None,
        };
        let meta = engine
            .create_history_entry(
                &"t".into(),
                HistoryRequest {
                    source: Some("import".into()),
                    snapshot: Some(snapshot.clone()),
                    ..HistoryRequest::default()
                },
            )
            .unwrap();

        let entry = engine.get_history_entry(&"t".into(), &meta.id).unwrap();
        assert_eq!(entry.snapshot, snapshot);
        assert_eq!(entry.source.as_deref(), Some("import"));
    }

    #[test]
    fn clear_history_reports_count() {
        let store = seeded();
        let config = Config::default();
        let engine = SnapshotEngine::new(&store, &config);
        engine
            .create_history_entry(&"t".into(), HistoryRequest::default())
            .unwrap();
        engine
            .create_history_entry(&"t".into(), HistoryRequest::default())
            .unwrap();

        assert_eq!(engine.clear_history(&"t".into()).unwrap(), 2);
        assert_eq!(engine.clear_history(&"t".into()).unwrap(), 0);
        assert_eq!(engine.clear_history(&"ghost".into()).unwrap(), 0);
    }
}
