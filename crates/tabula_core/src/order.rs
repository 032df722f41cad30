//! Row ordering.
//!
//! Rows are stored in insertion order. The order index overlays an explicit,
//! user-chosen sequence: rows with a position come first by position, rows
//! without one follow in creation order.

use crate::error::{CoreError, CoreResult};
use crate::row::{Row, RowOrderEntry};
use crate::store::{TableReader, TableStore};
use crate::types::{RowId, TableId};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Reads and replaces a table's row order.
#[derive(Debug)]
pub struct RowOrderIndex<'a, S> {
    store: &'a S,
}

impl<'a, S: TableStore> RowOrderIndex<'a, S> {
    /// Creates an index over `store`.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Returns the explicitly ordered row ids, positions ascending.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn get_order(&self, table_id: &TableId) -> CoreResult<Vec<RowId>> {
        Ok(self
            .store
            .order_entries(table_id)?
            .into_iter()
            .map(|entry| entry.row_id)
            .collect())
    }

    /// Replaces the table's whole order with `row_ids`, position = index.
    ///
    /// Runs as one transaction: either the new order is stored completely or
    /// the old one is kept.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TableNotFound`] if the table is absent,
    /// [`CoreError::Validation`] if a row id is listed twice, or the commit
    /// error.
    pub fn set_order(&self, table_id: &TableId, row_ids: Vec<RowId>) -> CoreResult<()> {
        let count = row_ids.len();
        self.store.transaction(|txn| {
            if txn.table_record(table_id)?.is_none() {
                return Err(CoreError::table_not_found(table_id));
            }
            let mut seen = HashSet::with_capacity(count);
            if let Some(dup) = row_ids.iter().find(|id| !seen.insert(*id)) {
                return Err(CoreError::validation(format!(
                    "row {dup} appears more than once in the order"
                )));
            }
            txn.replace_order(table_id.clone(), row_ids);
            Ok(())
        })?;
        debug!(table_id = %table_id, rows = count, "row order replaced");
        Ok(())
    }

    /// Returns the table's rows in display order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TableNotFound`] if the table is absent.
    pub fn merged_row_view(&self, table_id: &TableId) -> CoreResult<Vec<Row>> {
        merged_view(self.store, table_id)
    }
}

/// Reads rows and order entries from `reader` and merges them.
pub(crate) fn merged_view<R: TableReader + ?Sized>(
    reader: &R,
    table_id: &TableId,
) -> CoreResult<Vec<Row>> {
    let rows = reader
        .rows(table_id)?
        .ok_or_else(|| CoreError::table_not_found(table_id))?;
    let entries = reader.order_entries(table_id)?;
    Ok(merge_rows(rows, &entries))
}

/// Sorts rows by (has position first, position, creation time).
///
/// `rows` must be in insertion order; ties keep that order.
#[must_use]
pub fn merge_rows(mut rows: Vec<Row>, entries: &[RowOrderEntry]) -> Vec<Row> {
    let positions: HashMap<&RowId, i64> = entries
        .iter()
        .map(|entry| (&entry.row_id, entry.position))
        .collect();

    rows.sort_by_key(|row| match positions.get(&row.id) {
        Some(&position) => (0, position, row.created_at),
        None => (1, 0, row.created_at),
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Fields;
    use crate::schema::TableRecord;
    use crate::store::{Mutation, RecordStore};
    use proptest::prelude::*;
    use serde_json::json;

    fn row(id: &str, created_at: u64) -> Row {
        Row::new("t".into(), id.into(), Fields::new(), created_at)
    }

    fn entry(id: &str, position: i64) -> RowOrderEntry {
        RowOrderEntry {
            table_id: "t".into(),
            row_id: id.into(),
            position,
        }
    }

    fn ids(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r.id.as_str()).collect()
    }

    fn store_with_rows(ids: &[&str]) -> RecordStore {
        let store = RecordStore::in_memory();
        let mut mutations = vec![Mutation::PutTable(TableRecord {
            id: "t".into(),
            name: "T".into(),
            columns: json!([]),
            created_at: 0,
            updated_at: 0,
        })];
        for (i, id) in ids.iter().enumerate() {
            mutations.push(Mutation::PutRow(row(id, i as u64)));
        }
        store.apply(mutations).unwrap();
        store
    }

    #[test]
    fn positioned_rows_come_first() {
        let rows = vec![row("a", 1), row("b", 2), row("c", 3), row("d", 4)];
        let merged = merge_rows(rows, &[entry("c", 0), entry("a", 5)]);
        assert_eq!(ids(&merged), ["c", "a", "b", "d"]);
    }

    #[test]
    fn unpositioned_rows_sort_by_creation_then_insertion() {
        let rows = vec![row("late", 9), row("x", 1), row("y", 1)];
        let merged = merge_rows(rows, &[]);
        assert_eq!(ids(&merged), ["x", "y", "late"]);
    }

    #[test]
    fn set_order_replaces_previous_order() {
        let store = store_with_rows(&["a", "b", "c"]);
        let index = RowOrderIndex::new(&store);
        index
            .set_order(&"t".into(), vec!["c".into(), "a".into(), "b".into()])
            .unwrap();
        index.set_order(&"t".into(), vec!["b".into()]).unwrap();

        assert_eq!(index.get_order(&"t".into()).unwrap(), vec![RowId::new("b")]);
        assert_eq!(ids(&index.merged_row_view(&"t".into()).unwrap()), ["b", "a", "c"]);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let store = store_with_rows(&["a", "b"]);
        let index = RowOrderIndex::new(&store);
        index.set_order(&"t".into(), vec!["b".into(), "a".into()]).unwrap();

        let result = index.set_order(&"t".into(), vec!["a".into(), "b".into(), "a".into()]);
        assert!(matches!(result, Err(CoreError::Validation { .. })));
        assert_eq!(
            index.get_order(&"t".into()).unwrap(),
            vec![RowId::new("b"), RowId::new("a")]
        );
    }

    #[test]
    fn set_order_on_missing_table_fails() {
        let store = RecordStore::in_memory();
        let result = RowOrderIndex::new(&store).set_order(&"ghost".into(), vec![]);
        assert!(matches!(result, Err(CoreError::TableNotFound { .. })));
    }

    #[test]
    fn merged_view_of_missing_table_is_not_found() {
        let store = RecordStore::in_memory();
        assert!(RowOrderIndex::new(&store)
            .merged_row_view(&"ghost".into())
            .unwrap_err()
            .is_not_found());
    }

    proptest! {
        #[test]
        fn set_then_get_round_trips(perm in Just(vec!["a", "b", "c", "d", "e"]).prop_shuffle()) {
            let store = store_with_rows(&["a", "b", "c", "d", "e"]);
            let index = RowOrderIndex::new(&store);
            let order: Vec<RowId> = perm.iter().map(|id| RowId::new(*id)).collect();

            index.set_order(&"t".into(), order.clone()).unwrap();
            prop_assert_eq!(index.get_order(&"t".into()).unwrap(), order.clone());

            let view: Vec<RowId> = index
                .merged_row_view(&"t".into())
                .unwrap()
                .into_iter()
                .map(|r| r.id)
                .collect();
            prop_assert_eq!(view, order);
        }
    }
}
