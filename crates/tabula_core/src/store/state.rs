//! Committed store state and atomic batch application.

use crate::error::{CoreError, CoreResult};
use crate::row::{Row, RowOrderEntry};
use crate::schema::TableRecord;
use crate::snapshot::HistoryEntry;
use crate::store::Mutation;
use crate::types::{HistoryId, RowId, TableId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything the record store holds.
///
/// The state is a plain value so a checkpoint can serialize it whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreState {
    tables: BTreeMap<TableId, TableSlot>,
    next_ordinal: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableSlot {
    ordinal: u64,
    record: TableRecord,
    rows: BTreeMap<RowId, RowSlot>,
    order: BTreeMap<RowId, i64>,
    history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RowSlot {
    ordinal: u64,
    row: Row,
}

/// Inverse of one applied mutation.
#[derive(Debug)]
enum UndoStep {
    RemoveTable(TableId),
    RestoreRecord(TableRecord),
    RestoreTable(TableId, Box<TableSlot>),
    RestoreRow {
        table_id: TableId,
        row_id: RowId,
        previous: Option<RowSlot>,
        position: Option<i64>,
    },
    RestoreOrder(TableId, BTreeMap<RowId, i64>),
    PopHistory(TableId),
    RestoreHistory(TableId, Vec<HistoryEntry>),
}

/// Steps needed to undo an applied batch, most recent last.
#[derive(Debug)]
pub(crate) struct UndoLog {
    steps: Vec<UndoStep>,
    next_ordinal: u64,
}

impl StoreState {
    /// Returns true if the state holds no tables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Number of tables.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Number of rows across all tables.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.tables.values().map(|slot| slot.rows.len()).sum()
    }

    pub(crate) fn table_records(&self) -> Vec<TableRecord> {
        let mut slots: Vec<&TableSlot> = self.tables.values().collect();
        slots.sort_by_key(|slot| slot.ordinal);
        slots.into_iter().map(|slot| slot.record.clone()).collect()
    }

    pub(crate) fn table_record(&self, table_id: &TableId) -> Option<TableRecord> {
        self.tables.get(table_id).map(|slot| slot.record.clone())
    }

    pub(crate) fn rows(&self, table_id: &TableId) -> Option<Vec<Row>> {
        let slot = self.tables.get(table_id)?;
        let mut rows: Vec<&RowSlot> = slot.rows.values().collect();
        rows.sort_by_key(|r| r.ordinal);
        Some(rows.into_iter().map(|r| r.row.clone()).collect())
    }

    pub(crate) fn row(&self, table_id: &TableId, row_id: &RowId) -> Option<Row> {
        self.tables
            .get(table_id)
            .and_then(|slot| slot.rows.get(row_id))
            .map(|r| r.row.clone())
    }

    pub(crate) fn order_entries(&self, table_id: &TableId) -> Vec<RowOrderEntry> {
        let Some(slot) = self.tables.get(table_id) else {
            return Vec::new();
        };
        let mut entries: Vec<RowOrderEntry> = slot
            .order
            .iter()
            .map(|(row_id, position)| RowOrderEntry {
                table_id: table_id.clone(),
                row_id: row_id.clone(),
                position: *position,
            })
            .collect();
        entries.sort_by_key(|e| e.position);
        entries
    }

    pub(crate) fn history_entries(&self, table_id: &TableId) -> Vec<HistoryEntry> {
        self.tables
            .get(table_id)
            .map(|slot| slot.history.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn history_entry(
        &self,
        table_id: &TableId,
        history_id: &HistoryId,
    ) -> Option<HistoryEntry> {
        self.tables
            .get(table_id)?
            .history
            .iter()
            .find(|entry| &entry.id == history_id)
            .cloned()
    }

    /// Applies a batch of mutations atomically.
    ///
    /// If any mutation fails, the ones already applied are undone and the
    /// state is left exactly as before.
    pub(crate) fn apply_batch(&mut self, mutations: &[Mutation]) -> CoreResult<UndoLog> {
        let mut undo = UndoLog {
            steps: Vec::with_capacity(mutations.len()),
            next_ordinal: self.next_ordinal,
        };
        for mutation in mutations {
            match self.apply_one(mutation) {
                Ok(step) => undo.steps.push(step),
                Err(e) => {
                    self.rollback(undo);
                    return Err(e);
                }
            }
        }
        Ok(undo)
    }

    /// Reverts a batch previously applied with [`StoreState::apply_batch`].
    pub(crate) fn rollback(&mut self, undo: UndoLog) {
        for step in undo.steps.into_iter().rev() {
            match step {
                UndoStep::RemoveTable(table_id) => {
                    self.tables.remove(&table_id);
                }
                UndoStep::RestoreRecord(record) => {
                    if let Some(slot) = self.tables.get_mut(&record.id) {
                        slot.record = record;
                    }
                }
                UndoStep::RestoreTable(table_id, slot) => {
                    self.tables.insert(table_id, *slot);
                }
                UndoStep::RestoreRow {
                    table_id,
                    row_id,
                    previous,
                    position,
                } => {
                    if let Some(slot) = self.tables.get_mut(&table_id) {
                        match previous {
                            Some(row) => slot.rows.insert(row_id.clone(), row),
                            None => slot.rows.remove(&row_id),
                        };
                        if let Some(position) = position {
                            slot.order.insert(row_id, position);
                        }
                    }
                }
                UndoStep::RestoreOrder(table_id, order) => {
                    if let Some(slot) = self.tables.get_mut(&table_id) {
                        slot.order = order;
                    }
                }
                UndoStep::PopHistory(table_id) => {
                    if let Some(slot) = self.tables.get_mut(&table_id) {
                        slot.history.pop();
                    }
                }
                UndoStep::RestoreHistory(table_id, history) => {
                    if let Some(slot) = self.tables.get_mut(&table_id) {
                        slot.history = history;
                    }
                }
            }
        }
        self.next_ordinal = undo.next_ordinal;
    }

    fn take_ordinal(&mut self) -> u64 {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        ordinal
    }

    fn slot_mut(&mut self, table_id: &TableId) -> CoreResult<&mut TableSlot> {
        self.tables
            .get_mut(table_id)
            .ok_or_else(|| CoreError::table_not_found(table_id))
    }

    fn apply_one(&mut self, mutation: &Mutation) -> CoreResult<UndoStep> {
        match mutation {
            Mutation::PutTable(record) => {
                if let Some(slot) = self.tables.get_mut(&record.id) {
                    let previous = std::mem::replace(&mut slot.record, record.clone());
                    return Ok(UndoStep::RestoreRecord(previous));
                }
                let ordinal = self.take_ordinal();
                self.tables.insert(
                    record.id.clone(),
                    TableSlot {
                        ordinal,
                        record: record.clone(),
                        rows: BTreeMap::new(),
                        order: BTreeMap::new(),
                        history: Vec::new(),
                    },
                );
                Ok(UndoStep::RemoveTable(record.id.clone()))
            }

            Mutation::DeleteTable { table_id } => {
                let slot = self
                    .tables
                    .remove(table_id)
                    .ok_or_else(|| CoreError::table_not_found(table_id))?;
                Ok(UndoStep::RestoreTable(table_id.clone(), Box::new(slot)))
            }

            Mutation::PutRow(row) => {
                let ordinal = self.next_ordinal;
                let slot = self.slot_mut(&row.table_id)?;
                let previous = slot.rows.get(&row.id).cloned();
                let new_slot = RowSlot {
                    ordinal: previous.as_ref().map_or(ordinal, |p| p.ordinal),
                    row: row.clone(),
                };
                slot.rows.insert(row.id.clone(), new_slot);
                if previous.is_none() {
                    self.next_ordinal += 1;
                }
                Ok(UndoStep::RestoreRow {
                    table_id: row.table_id.clone(),
                    row_id: row.id.clone(),
                    previous,
                    position: None,
                })
            }

            Mutation::DeleteRow { table_id, row_id } => {
                let slot = self.slot_mut(table_id)?;
                let previous = slot
                    .rows
                    .remove(row_id)
                    .ok_or_else(|| CoreError::row_not_found(table_id, row_id))?;
                let position = slot.order.remove(row_id);
                Ok(UndoStep::RestoreRow {
                    table_id: table_id.clone(),
                    row_id: row_id.clone(),
                    previous: Some(previous),
                    position,
                })
            }

            Mutation::ReplaceOrder { table_id, row_ids } => {
                let slot = self.slot_mut(table_id)?;
                let mut order = BTreeMap::new();
                for (position, row_id) in row_ids.iter().enumerate() {
                    let position = i64::try_from(position)
                        .map_err(|_| CoreError::validation("order list too long"))?;
                    order.insert(row_id.clone(), position);
                }
                let previous = std::mem::replace(&mut slot.order, order);
                Ok(UndoStep::RestoreOrder(table_id.clone(), previous))
            }

            Mutation::PutHistory(entry) => {
                let slot = self.slot_mut(&entry.table_id)?;
                if slot.history.iter().any(|e| e.id == entry.id) {
                    return Err(CoreError::invalid_operation(format!(
                        "history entry {} already exists",
                        entry.id
                    )));
                }
                slot.history.push(entry.clone());
                Ok(UndoStep::PopHistory(entry.table_id.clone()))
            }

            Mutation::ClearHistory { table_id } => {
                let slot = self.slot_mut(table_id)?;
                let previous = std::mem::take(&mut slot.history);
                Ok(UndoStep::RestoreHistory(table_id.clone(), previous))
            }
        }
    }
}
