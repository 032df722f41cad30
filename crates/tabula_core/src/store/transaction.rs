//! Write transactions.

use crate::error::{CoreError, CoreResult};
use crate::row::{Row, RowOrderEntry};
use crate::schema::TableRecord;
use crate::snapshot::HistoryEntry;
use crate::store::{Mutation, TableReader};
use crate::types::{HistoryId, RowId, TableId, TransactionId};

/// State of a write transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can stage writes.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been aborted.
    Aborted,
}

/// A write transaction holding the store's writer lock.
///
/// Writes are staged as [`Mutation`]s and applied together on commit. Reads
/// through the transaction see the last committed state; staged writes are
/// not visible to them. Callers read what they need first, then stage.
pub struct WriteTransaction<'a> {
    id: TransactionId,
    state: TransactionState,
    committed: &'a dyn TableReader,
    mutations: Vec<Mutation>,
}

impl<'a> WriteTransaction<'a> {
    pub(crate) fn new(id: TransactionId, committed: &'a dyn TableReader) -> Self {
        Self {
            id,
            state: TransactionState::Active,
            committed,
            mutations: Vec::new(),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Checks if the transaction is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Returns the staged mutations in order.
    #[must_use]
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Stages an arbitrary mutation.
    pub fn stage(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    /// Stages a table insert or replace.
    pub fn put_table(&mut self, record: TableRecord) {
        self.stage(Mutation::PutTable(record));
    }

    /// Stages a table deletion with its rows, order and history.
    pub fn delete_table(&mut self, table_id: TableId) {
        self.stage(Mutation::DeleteTable { table_id });
    }

    /// Stages a row insert or replace.
    pub fn put_row(&mut self, row: Row) {
        self.stage(Mutation::PutRow(row));
    }

    /// Stages a row deletion.
    pub fn delete_row(&mut self, table_id: TableId, row_id: RowId) {
        self.stage(Mutation::DeleteRow { table_id, row_id });
    }

    /// Stages a full order replacement.
    pub fn replace_order(&mut self, table_id: TableId, row_ids: Vec<RowId>) {
        self.stage(Mutation::ReplaceOrder { table_id, row_ids });
    }

    /// Stages a new history entry.
    pub fn put_history(&mut self, entry: HistoryEntry) {
        self.stage(Mutation::PutHistory(entry));
    }

    /// Stages removal of a table's history.
    pub fn clear_history(&mut self, table_id: TableId) {
        self.stage(Mutation::ClearHistory { table_id });
    }

    pub(crate) fn ensure_active(&self) -> CoreResult<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(CoreError::invalid_operation("transaction not active"))
        }
    }

    /// Hands the staged mutations to the committer.
    pub(crate) fn take_mutations(&mut self) -> CoreResult<Vec<Mutation>> {
        self.ensure_active()?;
        Ok(std::mem::take(&mut self.mutations))
    }

    pub(crate) fn mark_committed(&mut self) {
        self.state = TransactionState::Committed;
    }

    pub(crate) fn mark_aborted(&mut self) {
        self.state = TransactionState::Aborted;
        self.mutations.clear();
    }
}

impl TableReader for WriteTransaction<'_> {
    fn table_records(&self) -> CoreResult<Vec<TableRecord>> {
        self.committed.table_records()
    }

    fn table_record(&self, table_id: &TableId) -> CoreResult<Option<TableRecord>> {
        self.committed.table_record(table_id)
    }

    fn rows(&self, table_id: &TableId) -> CoreResult<Option<Vec<Row>>> {
        self.committed.rows(table_id)
    }

    fn row(&self, table_id: &TableId, row_id: &RowId) -> CoreResult<Option<Row>> {
        self.committed.row(table_id, row_id)
    }

    fn order_entries(&self, table_id: &TableId) -> CoreResult<Vec<RowOrderEntry>> {
        self.committed.order_entries(table_id)
    }

    fn history_entries(&self, table_id: &TableId) -> CoreResult<Vec<HistoryEntry>> {
        self.committed.history_entries(table_id)
    }

    fn history_entry(
        &self,
        table_id: &TableId,
        history_id: &HistoryId,
    ) -> CoreResult<Option<HistoryEntry>> {
        self.committed.history_entry(table_id, history_id)
    }
}

impl std::fmt::Debug for WriteTransaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteTransaction")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("mutations", &self.mutations.len())
            .finish()
    }
}
