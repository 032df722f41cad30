//! Abstract table store and its in-process implementation.
//!
//! The core never talks to storage directly. It reads through [`TableReader`]
//! and writes through [`TableStore::transaction`], which stages [`Mutation`]s
//! and commits them atomically. [`RecordStore`] is the shipped implementation:
//! an in-memory state made durable by the commit journal.
//!
//! ## Record sets
//!
//! Four logical record sets are kept per table: the table record itself,
//! rows, order entries and history entries. Deleting a table removes all four.

mod record_store;
mod state;
mod transaction;

pub use record_store::RecordStore;
pub use state::StoreState;
pub use transaction::WriteTransaction;

use crate::error::CoreResult;
use crate::row::{Row, RowOrderEntry};
use crate::schema::TableRecord;
use crate::snapshot::HistoryEntry;
use crate::types::{HistoryId, RowId, TableId};
use serde::{Deserialize, Serialize};

/// One staged write.
///
/// Mutations are the unit of both commit and journal replay: a committed
/// transaction is exactly its list of mutations applied in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Mutation {
    /// Inserts or replaces a table record. Existing rows are kept.
    PutTable(TableRecord),
    /// Removes a table with its rows, order entries and history.
    DeleteTable {
        /// Table to delete.
        table_id: TableId,
    },
    /// Inserts or replaces a row. The owning table must exist.
    PutRow(Row),
    /// Removes a row and its order entry.
    DeleteRow {
        /// Owning table.
        table_id: TableId,
        /// Row to delete.
        row_id: RowId,
    },
    /// Replaces the whole order overlay; `row_ids[i]` gets position `i`.
    ReplaceOrder {
        /// Owning table.
        table_id: TableId,
        /// New sequence.
        row_ids: Vec<RowId>,
    },
    /// Appends an immutable history entry.
    PutHistory(HistoryEntry),
    /// Removes every history entry of a table.
    ClearHistory {
        /// Owning table.
        table_id: TableId,
    },
}

impl Mutation {
    /// Returns the table this mutation touches.
    #[must_use]
    pub fn table_id(&self) -> &TableId {
        match self {
            Self::PutTable(record) => &record.id,
            Self::PutRow(row) => &row.table_id,
            Self::PutHistory(entry) => &entry.table_id,
            Self::DeleteTable { table_id }
            | Self::DeleteRow { table_id, .. }
            | Self::ReplaceOrder { table_id, .. }
            | Self::ClearHistory { table_id } => table_id,
        }
    }
}

/// Read access to committed state.
pub trait TableReader {
    /// Returns every table record in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn table_records(&self) -> CoreResult<Vec<TableRecord>>;

    /// Returns one table record.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn table_record(&self, table_id: &TableId) -> CoreResult<Option<TableRecord>>;

    /// Returns a table's rows in insertion order, or `None` if the table is
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn rows(&self, table_id: &TableId) -> CoreResult<Option<Vec<Row>>>;

    /// Returns one row.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn row(&self, table_id: &TableId, row_id: &RowId) -> CoreResult<Option<Row>>;

    /// Returns a table's order entries, positions ascending.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn order_entries(&self, table_id: &TableId) -> CoreResult<Vec<RowOrderEntry>>;

    /// Returns a table's history entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn history_entries(&self, table_id: &TableId) -> CoreResult<Vec<HistoryEntry>>;

    /// Returns one history entry if it belongs to `table_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn history_entry(
        &self,
        table_id: &TableId,
        history_id: &HistoryId,
    ) -> CoreResult<Option<HistoryEntry>>;
}

/// A transactional table store.
///
/// Implementations serialize writers. A transaction's mutations become
/// visible together when the closure returns `Ok`, and not at all otherwise.
pub trait TableStore: TableReader + Send + Sync {
    /// Runs `f` inside a write transaction and commits on success.
    ///
    /// The transaction is aborted if `f` returns an error or the commit
    /// fails; nothing it staged becomes visible.
    ///
    /// # Errors
    ///
    /// Returns the closure's error or the commit error.
    fn transaction<T, F>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut WriteTransaction<'_>) -> CoreResult<T>;

    /// Commits a fixed list of mutations as one transaction.
    ///
    /// # Errors
    ///
    /// Returns the commit error.
    fn apply(&self, mutations: Vec<Mutation>) -> CoreResult<()> {
        self.transaction(|txn| {
            for mutation in mutations {
                txn.stage(mutation);
            }
            Ok(())
        })
    }
}
