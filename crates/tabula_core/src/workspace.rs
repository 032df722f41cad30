//! Workspace facade and lifecycle.

use crate::config::Config;
use crate::dir::WorkspaceDir;
use crate::error::{CoreError, CoreResult};
use crate::guardian::{IntegrityGuardian, SchemaChange, TableDeletion};
use crate::order::RowOrderIndex;
use crate::references::{find_references, Reference};
use crate::row::{Fields, Row};
use crate::schema::{validate_schema, Table, TableDraft};
use crate::snapshot::{
    HistoryEntry, HistoryEntryMeta, HistoryRequest, RevertExecutor, RevertSummary,
    SnapshotEngine, TableSnapshot,
};
use crate::store::{RecordStore, TableReader, TableStore};
use crate::types::{now_millis, ColumnId, HistoryId, RowId, SequenceNumber, TableId};
use parking_lot::RwLock;
use serde_json::Value;
use std::path::Path;
use tabula_storage::{FileBackend, StorageBackend};
use tracing::{info, warn};

/// The main workspace handle.
///
/// A workspace owns one [`RecordStore`] and exposes every table, row, order
/// and history operation on it.
///
/// # Opening a Workspace
///
/// ```rust,ignore
/// use tabula_core::{Column, TableDraft, Workspace};
/// use std::path::Path;
///
/// let ws = Workspace::open(Path::new("my_workspace"))?;
/// let table = ws.create_table(TableDraft::new("Tasks", vec![Column::text("title", "Title")]))?;
/// ws.close()?;
/// ```
///
/// # In-Memory Workspaces
///
/// ```rust,ignore
/// let ws = Workspace::open_in_memory()?;
/// ```
pub struct Workspace {
    config: Config,
    dir: Option<WorkspaceDir>,
    store: RecordStore,
    is_open: RwLock<bool>,
}

impl Workspace {
    /// Opens a workspace directory with the default configuration.
    ///
    /// # Errors
    ///
    /// See [`Workspace::open_with_config`].
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens a workspace directory, replaying its journal.
    ///
    /// # Errors
    ///
    /// - [`CoreError::WorkspaceLocked`] if another process has it open
    /// - [`CoreError::InvalidFormat`] for a missing or unexpected directory
    /// - journal corruption or I/O errors
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        let dir = WorkspaceDir::open(path, config.create_if_missing, config.error_if_exists)?;
        let backend = FileBackend::open_with_create_dirs(&dir.journal_path())?;
        let store = RecordStore::open(Box::new(backend), config.sync_on_commit)?;
        info!(
            path = %path.display(),
            sequence = store.committed_seq().as_u64(),
            "workspace opened"
        );
        Ok(Self {
            config,
            dir: Some(dir),
            store,
            is_open: RwLock::new(true),
        })
    }

    /// Opens a workspace over a pre-configured journal backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be replayed.
    pub fn open_with_backend(config: Config, backend: Box<dyn StorageBackend>) -> CoreResult<Self> {
        let store = RecordStore::open(backend, config.sync_on_commit)?;
        Ok(Self {
            config,
            dir: None,
            store,
            is_open: RwLock::new(true),
        })
    }

    /// Opens a fresh, non-persistent workspace.
    ///
    /// # Errors
    ///
    /// Infallible in practice; returns `CoreResult` for symmetry.
    pub fn open_in_memory() -> CoreResult<Self> {
        Ok(Self {
            config: Config::default(),
            dir: None,
            store: RecordStore::in_memory(),
            is_open: RwLock::new(true),
        })
    }

    /// Closes the workspace, flushing the journal.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub fn close(&self) -> CoreResult<()> {
        let mut is_open = self.is_open.write();
        if !*is_open {
            return Ok(());
        }
        self.store.flush()?;
        *is_open = false;
        Ok(())
    }

    /// Checks if the workspace is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.is_open.read()
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if *self.is_open.read() {
            Ok(())
        } else {
            Err(CoreError::WorkspaceClosed)
        }
    }

    /// Rewrites the journal as a single checkpoint record.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be rewritten.
    pub fn checkpoint(&self) -> CoreResult<SequenceNumber> {
        self.ensure_open()?;
        let sequence = self.store.checkpoint()?;
        info!(sequence = sequence.as_u64(), "checkpoint written");
        Ok(sequence)
    }

    /// Returns the sequence number of the last commit.
    #[must_use]
    pub fn committed_seq(&self) -> SequenceNumber {
        self.store.committed_seq()
    }

    /// Returns the workspace configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the workspace directory, if file-backed.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(WorkspaceDir::path)
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    fn guardian(&self) -> IntegrityGuardian<'_, RecordStore> {
        IntegrityGuardian::new(&self.store, self.config.option_rename_policy)
    }

    fn snapshots(&self) -> SnapshotEngine<'_, RecordStore> {
        SnapshotEngine::new(&self.store, &self.config)
    }

    // ========================================================================
    // Tables
    // ========================================================================

    /// Lists every table in creation order.
    ///
    /// Tables whose stored schema cannot be decoded are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace is closed.
    pub fn list_tables(&self) -> CoreResult<Vec<Table>> {
        self.ensure_open()?;
        Ok(self
            .store
            .table_records()?
            .iter()
            .filter_map(|record| match Table::from_record(record) {
                Ok(table) => Some(table),
                Err(e) => {
                    warn!(table_id = %record.id, error = %e, "skipping table with malformed schema");
                    None
                }
            })
            .collect())
    }

    /// Returns one table.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TableNotFound`] or [`CoreError::MalformedSchema`].
    pub fn get_table(&self, table_id: &TableId) -> CoreResult<Table> {
        self.ensure_open()?;
        let record = self
            .store
            .table_record(table_id)?
            .ok_or_else(|| CoreError::table_not_found(table_id))?;
        Table::from_record(&record)
    }

    /// Creates a table from a draft with a name and columns.
    ///
    /// The id is taken from the draft or generated.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for a missing name or columns, an
    /// invalid schema, or an id already in use.
    pub fn create_table(&self, draft: TableDraft) -> CoreResult<Table> {
        self.ensure_open()?;
        let name = draft
            .name
            .ok_or_else(|| CoreError::validation("table name is required"))?;
        let columns = draft
            .columns
            .ok_or_else(|| CoreError::validation("column list is required"))?;
        let id = draft.id.unwrap_or_else(TableId::generate);
        validate_schema(&id, &name, &columns)?;

        let now = now_millis();
        let table = Table {
            id,
            name,
            columns,
            created_at: now,
            updated_at: now,
        };
        let record = table.to_record()?;
        self.store.transaction(|txn| {
            if txn.table_record(&record.id)?.is_some() {
                return Err(CoreError::validation(format!(
                    "table {} already exists",
                    record.id
                )));
            }
            txn.put_table(record);
            Ok(())
        })?;
        Ok(table)
    }

    /// Updates a table's name and/or columns through the integrity guardian.
    ///
    /// # Errors
    ///
    /// See [`IntegrityGuardian::update_schema`].
    pub fn update_table(
        &self,
        table_id: &TableId,
        draft: TableDraft,
        confirmed: bool,
    ) -> CoreResult<SchemaChange> {
        self.ensure_open()?;
        self.guardian().update_schema(table_id, draft, confirmed)
    }

    /// Deletes a table through the integrity guardian.
    ///
    /// # Errors
    ///
    /// See [`IntegrityGuardian::delete_table`].
    pub fn delete_table(&self, table_id: &TableId, confirmed: bool) -> CoreResult<TableDeletion> {
        self.ensure_open()?;
        self.guardian().delete_table(table_id, confirmed)
    }

    /// Finds columns in other tables pointing at a table or one of its columns.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn references(
        &self,
        table_id: &TableId,
        column_id: Option<&ColumnId>,
    ) -> CoreResult<Vec<Reference>> {
        self.ensure_open()?;
        Ok(find_references(
            &self.store.table_records()?,
            table_id,
            column_id,
        ))
    }

    // ========================================================================
    // Rows
    // ========================================================================

    /// Lists a table's rows in display order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TableNotFound`] if the table is absent.
    pub fn list_rows(&self, table_id: &TableId) -> CoreResult<Vec<Row>> {
        self.ensure_open()?;
        RowOrderIndex::new(&self.store).merged_row_view(table_id)
    }

    /// Returns one row.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RowNotFound`] if the row is absent.
    pub fn get_row(&self, table_id: &TableId, row_id: &RowId) -> CoreResult<Row> {
        self.ensure_open()?;
        self.store
            .row(table_id, row_id)?
            .ok_or_else(|| CoreError::row_not_found(table_id, row_id))
    }

    /// Creates a row from a field payload.
    ///
    /// A string `id` field becomes the row id and is not stored as a field;
    /// otherwise an id is generated.
    ///
    /// # Errors
    ///
    /// - [`CoreError::TableNotFound`] if the table is absent
    /// - [`CoreError::Validation`] for a non-string or duplicate id
    pub fn create_row(&self, table_id: &TableId, mut fields: Fields) -> CoreResult<Row> {
        self.ensure_open()?;
        let row_id = match fields.remove("id") {
            None | Some(Value::Null) => RowId::generate(),
            Some(Value::String(id)) if !id.is_empty() => RowId::new(id),
            Some(other) => {
                return Err(CoreError::validation(format!(
                    "row id must be a non-empty string, got {other}"
                )))
            }
        };
        let row = Row::new(table_id.clone(), row_id, fields, now_millis());

        self.store.transaction(|txn| {
            if txn.table_record(table_id)?.is_none() {
                return Err(CoreError::table_not_found(table_id));
            }
            if txn.row(table_id, &row.id)?.is_some() {
                return Err(CoreError::validation(format!(
                    "row {} already exists in table {}",
                    row.id, table_id
                )));
            }
            txn.put_row(row.clone());
            Ok(())
        })?;
        Ok(row)
    }

    /// Merges top-level fields of `patch` into a row.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RowNotFound`] if the row is absent.
    pub fn update_row(&self, table_id: &TableId, row_id: &RowId, patch: Fields) -> CoreResult<Row> {
        self.ensure_open()?;
        self.store.transaction(|txn| {
            let mut row = txn
                .row(table_id, row_id)?
                .ok_or_else(|| CoreError::row_not_found(table_id, row_id))?;
            row.merge(patch, now_millis());
            txn.put_row(row.clone());
            Ok(row)
        })
    }

    /// Deletes a row and its order entry.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RowNotFound`] if the row is absent.
    pub fn delete_row(&self, table_id: &TableId, row_id: &RowId) -> CoreResult<()> {
        self.ensure_open()?;
        self.store.transaction(|txn| {
            if txn.row(table_id, row_id)?.is_none() {
                return Err(CoreError::row_not_found(table_id, row_id));
            }
            txn.delete_row(table_id.clone(), row_id.clone());
            Ok(())
        })
    }

    // ========================================================================
    // Order
    // ========================================================================

    /// Returns the explicit row order; empty for a missing table.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace is closed.
    pub fn get_order(&self, table_id: &TableId) -> CoreResult<Vec<RowId>> {
        self.ensure_open()?;
        RowOrderIndex::new(&self.store).get_order(table_id)
    }

    /// Replaces the table's row order.
    ///
    /// # Errors
    ///
    /// See [`RowOrderIndex::set_order`].
    pub fn set_order(&self, table_id: &TableId, row_ids: Vec<RowId>) -> CoreResult<()> {
        self.ensure_open()?;
        RowOrderIndex::new(&self.store).set_order(table_id, row_ids)
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Captures the table's current state without storing it.
    ///
    /// # Errors
    ///
    /// See [`SnapshotEngine::capture_snapshot`].
    pub fn capture_snapshot(&self, table_id: &TableId) -> CoreResult<TableSnapshot> {
        self.ensure_open()?;
        self.snapshots().capture_snapshot(table_id)
    }

    /// Lists history metadata, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace is closed.
    pub fn list_history(
        &self,
        table_id: &TableId,
        limit: Option<usize>,
    ) -> CoreResult<Vec<HistoryEntryMeta>> {
        self.ensure_open()?;
        self.snapshots().list_history(table_id, limit)
    }

    /// Returns one full history entry.
    ///
    /// # Errors
    ///
    /// See [`SnapshotEngine::get_history_entry`].
    pub fn get_history(&self, table_id: &TableId, history_id: &HistoryId) -> CoreResult<HistoryEntry> {
        self.ensure_open()?;
        self.snapshots().get_history_entry(table_id, history_id)
    }

    /// Stores a history entry, capturing the current state if the request
    /// carries no snapshot.
    ///
    /// # Errors
    ///
    /// See [`SnapshotEngine::create_history_entry`].
    pub fn create_history(
        &self,
        table_id: &TableId,
        request: HistoryRequest,
    ) -> CoreResult<HistoryEntryMeta> {
        self.ensure_open()?;
        self.snapshots().create_history_entry(table_id, request)
    }

    /// Deletes all history of a table.
    ///
    /// # Errors
    ///
    /// Returns the commit error.
    pub fn clear_history(&self, table_id: &TableId) -> CoreResult<usize> {
        self.ensure_open()?;
        self.snapshots().clear_history(table_id)
    }

    /// Restores a table to the state stored in one of its history entries.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::HistoryNotFound`] for an unknown entry, or see
    /// [`RevertExecutor::revert_to_snapshot`].
    pub fn revert_history(
        &self,
        table_id: &TableId,
        history_id: &HistoryId,
    ) -> CoreResult<RevertSummary> {
        self.ensure_open()?;
        let entry = self.snapshots().get_history_entry(table_id, history_id)?;
        RevertExecutor::new(&self.store).revert_to_snapshot(table_id, &entry.snapshot)
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("path", &self.path())
            .field("is_open", &self.is_open())
            .field("committed_seq", &self.committed_seq())
            .finish_non_exhaustive()
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
