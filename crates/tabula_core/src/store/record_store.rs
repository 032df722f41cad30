//! Journaled in-process record store.

use crate::error::{CoreError, CoreResult};
use crate::journal::{Journal, JournalRecord};
use crate::row::{Row, RowOrderEntry};
use crate::schema::TableRecord;
use crate::snapshot::HistoryEntry;
use crate::store::{StoreState, TableReader, TableStore, WriteTransaction};
use crate::types::{now_millis, HistoryId, RowId, SequenceNumber, TableId, TransactionId};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use tabula_storage::{InMemoryBackend, StorageBackend};
use tracing::debug;

/// The shipped [`TableStore`]: committed state in memory, every commit
/// appended to a journal first.
///
/// ## Single-Writer Guarantee
///
/// A write transaction holds the writer lock for its whole lifetime. Readers
/// take the state lock only for the duration of one read and are blocked
/// only while a commit is being applied and journaled.
pub struct RecordStore {
    state: RwLock<StoreState>,
    writer: Mutex<()>,
    journal: Journal,
    next_txid: AtomicU64,
    committed_seq: AtomicU64,
}

impl RecordStore {
    /// Opens a store over `backend`, replaying its journal.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal is corrupt or a replayed commit does
    /// not apply.
    pub fn open(backend: Box<dyn StorageBackend>, sync_on_commit: bool) -> CoreResult<Self> {
        let journal = Journal::new(backend, sync_on_commit);
        let recovery = journal.recover()?;

        let mut state = StoreState::default();
        let mut sequence = SequenceNumber::default();
        let mut max_txid = 0;
        for record in recovery.records {
            match record {
                JournalRecord::Checkpoint {
                    sequence: seq,
                    state: image,
                } => {
                    state = image;
                    sequence = seq;
                }
                JournalRecord::Commit {
                    txid,
                    sequence: seq,
                    mutations,
                    ..
                } => {
                    state.apply_batch(&mutations).map_err(|e| {
                        CoreError::journal_corruption(format!(
                            "commit {seq} does not replay: {e}"
                        ))
                    })?;
                    sequence = seq;
                    max_txid = max_txid.max(txid.as_u64());
                }
            }
        }

        debug!(
            sequence = sequence.as_u64(),
            tables = state.table_count(),
            rows = state.row_count(),
            "record store recovered"
        );

        Ok(Self {
            state: RwLock::new(state),
            writer: Mutex::new(()),
            journal,
            next_txid: AtomicU64::new(max_txid + 1),
            committed_seq: AtomicU64::new(sequence.as_u64()),
        })
    }

    /// Creates an empty store over an in-memory journal.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            writer: Mutex::new(()),
            journal: Journal::new(Box::new(InMemoryBackend::new()), false),
            next_txid: AtomicU64::new(1),
            committed_seq: AtomicU64::new(0),
        }
    }

    /// Returns the sequence number of the last commit.
    #[must_use]
    pub fn committed_seq(&self) -> SequenceNumber {
        SequenceNumber::new(self.committed_seq.load(Ordering::SeqCst))
    }

    /// Returns the journal size in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend size cannot be read.
    pub fn journal_size(&self) -> CoreResult<u64> {
        self.journal.size()
    }

    /// Returns a copy of the committed state.
    #[must_use]
    pub fn state_image(&self) -> StoreState {
        self.state.read().clone()
    }

    /// Folds the journal into a single checkpoint record.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be rewritten.
    pub fn checkpoint(&self) -> CoreResult<SequenceNumber> {
        let _writer = self.writer.lock();
        let sequence = self.committed_seq();
        let state = self.state.read().clone();
        self.journal
            .replace(&JournalRecord::Checkpoint { sequence, state })?;
        debug!(sequence = sequence.as_u64(), "journal checkpointed");
        Ok(sequence)
    }

    /// Flushes the journal.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub fn flush(&self) -> CoreResult<()> {
        self.journal.flush()
    }

    /// Applies and journals a transaction's mutations.
    ///
    /// Must be called with the writer lock held. The state lock is held
    /// across the journal append so readers never observe a commit that
    /// failed to reach the journal.
    fn commit_inner(&self, txn: &mut WriteTransaction<'_>) -> CoreResult<SequenceNumber> {
        let mutations = txn.take_mutations()?;
        if mutations.is_empty() {
            txn.mark_committed();
            return Ok(self.committed_seq());
        }

        let sequence = self.committed_seq().next();
        let mut state = self.state.write();
        let undo = state.apply_batch(&mutations)?;

        let record = JournalRecord::Commit {
            txid: txn.id(),
            sequence,
            timestamp: now_millis(),
            mutations,
        };
        if let Err(e) = self.journal.append(&record) {
            state.rollback(undo);
            return Err(e);
        }

        self.committed_seq.store(sequence.as_u64(), Ordering::SeqCst);
        txn.mark_committed();
        debug!(txid = %txn.id(), %sequence, "transaction committed");
        Ok(sequence)
    }
}

impl TableReader for RecordStore {
    fn table_records(&self) -> CoreResult<Vec<TableRecord>> {
        Ok(self.state.read().table_records())
    }

    fn table_record(&self, table_id: &TableId) -> CoreResult<Option<TableRecord>> {
        Ok(self.state.read().table_record(table_id))
    }

    fn rows(&self, table_id: &TableId) -> CoreResult<Option<Vec<Row>>> {
        Ok(self.state.read().rows(table_id))
    }

    fn row(&self, table_id: &TableId, row_id: &RowId) -> CoreResult<Option<Row>> {
        Ok(self.state.read().row(table_id, row_id))
    }

    fn order_entries(&self, table_id: &TableId) -> CoreResult<Vec<RowOrderEntry>> {
        Ok(self.state.read().order_entries(table_id))
    }

    fn history_entries(&self, table_id: &TableId) -> CoreResult<Vec<HistoryEntry>> {
        Ok(self.state.read().history_entries(table_id))
    }

    fn history_entry(
        &self,
        table_id: &TableId,
        history_id: &HistoryId,
    ) -> CoreResult<Option<HistoryEntry>> {
        Ok(self.state.read().history_entry(table_id, history_id))
    }
}

impl TableStore for RecordStore {
    fn transaction<T, F>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut WriteTransaction<'_>) -> CoreResult<T>,
    {
        let _writer = self.writer.lock();
        let txid = TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst));
        let mut txn = WriteTransaction::new(txid, self);

        match f(&mut txn) {
            Ok(value) => match self.commit_inner(&mut txn) {
                Ok(_) => Ok(value),
                Err(e) => {
                    txn.mark_aborted();
                    debug!(%txid, error = %e, "commit failed");
                    Err(e)
                }
            },
            Err(e) => {
                txn.mark_aborted();
                debug!(%txid, error = %e, "transaction aborted");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("committed_seq", &self.committed_seq())
            .field("journal", &self.journal)
            .finish_non_exhaustive()
    }
}
