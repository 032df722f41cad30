//! Fault injection.
//!
//! [`SharedJournal`] is a journal backend whose bytes outlive the store using
//! it and whose writes can be made to fail. [`FlakyStore`] wraps any
//! [`TableStore`] and fails `apply` commits that touch chosen tables, which is
//! how guardian cascade writes are driven into failure.

use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tabula_core::{
    CoreError, CoreResult, HistoryEntry, HistoryId, Mutation, Row, RowId, RowOrderEntry,
    TableId, TableReader, TableRecord, TableStore, WriteTransaction,
};
use tabula_storage::{StorageBackend, StorageError, StorageResult};

/// An in-memory journal backend that can be cloned, inspected and broken.
///
/// Clones share the same bytes and the same fault switch, so a test can keep
/// one handle while a workspace owns another.
#[derive(Debug, Clone, Default)]
pub struct SharedJournal {
    bytes: Arc<RwLock<Vec<u8>>>,
    fail_writes: Arc<AtomicBool>,
    tear_appends: Arc<AtomicBool>,
}

impl SharedJournal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the journal bytes.
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.read().clone()
    }

    /// Overwrites the journal bytes.
    pub fn set_bytes(&self, bytes: Vec<u8>) {
        *self.bytes.write() = bytes;
    }

    /// Makes every later append, truncate or replace fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every later append write half of its bytes and then fail.
    pub fn tear_appends(&self, tear: bool) {
        self.tear_appends.store(tear, Ordering::SeqCst);
    }

    /// Returns a boxed handle suitable for `Workspace::open_with_backend`.
    pub fn backend(&self) -> Box<dyn StorageBackend> {
        Box::new(self.clone())
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(injected("injected write failure"))
        } else {
            Ok(())
        }
    }
}

fn injected(message: &str) -> StorageError {
    StorageError::Io(io::Error::new(io::ErrorKind::Other, message.to_string()))
}

impl StorageBackend for SharedJournal {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let data = self.bytes.read();
        let size = data.len() as u64;
        let start = offset as usize;
        match data.get(start..start.saturating_add(len)) {
            Some(slice) => Ok(slice.to_vec()),
            None => Err(StorageError::ReadPastEnd { offset, len, size }),
        }
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        self.check_writable()?;
        let mut bytes = self.bytes.write();
        let offset = bytes.len() as u64;
        if self.tear_appends.load(Ordering::SeqCst) {
            bytes.extend_from_slice(&data[..data.len() / 2]);
            return Err(injected("injected torn append"));
        }
        bytes.extend_from_slice(data);
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.bytes.read().len() as u64)
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        self.check_writable()?;
        let mut bytes = self.bytes.write();
        let size = bytes.len() as u64;
        if new_size > size {
            return Err(StorageError::InvalidTruncate {
                requested: new_size,
                size,
            });
        }
        bytes.truncate(new_size as usize);
        Ok(())
    }

    fn replace(&mut self, data: &[u8]) -> StorageResult<()> {
        self.check_writable()?;
        *self.bytes.write() = data.to_vec();
        Ok(())
    }
}

/// A store wrapper that fails [`TableStore::apply`] for chosen tables.
///
/// Only `apply` is intercepted. [`TableStore::transaction`] always reaches the
/// inner store, even for armed tables. The guardian commits a schema change
/// through `transaction` and each cascade side write through its own `apply`,
/// so arming a referencing table fails that side write alone. Table deletion
/// also commits through `apply`, so arming the deleted table fails the delete.
pub struct FlakyStore<S> {
    inner: S,
    failing: Mutex<HashSet<TableId>>,
}

impl<S: TableStore> FlakyStore<S> {
    /// Wraps `inner` with no faults armed.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Makes `apply` fail for any batch touching `table_id`.
    pub fn fail_table(&self, table_id: impl Into<TableId>) {
        self.failing.lock().insert(table_id.into());
    }

    /// Disarms every fault.
    pub fn heal(&self) {
        self.failing.lock().clear();
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: TableStore> TableReader for FlakyStore<S> {
    fn table_records(&self) -> CoreResult<Vec<TableRecord>> {
        self.inner.table_records()
    }

    fn table_record(&self, table_id: &TableId) -> CoreResult<Option<TableRecord>> {
        self.inner.table_record(table_id)
    }

    fn rows(&self, table_id: &TableId) -> CoreResult<Option<Vec<Row>>> {
        self.inner.rows(table_id)
    }

    fn row(&self, table_id: &TableId, row_id: &RowId) -> CoreResult<Option<Row>> {
        self.inner.row(table_id, row_id)
    }

    fn order_entries(&self, table_id: &TableId) -> CoreResult<Vec<RowOrderEntry>> {
        self.inner.order_entries(table_id)
    }

    fn history_entries(&self, table_id: &TableId) -> CoreResult<Vec<HistoryEntry>> {
        self.inner.history_entries(table_id)
    }

    fn history_entry(
        &self,
        table_id: &TableId,
        history_id: &HistoryId,
    ) -> CoreResult<Option<HistoryEntry>> {
        self.inner.history_entry(table_id, history_id)
    }
}

impl<S: TableStore> TableStore for FlakyStore<S> {
    fn transaction<T, F>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut WriteTransaction<'_>) -> CoreResult<T>,
    {
        self.inner.transaction(f)
    }

    fn apply(&self, mutations: Vec<Mutation>) -> CoreResult<()> {
        {
            let failing = self.failing.lock();
            if let Some(mutation) = mutations.iter().find(|m| failing.contains(m.table_id())) {
                return Err(CoreError::Io(io::Error::new(
                    io::ErrorKind::Other,
                    format!("injected failure writing table {}", mutation.table_id()),
                )));
            }
        }
        self.inner.apply(mutations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::RecordStore;

    fn record(id: &str) -> TableRecord {
        TableRecord {
            id: id.into(),
            name: id.into(),
            columns: serde_json::json!([]),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn only_apply_is_intercepted() {
        let store = FlakyStore::new(RecordStore::in_memory());
        store.fail_table("t");

        assert!(store.apply(vec![Mutation::PutTable(record("t"))]).is_err());
        assert!(store.table_record(&"t".into()).unwrap().is_none());

        store
            .transaction(|txn| {
                txn.put_table(record("t"));
                Ok(())
            })
            .unwrap();
        assert!(store.table_record(&"t".into()).unwrap().is_some());

        assert!(store.apply(vec![Mutation::PutTable(record("t"))]).is_err());
        store.heal();
        store.apply(vec![Mutation::PutTable(record("t"))]).unwrap();
    }

    #[test]
    fn failed_replace_keeps_bytes() {
        let journal = SharedJournal::new();
        let mut backend = journal.clone();
        backend.append(b"committed").unwrap();

        journal.fail_writes(true);
        assert!(backend.replace(b"image").is_err());
        assert_eq!(journal.bytes(), b"committed");
    }

    #[test]
    fn torn_append_leaves_half_the_bytes() {
        let journal = SharedJournal::new();
        let mut backend = journal.clone();
        journal.tear_appends(true);

        assert!(backend.append(b"abcdef").is_err());
        assert_eq!(journal.bytes(), b"abc");
    }
}
