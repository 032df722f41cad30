//! Journal writer and recovery reader.

use crate::error::CoreResult;
use crate::journal::record::{read_frame, Frame, JournalRecord};
use parking_lot::Mutex;
use tabula_storage::StorageBackend;
use tracing::warn;

/// Records read back from a journal.
#[derive(Debug, Default)]
pub struct Recovery {
    /// Complete records in append order.
    pub records: Vec<JournalRecord>,
    /// Length of the valid prefix.
    pub valid_len: u64,
    /// Bytes of torn tail discarded after the valid prefix.
    pub discarded: u64,
}

/// Append-only commit journal over a storage backend.
pub struct Journal {
    backend: Mutex<Box<dyn StorageBackend>>,
    sync_on_commit: bool,
}

impl Journal {
    /// Creates a journal over `backend`.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_commit: bool) -> Self {
        Self {
            backend: Mutex::new(backend),
            sync_on_commit,
        }
    }

    /// Appends a record and returns its offset.
    ///
    /// With `sync_on_commit` the backend is flushed before returning. A
    /// failed append is cut back to the previous end so a partial frame never
    /// sits in front of later records.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    pub fn append(&self, record: &JournalRecord) -> CoreResult<u64> {
        let data = record.encode()?;
        let mut backend = self.backend.lock();
        let end = backend.size()?;
        let written = backend.append(&data).and_then(|offset| {
            if self.sync_on_commit {
                backend.flush()?;
            }
            Ok(offset)
        });
        match written {
            Ok(offset) => Ok(offset),
            Err(e) => {
                if let Err(cut) = backend.truncate(end) {
                    warn!(error = %cut, end, "could not cut failed journal append");
                }
                Err(e.into())
            }
        }
    }

    /// Reads every complete record without modifying the journal.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or fatal corruption.
    pub fn read(&self) -> CoreResult<Recovery> {
        let data = self.backend.lock().read_all()?;
        let mut recovery = Recovery::default();
        let mut offset = 0;
        while offset < data.len() {
            match read_frame(&data, offset)? {
                Frame::Record(record, end) => {
                    recovery.records.push(record);
                    offset = end;
                }
                Frame::Truncated => break,
            }
        }
        recovery.valid_len = offset as u64;
        recovery.discarded = (data.len() - offset) as u64;
        Ok(recovery)
    }

    /// Reads every complete record and cuts off a torn tail.
    ///
    /// Later appends then follow the last complete record.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or fatal corruption.
    pub fn recover(&self) -> CoreResult<Recovery> {
        let recovery = self.read()?;
        if recovery.discarded > 0 {
            warn!(
                discarded = recovery.discarded,
                valid_len = recovery.valid_len,
                "discarding torn journal tail"
            );
            let mut backend = self.backend.lock();
            backend.truncate(recovery.valid_len)?;
            backend.sync()?;
        }
        Ok(recovery)
    }

    /// Replaces the whole journal with `record`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the rewrite fails.
    pub fn replace(&self, record: &JournalRecord) -> CoreResult<()> {
        let data = record.encode()?;
        self.backend.lock().replace(&data)?;
        Ok(())
    }

    /// Flushes pending writes to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub fn flush(&self) -> CoreResult<()> {
        self.backend.lock().flush()?;
        Ok(())
    }

    /// Returns the journal size in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be read.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.backend.lock().size()?)
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("sync_on_commit", &self.sync_on_commit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::store::StoreState;
    use crate::types::{SequenceNumber, TransactionId};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tabula_storage::{InMemoryBackend, StorageError, StorageResult};

    /// Writes half of each append and fails while `tear` is set.
    struct TearingBackend {
        inner: InMemoryBackend,
        tear: Arc<AtomicBool>,
    }

    impl StorageBackend for TearingBackend {
        fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
            self.inner.read_at(offset, len)
        }
        fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
            if self.tear.load(Ordering::SeqCst) {
                self.inner.append(&data[..data.len() / 2])?;
                return Err(StorageError::Closed);
            }
            self.inner.append(data)
        }
        fn flush(&mut self) -> StorageResult<()> {
            self.inner.flush()
        }
        fn size(&self) -> StorageResult<u64> {
            self.inner.size()
        }
        fn sync(&mut self) -> StorageResult<()> {
            self.inner.sync()
        }
        fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
            self.inner.truncate(new_size)
        }
        fn replace(&mut self, data: &[u8]) -> StorageResult<()> {
            self.inner.replace(data)
        }
    }

    fn commit(seq: u64) -> JournalRecord {
        JournalRecord::Commit {
            txid: TransactionId::new(seq),
            sequence: SequenceNumber::new(seq),
            timestamp: seq,
            mutations: Vec::new(),
        }
    }

    #[test]
    fn append_then_read() {
        let journal = Journal::new(Box::new(InMemoryBackend::new()), true);
        journal.append(&commit(1)).unwrap();
        journal.append(&commit(2)).unwrap();

        let recovery = journal.read().unwrap();
        assert_eq!(recovery.records, vec![commit(1), commit(2)]);
        assert_eq!(recovery.discarded, 0);
    }

    #[test]
    fn torn_tail_is_cut_on_recover() {
        let mut data = commit(1).encode().unwrap();
        let whole = data.len() as u64;
        let second = commit(2).encode().unwrap();
        data.extend_from_slice(&second[..second.len() / 2]);

        let journal = Journal::new(Box::new(InMemoryBackend::with_data(data)), false);
        let recovery = journal.recover().unwrap();
        assert_eq!(recovery.records, vec![commit(1)]);
        assert_eq!(recovery.valid_len, whole);
        assert_eq!(journal.size().unwrap(), whole);

        journal.append(&commit(3)).unwrap();
        assert_eq!(journal.read().unwrap().records, vec![commit(1), commit(3)]);
    }

    #[test]
    fn torn_append_is_cut_before_the_next_record() {
        let tear = Arc::new(AtomicBool::new(false));
        let backend = TearingBackend {
            inner: InMemoryBackend::new(),
            tear: Arc::clone(&tear),
        };
        let journal = Journal::new(Box::new(backend), true);
        journal.append(&commit(1)).unwrap();
        let size = journal.size().unwrap();

        tear.store(true, Ordering::SeqCst);
        assert!(journal.append(&commit(2)).is_err());
        assert_eq!(journal.size().unwrap(), size);

        tear.store(false, Ordering::SeqCst);
        journal.append(&commit(3)).unwrap();
        let recovery = journal.recover().unwrap();
        assert_eq!(recovery.records, vec![commit(1), commit(3)]);
        assert_eq!(recovery.discarded, 0);
    }

    #[test]
    fn corruption_in_the_middle_is_fatal() {
        let mut data = commit(1).encode().unwrap();
        data.extend_from_slice(&commit(2).encode().unwrap());
        let last = data.len() - 1;
        data[last] ^= 0x01;

        let journal = Journal::new(Box::new(InMemoryBackend::with_data(data)), false);
        assert!(matches!(
            journal.recover(),
            Err(CoreError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn replace_leaves_single_checkpoint() {
        let journal = Journal::new(Box::new(InMemoryBackend::new()), false);
        journal.append(&commit(1)).unwrap();
        journal.append(&commit(2)).unwrap();

        let checkpoint = JournalRecord::Checkpoint {
            sequence: SequenceNumber::new(2),
            state: StoreState::default(),
        };
        journal.replace(&checkpoint).unwrap();
        assert_eq!(journal.read().unwrap().records, vec![checkpoint]);
    }
}
