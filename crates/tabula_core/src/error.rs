//! Error types for Tabula core.

use crate::types::{HistoryId, RowId, TableId};
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in Tabula core operations.
///
/// Reference conflicts are deliberately absent: a destructive change that
/// needs confirmation is reported as an outcome, not an error.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] tabula_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Journal payload could not be encoded or decoded.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the failure.
        message: String,
    },

    /// Journal is corrupted or invalid.
    #[error("journal corruption: {message}")]
    JournalCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// Checksum mismatch detected while reading the journal.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Expected checksum.
        expected: u32,
        /// Actual checksum.
        actual: u32,
    },

    /// Table not found.
    #[error("table not found: {table_id}")]
    TableNotFound {
        /// The table that was not found.
        table_id: TableId,
    },

    /// Row not found.
    #[error("row not found: {row_id} in table {table_id}")]
    RowNotFound {
        /// The table searched.
        table_id: TableId,
        /// The row that was not found.
        row_id: RowId,
    },

    /// History entry not found, or owned by a different table.
    #[error("history entry not found: {history_id} in table {table_id}")]
    HistoryNotFound {
        /// The table searched.
        table_id: TableId,
        /// The history entry that was not found.
        history_id: HistoryId,
    },

    /// Input rejected before any write.
    #[error("validation failed: {message}")]
    Validation {
        /// What was wrong with the input.
        message: String,
    },

    /// A stored column list could not be decoded.
    #[error("malformed schema for table {table_id}: {message}")]
    MalformedSchema {
        /// The table whose schema is malformed.
        table_id: TableId,
        /// Decoder message.
        message: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },

    /// Workspace directory is locked by another process.
    #[error("workspace locked: another process has exclusive access")]
    WorkspaceLocked,

    /// Invalid workspace layout or format version.
    #[error("invalid workspace format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// Workspace is closed.
    #[error("workspace is closed")]
    WorkspaceClosed,
}

impl CoreError {
    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Creates a journal corruption error.
    pub fn journal_corruption(message: impl Into<String>) -> Self {
        Self::JournalCorruption {
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates a table not found error.
    pub fn table_not_found(table_id: &TableId) -> Self {
        Self::TableNotFound {
            table_id: table_id.clone(),
        }
    }

    /// Creates a row not found error.
    pub fn row_not_found(table_id: &TableId, row_id: &RowId) -> Self {
        Self::RowNotFound {
            table_id: table_id.clone(),
            row_id: row_id.clone(),
        }
    }

    /// Returns true for the `NotFound` family (table, row, history entry).
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TableNotFound { .. } | Self::RowNotFound { .. } | Self::HistoryNotFound { .. }
        )
    }

    /// Returns true for failures of the underlying store or journal.
    #[must_use]
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            Self::Storage(_)
                | Self::Io(_)
                | Self::Codec { .. }
                | Self::JournalCorruption { .. }
                | Self::ChecksumMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_family() {
        let table = TableId::new("t");
        assert!(CoreError::table_not_found(&table).is_not_found());
        assert!(CoreError::row_not_found(&table, &RowId::new("r")).is_not_found());
        assert!(!CoreError::validation("x").is_not_found());
    }

    #[test]
    fn storage_errors_are_persistence_failures() {
        let err: CoreError = tabula_storage::StorageError::Closed.into();
        assert!(err.is_persistence_failure());
        assert_eq!(err.to_string(), "storage error: storage is closed");
    }
}
