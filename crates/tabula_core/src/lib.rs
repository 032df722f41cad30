//! # Tabula Core
//!
//! Embedded engine for user-defined tables.
//!
//! This crate provides:
//! - Dynamic table schemas with dictionary and relation pointers
//! - A single-writer record store backed by a checksummed commit journal
//! - Reference resolution and a confirm-then-cascade integrity guardian
//! - An explicit row order overlay
//! - Table snapshots, immutable history entries and revert
//!
//! ## Example
//!
//! ```rust,ignore
//! use tabula_core::{Column, TableDraft, Workspace};
//!
//! let ws = Workspace::open_in_memory()?;
//! let colors = ws.create_table(TableDraft::new("Colors", vec![Column::text("name", "Name")]))?;
//! let history = ws.create_history(&colors.id, HistoryRequest::labeled("initial"))?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod dir;
mod error;
mod guardian;
pub mod journal;
mod order;
mod references;
mod row;
pub mod schema;
pub mod snapshot;
pub mod store;
mod types;
mod workspace;

pub use config::Config;
pub use dir::WorkspaceDir;
pub use error::{CoreError, CoreResult};
pub use guardian::{
    CascadeFailure, ConfirmationRequired, GuardianState, IntegrityGuardian, SchemaApplied,
    SchemaChange, TableDeleted, TableDeletion,
};
pub use order::{merge_rows, RowOrderIndex};
pub use references::{find_references, Reference, ReferenceKind};
pub use row::{Fields, Row, RowOrderEntry};
pub use schema::{
    validate_schema, Column, ColumnKind, DictRef, OptionRenamePolicy, Relation,
    RelationCardinality, Table, TableDraft, TableRecord,
};
pub use snapshot::{
    HistoryEntry, HistoryEntryMeta, HistoryRequest, RevertExecutor, RevertSummary,
    SnapshotEngine, SnapshotRow, TableSnapshot,
};
pub use store::{Mutation, RecordStore, TableReader, TableStore, WriteTransaction};
pub use types::{
    now_millis, ColumnId, HistoryId, RowId, SequenceNumber, TableId, Timestamp, TransactionId,
};
pub use workspace::Workspace;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
