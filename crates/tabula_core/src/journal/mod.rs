//! Commit journal for durability and crash recovery.
//!
//! Every committed transaction is appended to the journal before it is
//! acknowledged. On open, the journal is replayed to rebuild the store.
//!
//! ## Record Format
//!
//! ```text
//! | magic "TJNL" (4) | version (2) | type (1) | length (4) | payload (N) | crc32 (4) |
//! ```
//!
//! The payload is CBOR. The CRC covers every byte before it.
//!
//! ## Recovery Policy
//!
//! Tolerated, treated as a clean end of log and cut off:
//!
//! - a header shorter than 11 bytes at the end
//! - a payload or checksum running past the end
//!
//! Fatal, the workspace refuses to open:
//!
//! - checksum mismatch
//! - bad magic bytes
//! - unknown record type or a newer format version
//! - a payload that does not decode
//!
//! ## Checkpoints
//!
//! A checkpoint rewrites the journal as a single `Checkpoint` record holding
//! the full store state, so replay cost stays proportional to the data rather
//! than to its history.

mod record;
mod writer;

pub use record::{compute_crc32, JournalRecord, JournalRecordType, JOURNAL_MAGIC, JOURNAL_VERSION};
pub use writer::{Journal, Recovery};
