//! # Tabula Storage
//!
//! Byte-level storage backends for the Tabula commit journal.
//!
//! Backends are **opaque byte stores**: they append, read back, flush and
//! truncate. They know nothing about journal records, tables or rows;
//! `tabula_core` owns every byte of format interpretation.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - ephemeral workspaces and tests
//! - [`FileBackend`] - persistent storage through OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use tabula_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! backend.append(b"commit-1").unwrap();
//! backend.append(b"commit-2").unwrap();
//! assert_eq!(backend.read_all().unwrap(), b"commit-1commit-2");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
