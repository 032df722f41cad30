//! Dynamic table schemas.
//!
//! A table's schema is data, not a compile-time type: an ordered list of
//! [`Column`] definitions, each a tagged [`ColumnKind`] that may additionally
//! carry a weak [`DictRef`] or [`Relation`] pointer into another table.
//!
//! The store keeps column lists as JSON documents ([`TableRecord`]) and decodes
//! them on read, so a malformed list is discovered per table instead of
//! poisoning every read.

mod column;
mod options;
mod table;
mod validate;

pub use column::{Column, ColumnKind, DictRef, Relation, RelationCardinality};
pub use options::{rename_option_values, OptionRename, OptionRenamePolicy};
pub use table::{Table, TableDraft, TableRecord};
pub use validate::validate_schema;
