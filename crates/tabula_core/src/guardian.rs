//! Destructive schema changes gated by reference checks.
//!
//! Removing a column, or a whole table, that other tables point at would leave
//! dangling `dictRef`/`relation` entries behind. The guardian resolves those
//! references first. Without confirmation it stops and reports them; with
//! confirmation it applies the change and then strips the dangling pointers
//! from each referencing table.
//!
//! ## States
//!
//! ```text
//! Requested ──► NeedsConfirmation                  (nothing written)
//! Requested ──► Applying ──► Cascading ──► Committed
//! ```
//!
//! Cascade writes are separate commits from the primary change. A failed
//! cascade write is logged, reported in the outcome and never undoes the
//! primary change.

use crate::error::{CoreError, CoreResult};
use crate::references::{find_references, Reference};
use crate::schema::{
    rename_option_values, validate_schema, Column, OptionRenamePolicy, Table, TableDraft,
    TableRecord,
};
use crate::store::{Mutation, TableReader, TableStore};
use crate::types::{now_millis, ColumnId, TableId};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Position of a guarded change in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardianState {
    /// Change received, references not yet checked.
    Requested,
    /// References found and the caller has not confirmed; nothing written.
    NeedsConfirmation,
    /// Primary change being written.
    Applying,
    /// Dangling references being stripped.
    Cascading,
    /// Done.
    Committed,
}

impl fmt::Display for GuardianState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Requested => "requested",
            Self::NeedsConfirmation => "needs-confirmation",
            Self::Applying => "applying",
            Self::Cascading => "cascading",
            Self::Committed => "committed",
        };
        f.write_str(name)
    }
}

/// A destructive change that must be confirmed before it is applied.
///
/// Serializes as `{"needsConfirmation": true, "message": .., "references": [..]}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequired {
    /// Human-readable description of what would break.
    pub message: String,
    /// Columns elsewhere that point at what would be removed.
    pub references: Vec<Reference>,
}

impl Serialize for ConfirmationRequired {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("needsConfirmation", &true)?;
        map.serialize_entry("message", &self.message)?;
        map.serialize_entry("references", &self.references)?;
        map.end()
    }
}

/// A referencing table that could not be cleaned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeFailure {
    /// Table left with a dangling reference.
    pub table_id: TableId,
    /// Why the cleanup write failed.
    pub message: String,
}

/// Result of an applied schema update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaApplied {
    /// The table as stored after the update.
    pub table: Table,
    /// Referencing tables whose dangling pointers were stripped.
    pub cleaned_tables: Vec<TableId>,
    /// Referencing tables that could not be cleaned.
    pub cascade_failures: Vec<CascadeFailure>,
    /// Rows whose select values were rewritten by option renames.
    pub renamed_values: usize,
    /// Set when some cascade write failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Outcome of [`IntegrityGuardian::update_schema`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SchemaChange {
    /// Nothing was written; confirm to proceed.
    NeedsConfirmation(ConfirmationRequired),
    /// The update was applied.
    Applied(SchemaApplied),
}

impl SchemaChange {
    /// Returns true if the caller must confirm.
    #[must_use]
    pub fn needs_confirmation(&self) -> bool {
        matches!(self, Self::NeedsConfirmation(_))
    }

    /// Returns the applied outcome, if any.
    #[must_use]
    pub fn applied(&self) -> Option<&SchemaApplied> {
        match self {
            Self::Applied(applied) => Some(applied),
            Self::NeedsConfirmation(_) => None,
        }
    }
}

/// Result of a completed table deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDeleted {
    /// The deleted table.
    pub table_id: TableId,
    /// Tables whose `dictRef`s to the deleted table were stripped.
    pub updated_references: Vec<TableId>,
    /// Referencing tables that could not be cleaned.
    pub cascade_failures: Vec<CascadeFailure>,
    /// Set when some cascade write failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Outcome of [`IntegrityGuardian::delete_table`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TableDeletion {
    /// Nothing was written; confirm to proceed.
    NeedsConfirmation(ConfirmationRequired),
    /// The table is gone.
    Deleted(TableDeleted),
}

impl TableDeletion {
    /// Returns true if the caller must confirm.
    #[must_use]
    pub fn needs_confirmation(&self) -> bool {
        matches!(self, Self::NeedsConfirmation(_))
    }
}

/// Applies schema updates and table deletions with reference checks.
#[derive(Debug)]
pub struct IntegrityGuardian<'a, S> {
    store: &'a S,
    policy: OptionRenamePolicy,
}

impl<'a, S: TableStore> IntegrityGuardian<'a, S> {
    /// Creates a guardian over `store`.
    pub fn new(store: &'a S, policy: OptionRenamePolicy) -> Self {
        Self { store, policy }
    }

    /// Replaces a table's name and/or column list.
    ///
    /// Columns present before and absent from `draft.columns` are deleted.
    /// If columns in other tables reference a deleted column and `confirmed`
    /// is false, nothing is written and the references are returned.
    /// Otherwise the schema is written together with option-rename rewrites
    /// of this table's rows, then every referencing column loses its
    /// `dictRef`/`relation` to the deleted columns.
    ///
    /// # Errors
    ///
    /// - [`CoreError::TableNotFound`] if the table is absent
    /// - [`CoreError::Validation`] if the new schema is invalid
    /// - the primary commit error; cascade failures are reported in the
    ///   outcome instead
    pub fn update_schema(
        &self,
        table_id: &TableId,
        draft: TableDraft,
        confirmed: bool,
    ) -> CoreResult<SchemaChange> {
        let mut state = GuardianState::Requested;
        let record = self
            .store
            .table_record(table_id)?
            .ok_or_else(|| CoreError::table_not_found(table_id))?;

        let old_columns = record.decode_columns().unwrap_or_else(|e| {
            warn!(table_id = %table_id, error = %e, "replacing malformed schema");
            Vec::new()
        });
        let name = draft.name.unwrap_or_else(|| record.name.clone());
        let new_columns = draft.columns.unwrap_or_else(|| old_columns.clone());
        validate_schema(table_id, &name, &new_columns)?;

        let deleted: Vec<&Column> = old_columns
            .iter()
            .filter(|old| new_columns.iter().all(|new| new.id != old.id))
            .collect();

        let mut references: Vec<Reference> = Vec::new();
        if !deleted.is_empty() {
            let tables = self.store.table_records()?;
            for column in &deleted {
                for reference in find_references(&tables, table_id, Some(&column.id)) {
                    if &reference.table_id != table_id && !references.contains(&reference) {
                        references.push(reference);
                    }
                }
            }
        }

        if !references.is_empty() && !confirmed {
            self.transition(table_id, &mut state, GuardianState::NeedsConfirmation);
            let names: Vec<&str> = deleted.iter().map(|c| c.name.as_str()).collect();
            return Ok(SchemaChange::NeedsConfirmation(ConfirmationRequired {
                message: format!(
                    "deleting column(s) {} breaks {} reference(s) from other tables; \
                     confirm to delete and clear them",
                    quoted(&names),
                    references.len()
                ),
                references,
            }));
        }

        self.transition(table_id, &mut state, GuardianState::Applying);
        let now = now_millis();
        let updated = record.with_schema(&name, &new_columns, now)?;
        let renames = self.policy.detect(&old_columns, &new_columns);
        let renamed_values = self.store.transaction(|txn| {
            txn.put_table(updated.clone());
            let mut count = 0;
            if !renames.is_empty() {
                for mut row in txn.rows(table_id)?.unwrap_or_default() {
                    if rename_option_values(&mut row.fields, &renames) {
                        row.updated_at = now;
                        txn.put_row(row);
                        count += 1;
                    }
                }
            }
            Ok(count)
        })?;

        self.transition(table_id, &mut state, GuardianState::Cascading);
        let deleted_ids: Vec<ColumnId> = deleted.iter().map(|c| c.id.clone()).collect();
        let (cleaned_tables, cascade_failures) =
            self.cascade(&references, |column| strip_column_refs(column, table_id, &deleted_ids));

        self.transition(table_id, &mut state, GuardianState::Committed);
        Ok(SchemaChange::Applied(SchemaApplied {
            table: Table {
                id: updated.id,
                name,
                columns: new_columns,
                created_at: updated.created_at,
                updated_at: updated.updated_at,
            },
            cleaned_tables,
            warning: cascade_warning(&cascade_failures),
            cascade_failures,
            renamed_values,
        }))
    }

    /// Deletes a table with its rows, order and history.
    ///
    /// If other tables reference it and `confirmed` is false, nothing is
    /// written. Otherwise each referencing table loses its `dictRef`s to the
    /// deleted table; `relation`s are left in place. Then the table is
    /// deleted.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TableNotFound`] if the table is absent, or the
    /// commit error of the deletion itself.
    pub fn delete_table(&self, table_id: &TableId, confirmed: bool) -> CoreResult<TableDeletion> {
        let mut state = GuardianState::Requested;
        let record = self
            .store
            .table_record(table_id)?
            .ok_or_else(|| CoreError::table_not_found(table_id))?;

        let references: Vec<Reference> =
            find_references(&self.store.table_records()?, table_id, None)
                .into_iter()
                .filter(|r| &r.table_id != table_id)
                .collect();

        if !references.is_empty() && !confirmed {
            self.transition(table_id, &mut state, GuardianState::NeedsConfirmation);
            return Ok(TableDeletion::NeedsConfirmation(ConfirmationRequired {
                message: format!(
                    "table '{}' is referenced by {} column(s) in other tables; \
                     confirm to delete it and clear those references",
                    record.name,
                    references.len()
                ),
                references,
            }));
        }

        self.transition(table_id, &mut state, GuardianState::Cascading);
        let (updated_references, cascade_failures) =
            self.cascade(&references, |column| strip_dict_ref(column, table_id));

        self.transition(table_id, &mut state, GuardianState::Applying);
        self.store.apply(vec![Mutation::DeleteTable {
            table_id: table_id.clone(),
        }])?;

        self.transition(table_id, &mut state, GuardianState::Committed);
        Ok(TableDeletion::Deleted(TableDeleted {
            table_id: table_id.clone(),
            updated_references,
            warning: cascade_warning(&cascade_failures),
            cascade_failures,
        }))
    }

    fn transition(&self, table_id: &TableId, state: &mut GuardianState, next: GuardianState) {
        debug!(table_id = %table_id, from = %state, to = %next, "guardian transition");
        *state = next;
    }

    /// Rewrites every referencing table with `strip`, one commit per table.
    fn cascade<F>(&self, references: &[Reference], strip: F) -> (Vec<TableId>, Vec<CascadeFailure>)
    where
        F: Fn(&mut Column) -> bool,
    {
        let mut targets: Vec<&TableId> = Vec::new();
        for reference in references {
            if !targets.contains(&&reference.table_id) {
                targets.push(&reference.table_id);
            }
        }

        let mut cleaned = Vec::new();
        let mut failures = Vec::new();
        for table_id in targets {
            match self.clean_table(table_id, &strip) {
                Ok(true) => cleaned.push(table_id.clone()),
                Ok(false) => {}
                Err(e) => {
                    warn!(table_id = %table_id, error = %e, "reference cleanup failed");
                    failures.push(CascadeFailure {
                        table_id: table_id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }
        (cleaned, failures)
    }

    fn clean_table<F>(&self, table_id: &TableId, strip: &F) -> CoreResult<bool>
    where
        F: Fn(&mut Column) -> bool,
    {
        let Some(record) = self.store.table_record(table_id)? else {
            return Ok(false);
        };
        let mut columns = record.decode_columns()?;
        let mut changed = false;
        for column in &mut columns {
            changed |= strip(column);
        }
        if !changed {
            return Ok(false);
        }
        let cleaned: TableRecord = record.with_schema(&record.name, &columns, now_millis())?;
        self.store.apply(vec![Mutation::PutTable(cleaned)])?;
        Ok(true)
    }
}

/// Drops `dictRef`/`relation` pointing at any of `deleted` in `table_id`.
fn strip_column_refs(column: &mut Column, table_id: &TableId, deleted: &[ColumnId]) -> bool {
    let mut changed = false;
    if column
        .dict_ref
        .as_ref()
        .is_some_and(|r| &r.table_id == table_id && deleted.contains(&r.column_id))
    {
        column.dict_ref = None;
        changed = true;
    }
    if column.relation.as_ref().is_some_and(|r| {
        &r.target_table_id == table_id && deleted.iter().any(|c| r.touches_column(c))
    }) {
        column.relation = None;
        changed = true;
    }
    changed
}

/// Drops a `dictRef` into `table_id`.
fn strip_dict_ref(column: &mut Column, table_id: &TableId) -> bool {
    if column
        .dict_ref
        .as_ref()
        .is_some_and(|r| &r.table_id == table_id)
    {
        column.dict_ref = None;
        true
    } else {
        false
    }
}

fn cascade_warning(failures: &[CascadeFailure]) -> Option<String> {
    (!failures.is_empty()).then(|| {
        format!(
            "{} referencing table(s) could not be cleaned and still point at removed data",
            failures.len()
        )
    })
}

fn quoted(names: &[&str]) -> String {
    names
        .iter()
        .map(|n| format!("'{n}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
