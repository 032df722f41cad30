//! Select option renaming.
//!
//! Editing a select column's option list carries no explicit rename mapping.
//! Under [`OptionRenamePolicy::PositionAligned`] the old option at index `i`
//! is taken to be renamed to the new option at index `i`, and stored cell
//! values are rewritten accordingly. Inserting or reordering options therefore
//! renames values too; callers that need other behaviour disable the policy.

use crate::schema::Column;
use crate::types::ColumnId;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// How option list edits are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptionRenamePolicy {
    /// Old option `i` becomes new option `i`.
    #[default]
    PositionAligned,
    /// Option edits never touch stored values.
    Disabled,
}

/// One option renamed in one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionRename {
    /// The select column.
    pub column_id: ColumnId,
    /// Previous option text.
    pub from: String,
    /// New option text.
    pub to: String,
}

impl OptionRenamePolicy {
    /// Computes the renames implied by replacing `old` columns with `new`.
    #[must_use]
    pub fn detect(self, old: &[Column], new: &[Column]) -> Vec<OptionRename> {
        if self == Self::Disabled {
            return Vec::new();
        }

        let mut renames = Vec::new();
        for column in new {
            let Some(new_options) = column.options() else {
                continue;
            };
            let Some(old_options) = old
                .iter()
                .find(|c| c.id == column.id)
                .and_then(Column::options)
            else {
                continue;
            };

            for (from, to) in old_options.iter().zip(new_options) {
                if from != to {
                    renames.push(OptionRename {
                        column_id: column.id.clone(),
                        from: from.clone(),
                        to: to.clone(),
                    });
                }
            }
        }
        renames
    }
}

/// Rewrites renamed option values in one row's fields.
///
/// All renames of a column are applied simultaneously, so swapping two
/// options swaps the stored values. Returns true if any value changed.
pub fn rename_option_values(fields: &mut Map<String, Value>, renames: &[OptionRename]) -> bool {
    let mut by_column: HashMap<&str, HashMap<&str, &str>> = HashMap::new();
    for rename in renames {
        by_column
            .entry(rename.column_id.as_str())
            .or_default()
            .insert(rename.from.as_str(), rename.to.as_str());
    }

    let mut changed = false;
    for (column, mapping) in by_column {
        let Some(value) = fields.get_mut(column) else {
            continue;
        };
        match value {
            Value::String(s) => {
                if let Some(to) = mapping.get(s.as_str()) {
                    *s = (*to).to_string();
                    changed = true;
                }
            }
            Value::Array(items) => {
                for item in items.iter_mut() {
                    if let Value::String(s) = item {
                        if let Some(to) = mapping.get(s.as_str()) {
                            *s = (*to).to_string();
                            changed = true;
                        }
                    }
                }
            }
            _ => {}
        }
    }
    changed
}
