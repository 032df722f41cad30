//! Column definitions.

use crate::types::{ColumnId, TableId};
use serde::{Deserialize, Serialize};

/// A column definition.
///
/// Serialized with camelCase keys and the kind flattened under `type`:
///
/// ```json
/// {"id": "status", "name": "Status", "type": "select",
///  "options": ["open", "done"], "isMultiSelect": false,
///  "dictRef": {"tableId": "statuses", "columnId": "label"}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Identifier, unique within the owning table.
    pub id: ColumnId,
    /// Display name.
    pub name: String,
    /// Type discriminator and type-specific settings.
    #[serde(flatten)]
    pub kind: ColumnKind,
    /// Weak pointer to a column that sources this column's values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dict_ref: Option<DictRef>,
    /// Weak join-like link to a column in another table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<Relation>,
}

/// The `type` of a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ColumnKind {
    /// Free text.
    Text,
    /// Numeric value.
    Number,
    /// Date or date-time string.
    Date,
    /// Boolean flag.
    Checkbox,
    /// URL string.
    Url,
    /// Email address.
    Email,
    /// Reference to an uploaded file, stored opaquely.
    File,
    /// One or several values from a fixed option list.
    Select {
        /// Allowed values, in display order.
        #[serde(default)]
        options: Vec<String>,
        /// Whether a cell holds an array of options.
        #[serde(default, rename = "isMultiSelect")]
        is_multi_select: bool,
    },
    /// Values are row ids of the relation's target table.
    Relation,
}

/// Weak reference to a column whose values feed this column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictRef {
    /// Referenced table.
    pub table_id: TableId,
    /// Referenced column in that table.
    pub column_id: ColumnId,
}

/// Cardinality of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationCardinality {
    /// A cell links to at most one row.
    Single,
    /// A cell links to any number of rows.
    Multiple,
}

/// Weak join-like link to another table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    /// Linked table.
    pub target_table_id: TableId,
    /// Column of the linked table used as the join key.
    pub target_column_id: ColumnId,
    /// Column of the linked table shown to users.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_column_id: Option<ColumnId>,
    /// Single or multiple.
    #[serde(rename = "type")]
    pub cardinality: RelationCardinality,
}

impl Relation {
    /// Returns true if the relation names `column` as its key or display column.
    #[must_use]
    pub fn touches_column(&self, column: &ColumnId) -> bool {
        &self.target_column_id == column || self.display_column_id.as_ref() == Some(column)
    }
}

impl Column {
    /// Creates a column of the given kind without references.
    pub fn new(id: impl Into<ColumnId>, name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            dict_ref: None,
            relation: None,
        }
    }

    /// Creates a text column.
    pub fn text(id: impl Into<ColumnId>, name: impl Into<String>) -> Self {
        Self::new(id, name, ColumnKind::Text)
    }

    /// Creates a number column.
    pub fn number(id: impl Into<ColumnId>, name: impl Into<String>) -> Self {
        Self::new(id, name, ColumnKind::Number)
    }

    /// Creates a single-value select column.
    pub fn select<I, S>(id: impl Into<ColumnId>, name: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            id,
            name,
            ColumnKind::Select {
                options: options.into_iter().map(Into::into).collect(),
                is_multi_select: false,
            },
        )
    }

    /// Attaches a dictionary reference.
    #[must_use]
    pub fn with_dict_ref(mut self, table_id: impl Into<TableId>, column_id: impl Into<ColumnId>) -> Self {
        self.dict_ref = Some(DictRef {
            table_id: table_id.into(),
            column_id: column_id.into(),
        });
        self
    }

    /// Attaches a relation.
    #[must_use]
    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relation = Some(relation);
        self
    }

    /// Returns the select options, if this is a select column.
    #[must_use]
    pub fn options(&self) -> Option<&[String]> {
        match &self.kind {
            ColumnKind::Select { options, .. } => Some(options),
            _ => None,
        }
    }

    /// Returns true for multi-select columns.
    #[must_use]
    pub fn is_multi_select(&self) -> bool {
        matches!(
            self.kind,
            ColumnKind::Select {
                is_multi_select: true,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn select_column_json_shape() {
        let column = Column::select("status", "Status", ["open", "done"])
            .with_dict_ref("statuses", "label");
        let value = serde_json::to_value(&column).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "status",
                "name": "Status",
                "type": "select",
                "options": ["open", "done"],
                "isMultiSelect": false,
                "dictRef": {"tableId": "statuses", "columnId": "label"}
            })
        );
    }

    #[test]
    fn relation_column_parses() {
        let column: Column = serde_json::from_value(json!({
            "id": "owner",
            "name": "Owner",
            "type": "relation",
            "relation": {
                "targetTableId": "people",
                "targetColumnId": "id",
                "displayColumnId": "name",
                "type": "multiple"
            }
        }))
        .unwrap();

        assert_eq!(column.kind, ColumnKind::Relation);
        let relation = column.relation.unwrap();
        assert_eq!(relation.cardinality, RelationCardinality::Multiple);
        assert!(relation.touches_column(&ColumnId::new("name")));
        assert!(!relation.touches_column(&ColumnId::new("email")));
    }

    #[test]
    fn missing_select_settings_default() {
        let column: Column =
            serde_json::from_value(json!({"id": "c", "name": "C", "type": "select"})).unwrap();
        assert_eq!(column.options(), Some(&[][..]));
        assert!(!column.is_multi_select());
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result: Result<Column, _> =
            serde_json::from_value(json!({"id": "c", "name": "C", "type": "hologram"}));
        assert!(result.is_err());
    }
}
