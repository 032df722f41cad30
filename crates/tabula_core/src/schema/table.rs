//! Table records and typed tables.

use crate::error::{CoreError, CoreResult};
use crate::schema::Column;
use crate::types::{TableId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A table as persisted: the column list is kept as a JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRecord {
    /// Table identifier.
    pub id: TableId,
    /// Display name.
    pub name: String,
    /// Column list document (expected to be an array of [`Column`]).
    pub columns: Value,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last schema change.
    pub updated_at: Timestamp,
}

impl TableRecord {
    /// Decodes the stored column list.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MalformedSchema`] if the document is not a valid
    /// column list.
    pub fn decode_columns(&self) -> CoreResult<Vec<Column>> {
        Vec::<Column>::deserialize(&self.columns).map_err(|e| CoreError::MalformedSchema {
            table_id: self.id.clone(),
            message: e.to_string(),
        })
    }

    /// Returns a copy of this record with a new name and column list.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the columns cannot be encoded.
    pub fn with_schema(&self, name: &str, columns: &[Column], now: Timestamp) -> CoreResult<Self> {
        Ok(Self {
            id: self.id.clone(),
            name: name.to_string(),
            columns: encode_columns(columns)?,
            created_at: self.created_at,
            updated_at: now,
        })
    }
}

/// A table with its decoded schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// Table identifier.
    pub id: TableId,
    /// Display name.
    pub name: String,
    /// Ordered column definitions.
    pub columns: Vec<Column>,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last schema change.
    pub updated_at: Timestamp,
}

impl Table {
    /// Decodes a stored record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MalformedSchema`] if the column list is invalid.
    pub fn from_record(record: &TableRecord) -> CoreResult<Self> {
        Ok(Self {
            id: record.id.clone(),
            name: record.name.clone(),
            columns: record.decode_columns()?,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    /// Encodes this table for storage.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the columns cannot be encoded.
    pub fn to_record(&self) -> CoreResult<TableRecord> {
        Ok(TableRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            columns: encode_columns(&self.columns)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }

    /// Finds a column by id.
    #[must_use]
    pub fn column(&self, id: &crate::types::ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| &c.id == id)
    }
}

/// Caller input for creating or editing a table.
///
/// Both fields are optional on the wire; `create_table` requires them while
/// `update_table` keeps the current value for an absent field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDraft {
    /// Explicit table id on create; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TableId>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Full replacement column list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<Column>>,
}

impl TableDraft {
    /// Creates a draft with a name and columns.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            columns: Some(columns),
        }
    }

    /// Sets an explicit table id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<TableId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// A draft that only replaces the column list.
    #[must_use]
    pub fn columns(columns: Vec<Column>) -> Self {
        Self {
            id: None,
            name: None,
            columns: Some(columns),
        }
    }
}

fn encode_columns(columns: &[Column]) -> CoreResult<Value> {
    serde_json::to_value(columns).map_err(|e| CoreError::codec(e.to_string()))
}
