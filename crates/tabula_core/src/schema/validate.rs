//! Schema validation run before any write.

use crate::error::{CoreError, CoreResult};
use crate::schema::Column;
use crate::types::TableId;
use std::collections::HashSet;

/// Validates a table name and column list.
///
/// Rejects an empty name, empty or duplicate column ids, and any column whose
/// `dictRef` or `relation` points back at its own table.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] describing the first problem found.
pub fn validate_schema(table_id: &TableId, name: &str, columns: &[Column]) -> CoreResult<()> {
    if name.trim().is_empty() {
        return Err(CoreError::validation("table name must not be empty"));
    }

    let mut seen = HashSet::with_capacity(columns.len());
    for column in columns {
        if column.id.as_str().is_empty() {
            return Err(CoreError::validation(format!(
                "column '{}' has an empty id",
                column.name
            )));
        }
        if !seen.insert(&column.id) {
            return Err(CoreError::validation(format!(
                "duplicate column id '{}'",
                column.id
            )));
        }
        if column
            .dict_ref
            .as_ref()
            .is_some_and(|r| &r.table_id == table_id)
        {
            return Err(CoreError::validation(format!(
                "column '{}' cannot reference its own table through dictRef",
                column.id
            )));
        }
        if column
            .relation
            .as_ref()
            .is_some_and(|r| &r.target_table_id == table_id)
        {
            return Err(CoreError::validation(format!(
                "column '{}' cannot relate to its own table",
                column.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Relation, RelationCardinality};

    fn table() -> TableId {
        TableId::new("orders")
    }

    #[test]
    fn accepts_plain_schema() {
        let columns = vec![Column::text("a", "A"), Column::number("b", "B")];
        assert!(validate_schema(&table(), "Orders", &columns).is_ok());
    }

    #[test]
    fn rejects_blank_name() {
        assert!(matches!(
            validate_schema(&table(), "  ", &[]),
            Err(CoreError::Validation { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let columns = vec![Column::text("a", "A"), Column::number("a", "Again")];
        let err = validate_schema(&table(), "Orders", &columns).unwrap_err();
        assert!(err.to_string().contains("duplicate column id 'a'"));
    }

    #[test]
    fn rejects_self_dict_ref() {
        let columns = vec![Column::text("a", "A").with_dict_ref("orders", "b")];
        assert!(validate_schema(&table(), "Orders", &columns).is_err());
    }

    #[test]
    fn rejects_self_relation() {
        let columns = vec![Column::text("a", "A").with_relation(Relation {
            target_table_id: table(),
            target_column_id: "b".into(),
            display_column_id: None,
            cardinality: RelationCardinality::Single,
        })];
        assert!(validate_schema(&table(), "Orders", &columns).is_err());
    }

    #[test]
    fn references_to_other_tables_are_fine() {
        let columns = vec![Column::text("a", "A").with_dict_ref("customers", "name")];
        assert!(validate_schema(&table(), "Orders", &columns).is_ok());
    }
}
