//! Property-based test generators using proptest.
//!
//! Provides strategies for generating table schemas, field payloads and
//! row orders that satisfy the store's invariants.

use proptest::prelude::*;
use serde_json::{json, Value};
use tabula_core::{Column, ColumnId, Fields, RowId};

/// Strategy for generating column ids.
pub fn column_id_strategy() -> impl Strategy<Value = ColumnId> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,11}")
        .expect("Invalid regex")
        .prop_map(ColumnId::new)
}

/// Strategy for generating a column list with unique ids and no references.
pub fn columns_strategy(max: usize) -> impl Strategy<Value = Vec<Column>> {
    prop::collection::btree_set(column_id_strategy(), 1..=max.max(1)).prop_flat_map(|ids| {
        let ids: Vec<ColumnId> = ids.into_iter().collect();
        let len = ids.len();
        prop::collection::vec(0u8..3, len).prop_map(move |kinds| {
            ids.iter()
                .zip(kinds)
                .map(|(id, kind)| {
                    let name = id.as_str().to_uppercase();
                    match kind {
                        0 => Column::text(id.clone(), name),
                        1 => Column::number(id.clone(), name),
                        _ => Column::select(id.clone(), name, ["a", "b", "c"]),
                    }
                })
                .collect()
        })
    })
}

/// Strategy for generating a scalar JSON cell value.
pub fn cell_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "[a-z ]{0,16}".prop_map(Value::String),
    ]
}

/// Strategy for generating a field payload for `columns`.
pub fn fields_strategy(columns: &[Column]) -> impl Strategy<Value = Fields> {
    let keys: Vec<String> = columns.iter().map(|c| c.id.as_str().to_string()).collect();
    let len = keys.len();
    prop::collection::vec(cell_value_strategy(), len).prop_map(move |values| {
        keys.iter().cloned().zip(values).collect::<Fields>()
    })
}

/// Strategy for generating `count` distinct row ids.
pub fn row_ids_strategy(count: usize) -> impl Strategy<Value = Vec<RowId>> {
    Just((0..count).map(|i| RowId::new(format!("r{i}"))).collect::<Vec<_>>())
}

/// Strategy for generating a permutation of `ids`.
pub fn permutation_strategy(ids: Vec<RowId>) -> impl Strategy<Value = Vec<RowId>> {
    Just(ids).prop_shuffle()
}
