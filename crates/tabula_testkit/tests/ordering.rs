//! Row order overlay through the workspace facade.

use proptest::prelude::*;
use serde_json::json;
use tabula_core::RowId;
use tabula_testkit::generators::permutation_strategy;
use tabula_testkit::scenarios::{fields, single_table};
use tabula_testkit::TestWorkspace;

#[test]
fn partial_order_puts_unordered_rows_last() {
    let ws = TestWorkspace::memory();
    let (table, ids) = single_table(&ws, 4);
    ws.set_order(&table, vec![ids[3].clone(), ids[1].clone()])
        .unwrap();

    let view: Vec<RowId> = ws.list_rows(&table).unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(
        view,
        vec![ids[3].clone(), ids[1].clone(), ids[0].clone(), ids[2].clone()]
    );
}

#[test]
fn deleted_row_leaves_order() {
    let ws = TestWorkspace::memory();
    let (table, ids) = single_table(&ws, 3);
    ws.set_order(&table, ids.clone()).unwrap();
    ws.delete_row(&table, &ids[0]).unwrap();

    assert_eq!(ws.get_order(&table).unwrap(), ids[1..].to_vec());
}

#[test]
fn new_rows_follow_ordered_rows() {
    let ws = TestWorkspace::memory();
    let (table, ids) = single_table(&ws, 2);
    ws.set_order(&table, vec![ids[1].clone(), ids[0].clone()])
        .unwrap();
    ws.create_row(&table, fields(json!({"id": "late", "a": 0})))
        .unwrap();

    let last = ws.list_rows(&table).unwrap().pop().unwrap();
    assert_eq!(last.id, RowId::new("late"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn set_order_then_get_order_round_trips(
        perm in permutation_strategy((0..6).map(|i| RowId::new(format!("r{i}"))).collect())
    ) {
        let ws = TestWorkspace::memory();
        let (table, _) = single_table(&ws, 6);

        ws.set_order(&table, perm.clone()).unwrap();
        prop_assert_eq!(ws.get_order(&table).unwrap(), perm.clone());

        let view: Vec<RowId> = ws.list_rows(&table).unwrap().into_iter().map(|r| r.id).collect();
        prop_assert_eq!(view, perm);
    }
}
