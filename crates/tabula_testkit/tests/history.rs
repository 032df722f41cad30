//! Snapshots, history entries and revert through the workspace facade.

use proptest::prelude::*;
use serde_json::json;
use tabula_core::{Column, HistoryRequest, RowId, TableDraft, TableId};
use tabula_testkit::generators::{columns_strategy, fields_strategy, permutation_strategy};
use tabula_testkit::scenarios::{fields, linked_tables, single_table};
use tabula_testkit::{with_temp_workspace, TestWorkspace};

#[test]
fn revert_restores_edited_value() {
    let ws = TestWorkspace::memory();
    let table = ws
        .create_table(TableDraft::new("T", vec![Column::text("a", "A")]))
        .unwrap();
    ws.create_row(&table.id, fields(json!({"id": "r1", "a": "x"})))
        .unwrap();

    let snapshot = ws.capture_snapshot(&table.id).unwrap();
    assert_eq!(snapshot.order, Some(vec![RowId::new("r1")]));

    let meta = ws
        .create_history(
            &table.id,
            HistoryRequest {
                snapshot: Some(snapshot),
                ..HistoryRequest::labeled("checkpoint")
            },
        )
        .unwrap();
    ws.update_row(&table.id, &"r1".into(), fields(json!({"a": "y"})))
        .unwrap();
    assert_eq!(ws.get_row(&table.id, &"r1".into()).unwrap().fields["a"], json!("y"));

    ws.revert_history(&table.id, &meta.id).unwrap();
    assert_eq!(ws.get_row(&table.id, &"r1".into()).unwrap().fields["a"], json!("x"));
}

#[test]
fn auto_captured_entry_returns_metadata_then_full_snapshot() {
    let ws = TestWorkspace::memory();
    let linked = linked_tables(&ws);

    let meta = ws
        .create_history(
            &linked.products,
            HistoryRequest {
                label: Some("before import".into()),
                actor: Some("sam".into()),
                ..HistoryRequest::default()
            },
        )
        .unwrap();
    let meta_json = serde_json::to_value(&meta).unwrap();
    assert!(meta_json.get("snapshot").is_none());
    assert_eq!(meta_json["actor"], json!("sam"));

    let listed = ws.list_history(&linked.products, None).unwrap();
    assert_eq!(listed, vec![meta.clone()]);

    let entry = ws.get_history(&linked.products, &meta.id).unwrap();
    assert_eq!(entry.snapshot.name, "Products");
    assert_eq!(entry.snapshot.rows.len(), 2);
    assert_eq!(entry.snapshot.rows[0].fields["title"], json!("Mug"));

    let entry_json = serde_json::to_value(&entry).unwrap();
    assert_eq!(entry_json["snapshot"]["rows"][0]["id"], json!("p1"));
    assert_eq!(entry_json["snapshot"]["columns"][1]["dictRef"]["tableId"], json!("colors"));
}

#[test]
fn revert_to_history_with_other_table_id_is_not_found() {
    let ws = TestWorkspace::memory();
    let linked = linked_tables(&ws);
    let meta = ws
        .create_history(&linked.colors, HistoryRequest::default())
        .unwrap();

    let err = ws.revert_history(&linked.products, &meta.id).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn revert_brings_back_deleted_rows_and_order() {
    let ws = TestWorkspace::memory();
    let (table, ids) = single_table(&ws, 4);
    ws.set_order(&table, ids.iter().rev().cloned().collect())
        .unwrap();
    let meta = ws.create_history(&table, HistoryRequest::default()).unwrap();

    ws.delete_row(&table, &ids[1]).unwrap();
    ws.create_row(&table, fields(json!({"id": "extra", "a": 99})))
        .unwrap();
    ws.set_order(&table, vec!["extra".into()]).unwrap();

    let summary = ws.revert_history(&table, &meta.id).unwrap();
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.deleted, 1);

    let view: Vec<RowId> = ws.list_rows(&table).unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(view, ids.iter().rev().cloned().collect::<Vec<_>>());
}

#[test]
fn history_limit_and_clear() {
    with_temp_workspace(|ws| {
        let (table, _) = single_table(ws, 1);
        for i in 0..5 {
            ws.create_history(&table, HistoryRequest::labeled(format!("v{i}")))
                .unwrap();
        }
        let labels: Vec<String> = ws
            .list_history(&table, Some(2))
            .unwrap()
            .into_iter()
            .filter_map(|m| m.label)
            .collect();
        assert_eq!(labels, ["v4", "v3"]);

        assert_eq!(ws.clear_history(&table).unwrap(), 5);
        assert!(ws.list_history(&table, None).unwrap().is_empty());
        assert_eq!(ws.clear_history(&TableId::new("ghost")).unwrap(), 0);
    });
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn reverting_to_a_fresh_capture_changes_nothing(
        (columns, payloads) in columns_strategy(4).prop_flat_map(|columns| {
            let rows = prop::collection::vec(fields_strategy(&columns), 0..6);
            (Just(columns), rows)
        }),
        shuffle_seed in permutation_strategy((0..6).map(|i| RowId::new(format!("r{i}"))).collect()),
    ) {
        let ws = TestWorkspace::memory();
        let table = ws.create_table(TableDraft::new("P", columns)).unwrap();
        let mut ids = Vec::new();
        for (i, mut payload) in payloads.into_iter().enumerate() {
            payload.insert("id".into(), json!(format!("r{i}")));
            ids.push(ws.create_row(&table.id, payload).unwrap().id);
        }
        let order: Vec<RowId> = shuffle_seed.into_iter().filter(|id| ids.contains(id)).collect();
        ws.set_order(&table.id, order).unwrap();

        let before = ws.capture_snapshot(&table.id).unwrap();
        let meta = ws.create_history(&table.id, HistoryRequest::default()).unwrap();
        ws.revert_history(&table.id, &meta.id).unwrap();
        let after = ws.capture_snapshot(&table.id).unwrap();

        prop_assert_eq!(before, after);
    }
}
