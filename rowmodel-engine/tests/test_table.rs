//! FILENAME: tests/test_table.rs
//! Integration tests for the table facade: control API flow, stage
//! memoization, stats and snapshot replacement.

mod common;

use common::{orders_table_grouped, OrdersFixture};
use records::Record;
use rowmodel_engine::{RecordPredicate, Table, TableState};

#[test]
fn test_page_turn_never_rebuilds_upstream_stages() {
    let mut table = orders_table_grouped();
    table.visible_page();
    let before = table.stats();

    table.set_page_index(1);
    table.visible_page();
    table.set_page_index(0);
    table.visible_page();

    let after = table.stats();
    assert_eq!(after.filter_rebuilds, before.filter_rebuilds);
    assert_eq!(after.tree_rebuilds, before.tree_rebuilds);
    assert_eq!(after.flatten_rebuilds, before.flatten_rebuilds);
}

#[test]
fn test_toggle_rebuilds_flatten_but_not_tree() {
    let mut table = orders_table_grouped();
    table.visible_page();
    let before = table.stats();

    table.toggle_group("source:A");
    table.visible_page();

    let after = table.stats();
    assert_eq!(after.tree_rebuilds, before.tree_rebuilds);
    assert_eq!(after.filter_rebuilds, before.filter_rebuilds);
    assert_eq!(after.flatten_rebuilds, before.flatten_rebuilds + 1);
}

#[test]
fn test_filter_change_rebuilds_everything_downstream() {
    let mut table = orders_table_grouped();
    table.visible_page();
    let before = table.stats();

    table.set_filter(Some(RecordPredicate::new(|r: &Record| {
        r.field("source").display() == "A"
    })));
    table.visible_page();

    let after = table.stats();
    assert_eq!(after.filter_rebuilds, before.filter_rebuilds + 1);
    assert_eq!(after.tree_rebuilds, before.tree_rebuilds + 1);
    assert_eq!(after.flatten_rebuilds, before.flatten_rebuilds + 1);
    assert_eq!(after.filtered_count, 3);
}

#[test]
fn test_grouping_change_keeps_filter_stage() {
    let mut table = orders_table_grouped();
    table.visible_page();
    let before = table.stats();

    table.set_grouping(vec!["product".to_string()]).unwrap();
    table.visible_page();

    let after = table.stats();
    assert_eq!(after.filter_rebuilds, before.filter_rebuilds);
    assert_eq!(after.tree_rebuilds, before.tree_rebuilds + 1);
}

#[test]
fn test_repeated_reads_are_free() {
    let mut table = orders_table_grouped();
    table.visible_page();
    let before = table.stats();

    for _ in 0..5 {
        table.visible_page();
        table.flattened_rows();
    }

    assert_eq!(table.stats(), before);
}

#[test]
fn test_stats_counts_reflect_pipeline() {
    let mut table = orders_table_grouped();
    let stats = table.stats();

    assert_eq!(stats.record_count, 6);
    assert_eq!(stats.filtered_count, 6);
    assert_eq!(stats.group_count, 2);
    assert_eq!(stats.visible_row_count, 2);
}

#[test]
fn test_snapshot_replacement_is_wholesale() {
    let mut table = orders_table_grouped();
    assert_eq!(table.stats().record_count, 6);

    table.set_records(vec![
        Record::new("n0").with("source", "C").with("amount", 1.0),
        Record::new("n1").with("source", "C").with("amount", 2.0),
    ]);

    let stats = table.stats();
    assert_eq!(stats.record_count, 2);
    assert_eq!(stats.group_count, 1);

    let rows = table.flattened_rows();
    assert_eq!(rows[0].as_group().unwrap().key.display(), "C");
}

#[test]
fn test_removing_filter_restores_full_set() {
    let mut table = orders_table_grouped();
    table.set_filter(Some(RecordPredicate::new(|r: &Record| {
        r.field("source").display() == "A"
    })));
    assert_eq!(table.stats().filtered_count, 3);

    table.set_filter(None);
    assert_eq!(table.stats().filtered_count, 6);
    assert_eq!(table.stats().group_count, 2);
}

#[test]
fn test_visible_page_is_self_contained() {
    let mut table = orders_table_grouped();
    table.toggle_group("source:A");
    let page = table.visible_page();

    // Mutating the table afterwards does not disturb the captured page
    table.set_grouping(vec!["product".to_string()]).unwrap();
    table.visible_page();

    assert_eq!(page.total_visible_rows, 5);
    assert_eq!(page.rows[0].as_group().unwrap().node_id, "source:A");
    assert_eq!(page.rows[1].as_leaf().unwrap().record.id, "ord-1");
}

#[test]
fn test_state_snapshot_round_trips_without_filter() {
    let mut table = orders_table_grouped();
    table.toggle_group("source:A");
    table.set_page_index(1);
    table.visible_page();

    let json = serde_json::to_string(table.state()).unwrap();
    let restored: TableState = serde_json::from_str(&json).unwrap();

    let mut clone = Table::with_initial(OrdersFixture::registry(), restored).unwrap();
    clone.set_records(OrdersFixture::records());

    assert_eq!(
        clone.flattened_rows().len(),
        table.flattened_rows().len()
    );
}

#[test]
fn test_default_view_state_from_initial() {
    let mut state = TableState::default();
    state.grouping = vec!["source".to_string()];
    let mut table = Table::with_initial(OrdersFixture::registry(), state).unwrap();
    table.set_records(OrdersFixture::records());

    let page = table.visible_page();
    assert_eq!(page.rows.len(), 2);
    assert!(page.rows.iter().all(|r| r.is_group()));
}
