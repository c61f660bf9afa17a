//! FILENAME: tests/test_grouping.rs
//! Integration tests for the grouping stage: tree shape, key order,
//! leaf conservation and grouping validation.

mod common;

use common::{flat_table, group_keys, orders_table_grouped, OrdersFixture};
use records::Record;
use rowmodel_engine::{ColumnDef, ColumnRegistry, ConfigError, KeyOrder, RecordPredicate, Table};

#[test]
fn test_single_level_grouping_shape() {
    let mut table = orders_table_grouped();
    let tree = table.group_tree();

    assert_eq!(tree.roots().len(), 2);
    let keys: Vec<String> = tree
        .roots()
        .iter()
        .map(|&i| tree.node(i).key.display())
        .collect();
    // First-seen order: "A" appears before "B" in the data
    assert_eq!(keys, vec!["A", "B"]);

    for &root in tree.roots() {
        assert_eq!(tree.node(root).leaf_count(), 3);
    }
}

#[test]
fn test_leaf_conservation_single_level() {
    let mut table = orders_table_grouped();
    let tree = table.group_tree();

    let mut reachable: Vec<usize> = Vec::new();
    for &root in tree.roots() {
        reachable.extend_from_slice(tree.leaf_slice(tree.node(root)));
    }
    reachable.sort_unstable();

    assert_eq!(reachable, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(tree.leaf_count(), OrdersFixture::records().len());
}

#[test]
fn test_leaf_conservation_two_levels() {
    let mut table = orders_table_grouped();
    table
        .set_grouping(vec!["source".to_string(), "product".to_string()])
        .unwrap();
    let tree = table.group_tree();

    // Every leaf is reachable through exactly one deepest-level node
    let mut reachable: Vec<usize> = Vec::new();
    for node in tree.nodes() {
        if node.children.is_empty() {
            reachable.extend_from_slice(tree.leaf_slice(node));
        }
    }
    reachable.sort_unstable();
    assert_eq!(reachable, vec![0, 1, 2, 3, 4, 5]);

    // Depth-1 nodes nest under depth-0 parents keyed by the second column
    let a = tree.node(tree.node_by_id("source:A").unwrap());
    let child_keys: Vec<String> = a
        .children
        .iter()
        .map(|&c| tree.node(c).key.display())
        .collect();
    assert_eq!(child_keys, vec!["Widget", "Gadget"]);
}

#[test]
fn test_grouping_by_derived_boolean_key() {
    let mut table = orders_table_grouped();
    table.set_grouping(vec!["is_purchase".to_string()]).unwrap();

    let tree = table.group_tree();
    let keys: Vec<String> = tree
        .roots()
        .iter()
        .map(|&i| tree.node(i).key.display())
        .collect();
    // ord-1 is purchased, so TRUE is seen first
    assert_eq!(keys, vec!["TRUE", "FALSE"]);

    let purchased = tree.node(tree.node_by_id("is_purchase:TRUE").unwrap());
    assert_eq!(purchased.leaf_count(), 3);
    let rest = tree.node(tree.node_by_id("is_purchase:FALSE").unwrap());
    assert_eq!(rest.leaf_count(), 3);
}

#[test]
fn test_unknown_grouping_column_errors_and_preserves_state() {
    let mut table = orders_table_grouped();

    let err = table
        .set_grouping(vec!["source".to_string(), "bogus".to_string()])
        .unwrap_err();
    assert_eq!(err, ConfigError::UnknownGroupingColumn("bogus".to_string()));

    // The failed call left the previous grouping in place
    assert_eq!(table.state().grouping, vec!["source".to_string()]);
    assert_eq!(table.group_tree().roots().len(), 2);
}

#[test]
fn test_regrouping_replaces_tree() {
    let mut table = orders_table_grouped();
    assert_eq!(table.group_tree().roots().len(), 2);

    table.set_grouping(vec!["product".to_string()]).unwrap();
    let tree = table.group_tree();
    let keys: Vec<String> = tree
        .roots()
        .iter()
        .map(|&i| tree.node(i).key.display())
        .collect();
    assert_eq!(keys, vec!["Widget", "Gadget"]);
}

#[test]
fn test_clearing_grouping_returns_flat_list() {
    let mut table = orders_table_grouped();
    table.set_grouping(Vec::new()).unwrap();

    let rows = table.flattened_rows();
    assert_eq!(rows.len(), 6);
    assert!(rows.iter().all(|r| !r.is_group()));
}

#[test]
fn test_filtered_records_group_in_original_order() {
    let mut table = orders_table_grouped();
    // Keep only amounts >= 15: ord-2 (A), ord-4 (A), ord-5 (B)
    table.set_filter(Some(RecordPredicate::new(|r: &Record| {
        r.field("amount").as_number().unwrap_or(0.0) >= 15.0
    })));

    let tree = table.group_tree();
    assert_eq!(tree.leaf_count(), 3);

    let a = tree.node(tree.node_by_id("source:A").unwrap());
    assert_eq!(a.leaf_count(), 2);
    let b = tree.node(tree.node_by_id("source:B").unwrap());
    assert_eq!(b.leaf_count(), 1);
}

#[test]
fn test_blank_key_bucket_keeps_records() {
    let registry = OrdersFixture::registry();
    let mut table = Table::new(registry);

    let mut records = OrdersFixture::records();
    records.push(Record::new("ord-7").with("amount", 50.0).with("product", "Widget"));
    table.set_records(records);
    table.set_grouping(vec!["source".to_string()]).unwrap();

    let tree = table.group_tree();
    assert_eq!(tree.leaf_count(), 7);

    let blank = tree.node(tree.node_by_id("source:").unwrap());
    assert_eq!(blank.leaf_count(), 1);
    assert_eq!(tree.leaf_slice(blank), &[6]);
}

#[test]
fn test_descending_key_order() {
    let registry = ColumnRegistry::new(vec![
        ColumnDef::new("source").with_key_order(KeyOrder::Descending),
        ColumnDef::new("amount"),
    ])
    .unwrap();
    let mut table = Table::new(registry);
    table.set_records(
        ["B", "A", "C"]
            .iter()
            .enumerate()
            .map(|(i, s)| Record::new(format!("r{}", i)).with("source", *s))
            .collect(),
    );
    table.set_grouping(vec!["source".to_string()]).unwrap();

    let tree = table.group_tree();
    let keys: Vec<String> = tree
        .roots()
        .iter()
        .map(|&i| tree.node(i).key.display())
        .collect();
    assert_eq!(keys, vec!["C", "B", "A"]);
}

#[test]
fn test_nested_grouping_depths_and_parents() {
    let mut table = flat_table(9);
    table
        .set_grouping(vec!["source".to_string(), "amount".to_string()])
        .unwrap();

    let tree = table.group_tree();
    // 3 sources, each with 3 distinct amounts
    assert_eq!(tree.roots().len(), 3);
    for &root in tree.roots() {
        let node = tree.node(root);
        assert_eq!(node.depth, 0);
        assert_eq!(node.children.len(), 3);
        for &child in &node.children {
            assert_eq!(tree.node(child).depth, 1);
            assert_eq!(tree.node(child).parent, Some(root));
        }
    }

    // Flattened fully collapsed: just the three depth-0 group rows
    let rows = table.flattened_rows();
    assert_eq!(group_keys(rows), vec!["A", "B", "C"]);
}
