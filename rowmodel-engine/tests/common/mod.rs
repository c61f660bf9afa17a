//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for row-model engine integration tests.

use records::{FieldValue, Record};
use rowmodel_engine::{
    AggregateSpec, ColumnDef, ColumnRegistry, DisplayRow, Table,
};

/// Six orders across two link sources, the canonical small dataset:
/// amounts sum to 45 under "A" and 35 under "B", purchases count 2
/// under "A" and 1 under "B".
pub struct OrdersFixture;

impl OrdersFixture {
    /// (id, source, amount, purchase_date, product)
    pub fn data() -> Vec<(&'static str, &'static str, Option<f64>, Option<&'static str>, &'static str)> {
        vec![
            ("ord-1", "A", Some(10.0), Some("01.02.2024"), "Widget"),
            ("ord-2", "A", Some(20.0), None, "Widget"),
            ("ord-3", "B", Some(5.0), Some("03.02.2024"), "Gadget"),
            ("ord-4", "A", Some(15.0), Some("04.02.2024"), "Gadget"),
            ("ord-5", "B", Some(30.0), None, "Widget"),
            ("ord-6", "B", Some(0.0), None, "Gadget"),
        ]
    }

    pub fn records() -> Vec<Record> {
        Self::data()
            .into_iter()
            .map(|(id, source, amount, purchase_date, product)| {
                Record::new(id)
                    .with("source", source)
                    .with("amount", amount)
                    .with("purchase_date", purchase_date)
                    .with("product", product)
            })
            .collect()
    }

    /// Columns mirroring the production table: plain grouping columns
    /// plus a summed amount and a truthy-counted purchase flag derived
    /// from the nullable purchase date.
    pub fn registry() -> ColumnRegistry {
        ColumnRegistry::new(vec![
            ColumnDef::new("source"),
            ColumnDef::new("product"),
            ColumnDef::new("sum_amount")
                .with_field("amount")
                .with_grouping_value(|r: &Record| {
                    FieldValue::Number(r.field("amount").as_number().unwrap_or(0.0))
                })
                .with_aggregation(AggregateSpec::Sum),
            ColumnDef::new("is_purchase")
                .with_field("purchase_date")
                .with_grouping_value(|r: &Record| {
                    FieldValue::Boolean(r.field("purchase_date").is_truthy())
                })
                .with_aggregation(AggregateSpec::TruthyCount),
        ])
        .unwrap()
    }
}

/// A table loaded with the orders fixture, grouped by source.
pub fn orders_table_grouped() -> Table {
    let mut table = Table::new(OrdersFixture::registry());
    table.set_records(OrdersFixture::records());
    table.set_grouping(vec!["source".to_string()]).unwrap();
    table
}

/// A table over `n` generated flat records (ids "flat-0".."flat-n"),
/// sources cycling A/B/C, amounts 1..=n.
pub fn flat_table(n: usize) -> Table {
    let sources = ["A", "B", "C"];
    let records: Vec<Record> = (0..n)
        .map(|i| {
            Record::new(format!("flat-{}", i))
                .with("source", sources[i % sources.len()])
                .with("amount", (i + 1) as f64)
        })
        .collect();

    let registry = ColumnRegistry::new(vec![
        ColumnDef::new("source"),
        ColumnDef::new("amount").with_aggregation(AggregateSpec::Sum),
    ])
    .unwrap();

    let mut table = Table::new(registry);
    table.set_records(records);
    table
}

/// The group keys of every group row, in display order.
pub fn group_keys(rows: &[DisplayRow]) -> Vec<String> {
    rows.iter()
        .filter_map(|r| r.as_group())
        .map(|g| g.key.display())
        .collect()
}

/// The record ids of every leaf row, in display order.
pub fn leaf_ids(rows: &[DisplayRow]) -> Vec<String> {
    rows.iter()
        .filter_map(|r| r.as_leaf())
        .map(|l| l.record.id.clone())
        .collect()
}

/// Asserts a group row's aggregate with a small epsilon, panicking with
/// the node id for readable failures.
pub fn assert_aggregate(row: &DisplayRow, column_id: &str, expected: f64) {
    let group = row
        .as_group()
        .unwrap_or_else(|| panic!("expected a group row, got {:?}", row));
    let actual = group.aggregate(column_id).unwrap_or_else(|| {
        panic!(
            "group {} has no aggregate for column {}",
            group.node_id, column_id
        )
    });
    assert!(
        (actual - expected).abs() < 0.001,
        "aggregate {} of group {}: expected {}, got {}",
        column_id,
        group.node_id,
        expected,
        actual
    );
}
