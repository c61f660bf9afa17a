//! FILENAME: app/src/render.rs
//! Terminal rendering of visible pages, plus the JSON dump types used by
//! scripted (`--json`) runs.
//!
//! The engine's display rows are pure data; everything presentational
//! (column widths, expand markers, placeholder text, value formatting)
//! lives here.

use std::collections::BTreeMap;

use serde::Serialize;

use records::FieldValue;
use rowmodel_engine::{
    ColumnRegistry, DisplayRow, GroupRow, LeafRow, PipelineStats, VisiblePage,
};

const BLANK_KEY_LABEL: &str = "(blank)";
const EMPTY_CELL: &str = "-";
const EXPANDED_MARKER: &str = "v";
const COLLAPSED_MARKER: &str = ">";

// ============================================================================
// COLUMN LAYOUT
// ============================================================================

type CellFormatter = Box<dyn Fn(&FieldValue) -> String>;

/// One rendered column: which registry column it reads, its header text,
/// its width, and an optional leaf-cell formatter.
pub struct RenderColumn {
    pub id: String,
    pub header: String,
    pub width: usize,
    formatter: Option<CellFormatter>,
}

impl RenderColumn {
    pub fn new(id: impl Into<String>, header: impl Into<String>, width: usize) -> Self {
        RenderColumn {
            id: id.into(),
            header: header.into(),
            width,
            formatter: None,
        }
    }

    /// Overrides how leaf values are displayed in this column (e.g. a
    /// nullable date column rendered as yes/no).
    pub fn with_formatter<F>(mut self, f: F) -> Self
    where
        F: Fn(&FieldValue) -> String + 'static,
    {
        self.formatter = Some(Box::new(f));
        self
    }

    fn leaf_text(&self, value: &FieldValue) -> String {
        match &self.formatter {
            Some(f) => f(value),
            None if value.is_empty() => EMPTY_CELL.to_string(),
            None => value.display(),
        }
    }
}

// ============================================================================
// TEXT RENDERER
// ============================================================================

/// Renders one page as a fixed-width text table.
///
/// Rows are numbered within the page so REPL commands can address them.
/// A group row shows its key (with expand marker and leaf count) in the
/// column that produced it, aggregate values in aggregating columns, and
/// placeholders elsewhere. When the grouping column is not part of the
/// rendered set, the key lands in the first column so it stays visible.
pub fn render_page(
    page: &VisiblePage,
    registry: &ColumnRegistry,
    columns: &[RenderColumn],
) -> String {
    let mut out = String::new();

    out.push_str("    ");
    let headers: Vec<String> = columns
        .iter()
        .map(|c| fit(&c.header, c.width))
        .collect();
    out.push_str(&headers.join(" | "));
    out.push('\n');

    out.push_str("    ");
    let rules: Vec<String> = columns.iter().map(|c| "-".repeat(c.width)).collect();
    out.push_str(&rules.join("-+-"));
    out.push('\n');

    for (i, row) in page.rows.iter().enumerate() {
        out.push_str(&format!("{:>3} ", i + 1));
        let cells: Vec<String> = match row {
            DisplayRow::Group(group) => group_cells(group, columns),
            DisplayRow::Leaf(leaf) => leaf_cells(leaf, registry, columns),
        };
        out.push_str(&cells.join(" | "));
        out.push('\n');
    }

    out.push_str(&format!(
        "\nPage {} of {} | {} visible rows\n",
        page.page_index + 1,
        page.page_count,
        page.total_visible_rows
    ));
    out
}

fn group_cells(group: &GroupRow, columns: &[RenderColumn]) -> Vec<String> {
    let key_label = group_label(group);
    let grouped_here = columns.iter().position(|c| c.id == group.column_id);
    let label_slot = grouped_here.unwrap_or(0);

    columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            if i == label_slot {
                fit(&key_label, column.width)
            } else if let Some(value) = group.aggregate(&column.id) {
                fit(&FieldValue::Number(value).display(), column.width)
            } else {
                fit("", column.width)
            }
        })
        .collect()
}

fn leaf_cells(leaf: &LeafRow, registry: &ColumnRegistry, columns: &[RenderColumn]) -> Vec<String> {
    columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let text = match registry.get(&column.id) {
                Some(def) => column.leaf_text(&def.value(&leaf.record)),
                None => EMPTY_CELL.to_string(),
            };
            if i == 0 {
                fit(&format!("{}{}", "  ".repeat(leaf.depth), text), column.width)
            } else {
                fit(&text, column.width)
            }
        })
        .collect()
}

fn group_label(group: &GroupRow) -> String {
    let marker = if group.expanded {
        EXPANDED_MARKER
    } else {
        COLLAPSED_MARKER
    };
    let key = group.key.display();
    let key = if key.is_empty() { BLANK_KEY_LABEL } else { &key };
    format!(
        "{}{} {} ({})",
        "  ".repeat(group.depth),
        marker,
        key,
        group.leaf_count
    )
}

/// Pads or truncates to exactly `width` characters.
fn fit(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len <= width {
        let mut s = text.to_string();
        s.extend(std::iter::repeat(' ').take(width - len));
        s
    } else {
        let mut s: String = text.chars().take(width.saturating_sub(2)).collect();
        s.push_str("..");
        s
    }
}

pub fn render_stats(stats: &PipelineStats) -> String {
    format!(
        "{} records, {} after filter, {} group nodes, {} visible rows | \
         rebuilds: filter {}, tree {}, flatten {}",
        stats.record_count,
        stats.filtered_count,
        stats.group_count,
        stats.visible_row_count,
        stats.filter_rebuilds,
        stats.tree_rebuilds,
        stats.flatten_rebuilds
    )
}

// ============================================================================
// JSON PAGE DUMPS
// ============================================================================

/// Serialized form of one visible page. Scripting-facing fields use
/// camelCase.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDump {
    pub page_index: usize,
    pub page_count: usize,
    pub total_visible_rows: usize,
    pub grouping: Vec<String>,
    pub rows: Vec<RowDump>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RowDump {
    #[serde(rename_all = "camelCase")]
    Group {
        node_id: String,
        column_id: String,
        key: String,
        depth: usize,
        leaf_count: usize,
        expanded: bool,
        aggregates: BTreeMap<String, f64>,
    },
    #[serde(rename_all = "camelCase")]
    Leaf {
        record_id: String,
        depth: usize,
        values: BTreeMap<String, String>,
    },
}

/// Converts a page into its dump form. Leaf values are restricted to the
/// rendered columns to keep dumps readable.
pub fn page_dump(
    page: &VisiblePage,
    registry: &ColumnRegistry,
    columns: &[RenderColumn],
    grouping: &[String],
) -> PageDump {
    let rows = page
        .rows
        .iter()
        .map(|row| match row {
            DisplayRow::Group(group) => RowDump::Group {
                node_id: group.node_id.clone(),
                column_id: group.column_id.clone(),
                key: group.key.display(),
                depth: group.depth,
                leaf_count: group.leaf_count,
                expanded: group.expanded,
                aggregates: group
                    .aggregates
                    .iter()
                    .map(|(k, v)| (k.clone(), *v))
                    .collect(),
            },
            DisplayRow::Leaf(leaf) => RowDump::Leaf {
                record_id: leaf.record.id.clone(),
                depth: leaf.depth,
                values: columns
                    .iter()
                    .filter_map(|column| {
                        registry.get(&column.id).map(|def| {
                            (column.id.clone(), def.value(&leaf.record).display())
                        })
                    })
                    .collect(),
            },
        })
        .collect();

    PageDump {
        page_index: page.page_index,
        page_count: page.page_count,
        total_visible_rows: page.total_visible_rows,
        grouping: grouping.to_vec(),
        rows,
    }
}
