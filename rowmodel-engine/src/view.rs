//! FILENAME: rowmodel-engine/src/view.rs
//! Display rows - renderable output of the pipeline.
//!
//! Flattening the grouped tree produces an ordered list of these rows;
//! pagination windows that list into a `VisiblePage`. Rows are
//! self-contained values (group rows carry their aggregates, leaf rows
//! share the underlying record), so a renderer never reaches back into
//! the engine mid-draw.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use records::{FieldValue, Record};

use crate::state::NodeId;

/// A group header row: one partition key at one grouping depth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRow {
    /// Stable identity (full key path), the handle for toggling.
    pub node_id: NodeId,

    /// The grouping column that produced this partition.
    pub column_id: String,

    /// The partition key. `Empty` marks the explicit bucket of records
    /// without a key for this column.
    pub key: FieldValue,

    /// Nesting depth, 0 for top-level groups.
    pub depth: usize,

    /// Number of leaf records in this subtree.
    pub leaf_count: usize,

    /// Whether the node's children are currently rendered.
    pub expanded: bool,

    /// Aggregate value per aggregating column id.
    pub aggregates: FxHashMap<String, f64>,
}

impl GroupRow {
    pub fn aggregate(&self, column_id: &str) -> Option<f64> {
        self.aggregates.get(column_id).copied()
    }
}

/// A leaf row: exactly one underlying record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeafRow {
    /// The original record, shared with the snapshot.
    pub record: Arc<Record>,

    /// Nesting depth (one below the deepest enclosing group).
    pub depth: usize,
}

/// One visible row of the flattened table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "row_type", rename_all = "snake_case")]
pub enum DisplayRow {
    Group(GroupRow),
    Leaf(LeafRow),
}

impl DisplayRow {
    pub fn depth(&self) -> usize {
        match self {
            DisplayRow::Group(g) => g.depth,
            DisplayRow::Leaf(l) => l.depth,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, DisplayRow::Group(_))
    }

    pub fn as_group(&self) -> Option<&GroupRow> {
        match self {
            DisplayRow::Group(g) => Some(g),
            DisplayRow::Leaf(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&LeafRow> {
        match self {
            DisplayRow::Group(_) => None,
            DisplayRow::Leaf(l) => Some(l),
        }
    }
}

/// One page of display rows plus the pagination metadata a renderer
/// needs for its controls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisiblePage {
    pub rows: Vec<DisplayRow>,

    /// The effective (clamped) page index.
    pub page_index: usize,

    pub page_count: usize,

    /// Length of the full flattened list, across all pages.
    pub total_visible_rows: usize,
}
