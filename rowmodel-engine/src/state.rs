//! FILENAME: rowmodel-engine/src/state.rs
//! Table state - the serializable user-intent side of the pipeline.
//!
//! Everything the user can change at runtime lives here as one immutable
//! value: filter predicate, grouping order, per-node expansion and
//! pagination. Transitions go through the pure reducer `apply_transition`;
//! the engine recomputes derived data as a pure function of
//! (records, registry, state). Validation that needs registry or tree
//! knowledge happens in the control API before the reducer runs, so the
//! reducer itself is total.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use records::Record;

/// Stable identity of a group node: its full key path
/// (`columnId:keyDisplay` segments joined with `/`).
pub type NodeId = String;

/// Page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: usize = 10;

// ============================================================================
// FILTER PREDICATE
// ============================================================================

/// An opaque record filter. Cheap to clone and safe to share; the pipeline
/// treats it as a black box and only ever calls `matches`.
#[derive(Clone)]
pub struct RecordPredicate(Arc<dyn Fn(&Record) -> bool + Send + Sync>);

impl RecordPredicate {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        RecordPredicate(Arc::new(f))
    }

    pub fn matches(&self, record: &Record) -> bool {
        (self.0)(record)
    }
}

impl fmt::Debug for RecordPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RecordPredicate")
    }
}

// ============================================================================
// EXPANSION STATE
// ============================================================================

/// Per-node expansion, stored as the set of node ids whose state differs
/// from the configured default. One representation covers both
/// collapsed-by-default and expanded-by-default tables, and double-toggle
/// always lands back on the empty diff.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpansionState {
    /// When true, nodes start expanded and the set lists collapsed ones.
    expand_by_default: bool,

    /// Node ids whose state differs from the default.
    toggled: FxHashSet<NodeId>,
}

impl ExpansionState {
    /// All nodes start collapsed (the usual initial view).
    pub fn collapsed_by_default() -> Self {
        ExpansionState {
            expand_by_default: false,
            toggled: FxHashSet::default(),
        }
    }

    /// All nodes start expanded.
    pub fn expanded_by_default() -> Self {
        ExpansionState {
            expand_by_default: true,
            toggled: FxHashSet::default(),
        }
    }

    pub fn is_expanded(&self, node_id: &str) -> bool {
        self.expand_by_default != self.toggled.contains(node_id)
    }

    /// Flips one node. Toggling the same id twice restores the previous
    /// state exactly; other nodes are never affected.
    pub fn toggle(&mut self, node_id: &str) {
        if !self.toggled.remove(node_id) {
            self.toggled.insert(node_id.to_string());
        }
    }

    /// Number of nodes currently differing from the default.
    pub fn toggled_count(&self) -> usize {
        self.toggled.len()
    }

    pub fn clear(&mut self) {
        self.toggled.clear();
    }
}

// ============================================================================
// PAGINATION STATE
// ============================================================================

/// Current page window. `page_size` is kept strictly positive by the
/// control API; the index is clamped against the visible row count on
/// every read, never trusted raw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    pub page_index: usize,
    pub page_size: usize,
}

impl Default for PaginationState {
    fn default() -> Self {
        PaginationState {
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PaginationState {
    /// Number of pages needed for `total_rows` visible rows. Zero rows
    /// means zero pages.
    pub fn page_count(&self, total_rows: usize) -> usize {
        (total_rows + self.page_size - 1) / self.page_size
    }

    /// The stored index clamped into `[0, max(page_count - 1, 0)]`.
    pub fn clamped_index(&self, total_rows: usize) -> usize {
        let page_count = self.page_count(total_rows);
        if page_count == 0 {
            0
        } else {
            self.page_index.min(page_count - 1)
        }
    }

    /// The row range of the (clamped) current page.
    pub fn page_range(&self, total_rows: usize) -> Range<usize> {
        let index = self.clamped_index(total_rows);
        let start = (index * self.page_size).min(total_rows);
        let end = (start + self.page_size).min(total_rows);
        start..end
    }
}

// ============================================================================
// TABLE STATE & REDUCER
// ============================================================================

/// The complete runtime state of one table. Cloning is cheap (the filter
/// is a shared closure); the filter is excluded from serialization since
/// closures have no stable wire form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableState {
    #[serde(skip)]
    pub filter: Option<RecordPredicate>,

    /// Ordered grouping column ids; first id is depth 0. Empty means
    /// ungrouped (flat leaf list).
    pub grouping: Vec<String>,

    pub expansion: ExpansionState,

    pub pagination: PaginationState,
}

/// One state transition. Actions carry already-validated payloads.
#[derive(Debug, Clone)]
pub enum TableAction {
    SetFilter(Option<RecordPredicate>),
    SetGrouping(Vec<String>),
    ToggleGroup(NodeId),
    SetPageIndex(usize),
    SetPageSize(usize),
}

/// Pure reducer: produces the next state without touching the current
/// one. Out-of-range page indices are stored as-is and clamped at read
/// time, so a transition sequence never fails here.
pub fn apply_transition(state: &TableState, action: TableAction) -> TableState {
    let mut next = state.clone();
    match action {
        TableAction::SetFilter(predicate) => {
            next.filter = predicate;
        }
        TableAction::SetGrouping(columns) => {
            next.grouping = columns;
        }
        TableAction::ToggleGroup(node_id) => {
            next.expansion.toggle(&node_id);
        }
        TableAction::SetPageIndex(index) => {
            next.pagination.page_index = index;
        }
        TableAction::SetPageSize(size) => {
            next.pagination.page_size = size;
        }
    }
    next
}
