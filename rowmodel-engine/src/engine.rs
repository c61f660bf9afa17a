//! FILENAME: rowmodel-engine/src/engine.rs
//! Row-Model Engine - transforms flat records into paged display rows.
//!
//! This module takes a ColumnRegistry (configuration), a record snapshot
//! (data) and a TableState (user intent) and produces pages of display
//! rows.
//!
//! Algorithm:
//! 1. Filter the snapshot into a working index list
//! 2. Partition the working set into a flat-arena group tree, one level
//!    per grouping column, preserving first-seen key order
//! 3. Attach per-column aggregates to every group node (bottom-up rollup
//!    for associative functions, full leaf slices otherwise)
//! 4. Flatten the tree depth-first into display rows, honoring per-node
//!    expansion state
//! 5. Slice the flattened list into the requested page window
//!
//! Stages 1-4 are memoized behind dirty flags, so a page turn or an
//! expansion toggle never re-runs filtering, grouping or aggregation.

use std::sync::Arc;

use log::debug;
use rustc_hash::FxHashMap;
use serde::Serialize;
use smallvec::SmallVec;

use records::{FieldValue, Record};

use crate::definition::{AggregateSpec, ColumnIndex, ColumnRegistry, KeyOrder};
use crate::error::ConfigError;
use crate::state::{apply_transition, NodeId, RecordPredicate, TableAction, TableState};
use crate::view::{DisplayRow, GroupRow, LeafRow, VisiblePage};

// ============================================================================
// GROUP KEYS
// ============================================================================

/// Wrapper around f64 that implements Eq, Hash and Ord for use as a
/// grouping key. NaN values are treated as equal to each other.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        if self.0.is_nan() && other.0.is_nan() {
            true
        } else {
            self.0 == other.0
        }
    }
}

impl Eq for OrderedFloat {}

impl std::hash::Hash for OrderedFloat {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        if self.0.is_nan() {
            // All NaN values hash to the same thing
            u64::MAX.hash(state);
        } else {
            self.0.to_bits().hash(state);
        }
    }
}

/// A normalized, hashable representation of a grouping key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum KeyValue {
    Empty,
    Number(OrderedFloat),
    Text(String),
    Boolean(bool),
}

impl From<&FieldValue> for KeyValue {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Empty => KeyValue::Empty,
            FieldValue::Number(n) => KeyValue::Number(OrderedFloat(*n)),
            FieldValue::Text(s) => KeyValue::Text(s.clone()),
            FieldValue::Boolean(b) => KeyValue::Boolean(*b),
        }
    }
}

impl From<&KeyValue> for FieldValue {
    fn from(key: &KeyValue) -> Self {
        match key {
            KeyValue::Empty => FieldValue::Empty,
            KeyValue::Number(n) => FieldValue::Number(n.0),
            KeyValue::Text(s) => FieldValue::Text(s.clone()),
            KeyValue::Boolean(b) => FieldValue::Boolean(*b),
        }
    }
}

impl KeyValue {
    fn type_rank(&self) -> u8 {
        match self {
            KeyValue::Number(_) => 0,
            KeyValue::Text(_) => 1,
            KeyValue::Boolean(_) => 2,
            KeyValue::Empty => 3,
        }
    }
}

/// Ascending key order: numbers, then texts, then booleans, with the
/// empty bucket always last.
impl Ord for KeyValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self, other) {
            (KeyValue::Number(a), KeyValue::Number(b)) => a.0.total_cmp(&b.0),
            (KeyValue::Text(a), KeyValue::Text(b)) => a.cmp(b),
            (KeyValue::Boolean(a), KeyValue::Boolean(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl PartialOrd for KeyValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// ============================================================================
// GROUP TREE (FLAT ARENA)
// ============================================================================

/// Index of a group node inside the arena.
pub type NodeIndex = usize;

/// One group node: a partition key at one grouping depth.
#[derive(Debug, Clone, Serialize)]
pub struct GroupNode {
    /// Stable identity: `columnId:keyDisplay` segments joined with `/`,
    /// scoped by the full ancestor path so that toggling "Email under
    /// Acme" never affects "Email under Globex".
    pub node_id: NodeId,

    /// Registry index of the grouping column that produced this node.
    pub column: ColumnIndex,

    /// The partition key (Empty marks the explicit no-key bucket).
    pub key: FieldValue,

    /// Depth in the tree (0 = top level).
    pub depth: usize,

    /// Parent node, None for roots.
    pub parent: Option<NodeIndex>,

    /// Child group nodes (next grouping level). Empty at the deepest
    /// level, where the node owns its leaf range directly.
    pub children: Vec<NodeIndex>,

    /// Range into the tree's `leaf_order` covering this subtree's leaf
    /// records. Children partition their parent's range exactly.
    pub leaf_start: usize,
    pub leaf_end: usize,

    /// Aggregate value per aggregating column, filled by the aggregation
    /// pass in registry order.
    pub aggregates: SmallVec<[(ColumnIndex, f64); 4]>,
}

impl GroupNode {
    pub fn leaf_count(&self) -> usize {
        self.leaf_end - self.leaf_start
    }

    pub fn aggregate(&self, column: ColumnIndex) -> Option<f64> {
        self.aggregates
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| *v)
    }
}

/// The grouped forest as a flat arena: nodes reference children and
/// parents by index, and leaves live in one tree-ordered index array with
/// a contiguous range per node. No cycles are representable.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupTree {
    nodes: Vec<GroupNode>,
    roots: Vec<NodeIndex>,

    /// Record indices (into the snapshot) in depth-first tree order.
    /// With no grouping configured this is simply the filtered set.
    leaf_order: Vec<usize>,

    /// Node lookup by stable id, for expansion toggles.
    #[serde(skip)]
    index_by_id: FxHashMap<NodeId, NodeIndex>,
}

impl GroupTree {
    pub fn node(&self, index: NodeIndex) -> &GroupNode {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[GroupNode] {
        &self.nodes
    }

    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_order.len()
    }

    pub fn node_by_id(&self, node_id: &str) -> Option<NodeIndex> {
        self.index_by_id.get(node_id).copied()
    }

    /// The snapshot indices of all leaf records under a node.
    pub fn leaf_slice(&self, node: &GroupNode) -> &[usize] {
        &self.leaf_order[node.leaf_start..node.leaf_end]
    }

    /// All leaf record indices in tree order.
    pub fn leaves(&self) -> &[usize] {
        &self.leaf_order
    }
}

// ============================================================================
// TREE BUILD
// ============================================================================

/// Builds the grouped tree for one filtered record set. `grouping` holds
/// already-validated registry indices, outermost level first.
pub fn build_group_tree(
    records: &[Arc<Record>],
    filtered: &[usize],
    grouping: &[ColumnIndex],
    registry: &ColumnRegistry,
) -> GroupTree {
    let mut tree = GroupTree {
        nodes: Vec::new(),
        roots: Vec::new(),
        leaf_order: Vec::with_capacity(filtered.len()),
        index_by_id: FxHashMap::default(),
    };

    if grouping.is_empty() {
        tree.leaf_order.extend_from_slice(filtered);
        return tree;
    }

    tree.roots = build_tree_level(&mut tree, records, filtered, grouping, 0, None, "", registry);
    tree
}

/// Recursively partitions `members` by the grouping column at `level`.
/// Returns the node indices created at this level, in display order.
/// Kept outside the tree impl to avoid borrow issues with the arena.
fn build_tree_level(
    tree: &mut GroupTree,
    records: &[Arc<Record>],
    members: &[usize],
    grouping: &[ColumnIndex],
    level: usize,
    parent: Option<NodeIndex>,
    parent_path: &str,
    registry: &ColumnRegistry,
) -> Vec<NodeIndex> {
    let column_index = grouping[level];
    let column = registry.column(column_index);

    // Bucket members by key, preserving first-seen order.
    let mut buckets: Vec<(KeyValue, Vec<usize>)> = Vec::new();
    let mut slot_by_key: FxHashMap<KeyValue, usize> = FxHashMap::default();
    for &record_index in members {
        let key = KeyValue::from(&column.grouping_key(&records[record_index]));
        let slot = *slot_by_key.entry(key.clone()).or_insert_with(|| {
            buckets.push((key, Vec::new()));
            buckets.len() - 1
        });
        buckets[slot].1.push(record_index);
    }

    match column.key_order {
        KeyOrder::FirstSeen => {}
        KeyOrder::Ascending => buckets.sort_by(|a, b| a.0.cmp(&b.0)),
        KeyOrder::Descending => buckets.sort_by(|a, b| b.0.cmp(&a.0)),
    }

    let mut level_nodes = Vec::with_capacity(buckets.len());
    for (key, bucket_members) in buckets {
        let key_value = FieldValue::from(&key);

        // Path key scoped by every ancestor level, so identical keys under
        // different parents stay independent.
        let node_id = if parent_path.is_empty() {
            format!("{}:{}", column.id, key_value.display())
        } else {
            format!("{}/{}:{}", parent_path, column.id, key_value.display())
        };

        let node_index = tree.nodes.len();
        tree.nodes.push(GroupNode {
            node_id: node_id.clone(),
            column: column_index,
            key: key_value,
            depth: level,
            parent,
            children: Vec::new(),
            leaf_start: tree.leaf_order.len(),
            leaf_end: tree.leaf_order.len(),
            aggregates: SmallVec::new(),
        });
        tree.index_by_id.insert(node_id.clone(), node_index);

        if level + 1 < grouping.len() {
            let children = build_tree_level(
                tree,
                records,
                &bucket_members,
                grouping,
                level + 1,
                Some(node_index),
                &node_id,
                registry,
            );
            tree.nodes[node_index].children = children;
        } else {
            // Deepest level: the bucket's records become this node's leaves.
            tree.leaf_order.extend_from_slice(&bucket_members);
        }

        tree.nodes[node_index].leaf_end = tree.leaf_order.len();
        level_nodes.push(node_index);
    }

    level_nodes
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Computes every aggregating column's value for every group node.
/// Associative functions roll up bottom-up from direct children; the
/// leaf-slice family (truthyCount, average, custom) re-reads the full
/// leaf set at every level because those functions do not compose over
/// partial results.
pub fn compute_aggregates(tree: &mut GroupTree, records: &[Arc<Record>], registry: &ColumnRegistry) {
    if tree.nodes.is_empty() {
        return;
    }

    for (column_index, column) in registry.aggregating_columns() {
        let spec = match &column.aggregation {
            Some(spec) => spec,
            None => continue,
        };

        match spec {
            AggregateSpec::Sum => {
                // Reverse arena order visits children before parents.
                for i in (0..tree.nodes.len()).rev() {
                    let value = if tree.nodes[i].children.is_empty() {
                        sum_over_leaves(tree, i, records, registry, column_index)
                    } else {
                        rollup_sum(tree, i, column_index)
                    };
                    tree.nodes[i].aggregates.push((column_index, value));
                }
            }
            AggregateSpec::Count => {
                for i in (0..tree.nodes.len()).rev() {
                    let value = if tree.nodes[i].children.is_empty() {
                        tree.nodes[i].leaf_count() as f64
                    } else {
                        rollup_sum(tree, i, column_index)
                    };
                    tree.nodes[i].aggregates.push((column_index, value));
                }
            }
            AggregateSpec::Min | AggregateSpec::Max => {
                // Partial results stay Option-valued so that a subtree with
                // no numeric leaves never injects a spurious zero into its
                // parent's rollup.
                let take_min = matches!(spec, AggregateSpec::Min);
                let mut partial: Vec<Option<f64>> = vec![None; tree.nodes.len()];
                for i in (0..tree.nodes.len()).rev() {
                    let value = if tree.nodes[i].children.is_empty() {
                        extreme_over_leaves(tree, i, records, registry, column_index, take_min)
                    } else {
                        let mut combined: Option<f64> = None;
                        for &child in &tree.nodes[i].children {
                            combined = combine_extreme(combined, partial[child], take_min);
                        }
                        combined
                    };
                    partial[i] = value;
                    tree.nodes[i].aggregates.push((column_index, value.unwrap_or(0.0)));
                }
            }
            AggregateSpec::TruthyCount => {
                for i in 0..tree.nodes.len() {
                    let value = truthy_count_over_leaves(tree, i, records, registry, column_index);
                    tree.nodes[i].aggregates.push((column_index, value));
                }
            }
            AggregateSpec::Average => {
                for i in 0..tree.nodes.len() {
                    let value = average_over_leaves(tree, i, records, registry, column_index);
                    tree.nodes[i].aggregates.push((column_index, value));
                }
            }
            AggregateSpec::Custom { func, .. } => {
                for i in 0..tree.nodes.len() {
                    let leaf_records: Vec<Arc<Record>> = tree
                        .leaf_slice(&tree.nodes[i])
                        .iter()
                        .map(|&r| Arc::clone(&records[r]))
                        .collect();
                    let value = func(&leaf_records);
                    tree.nodes[i].aggregates.push((column_index, value));
                }
            }
        }
    }
}

// ============================================================================
// AGGREGATION HELPERS (outside impl to avoid borrow issues)
// ============================================================================

fn sum_over_leaves(
    tree: &GroupTree,
    node: NodeIndex,
    records: &[Arc<Record>],
    registry: &ColumnRegistry,
    column: ColumnIndex,
) -> f64 {
    let column_def = registry.column(column);
    tree.leaf_slice(&tree.nodes[node])
        .iter()
        .filter_map(|&r| column_def.value(&records[r]).as_number())
        .sum()
}

/// Sums the already-computed child values for `column`. Children are
/// guaranteed computed because the caller walks the arena in reverse.
fn rollup_sum(tree: &GroupTree, node: NodeIndex, column: ColumnIndex) -> f64 {
    tree.nodes[node]
        .children
        .iter()
        .filter_map(|&child| tree.nodes[child].aggregate(column))
        .sum()
}

fn extreme_over_leaves(
    tree: &GroupTree,
    node: NodeIndex,
    records: &[Arc<Record>],
    registry: &ColumnRegistry,
    column: ColumnIndex,
    take_min: bool,
) -> Option<f64> {
    let column_def = registry.column(column);
    let mut result: Option<f64> = None;
    for &r in tree.leaf_slice(&tree.nodes[node]) {
        if let Some(n) = column_def.value(&records[r]).as_number() {
            result = combine_extreme(result, Some(n), take_min);
        }
    }
    result
}

fn combine_extreme(a: Option<f64>, b: Option<f64>, take_min: bool) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(if take_min { x.min(y) } else { x.max(y) }),
        (Some(x), None) => Some(x),
        (None, y) => y,
    }
}

fn truthy_count_over_leaves(
    tree: &GroupTree,
    node: NodeIndex,
    records: &[Arc<Record>],
    registry: &ColumnRegistry,
    column: ColumnIndex,
) -> f64 {
    let column_def = registry.column(column);
    let count = tree
        .leaf_slice(&tree.nodes[node])
        .iter()
        .filter(|&&r| column_def.value(&records[r]).is_truthy())
        .count();
    count as f64
}

fn average_over_leaves(
    tree: &GroupTree,
    node: NodeIndex,
    records: &[Arc<Record>],
    registry: &ColumnRegistry,
    column: ColumnIndex,
) -> f64 {
    let column_def = registry.column(column);
    let mut sum = 0.0;
    let mut count = 0usize;
    for &r in tree.leaf_slice(&tree.nodes[node]) {
        if let Some(n) = column_def.value(&records[r]).as_number() {
            sum += n;
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

// ============================================================================
// FLATTENING
// ============================================================================

/// Flattens the tree depth-first into display rows. Group rows are always
/// emitted; a node's children (subgroups or leaves) follow only when the
/// node is expanded.
pub fn flatten_tree(
    tree: &GroupTree,
    records: &[Arc<Record>],
    registry: &ColumnRegistry,
    state: &TableState,
) -> Vec<DisplayRow> {
    let mut rows = Vec::new();

    if tree.nodes().is_empty() {
        // Ungrouped: every filtered record is a top-level leaf row.
        for &record_index in tree.leaves() {
            rows.push(DisplayRow::Leaf(LeafRow {
                record: Arc::clone(&records[record_index]),
                depth: 0,
            }));
        }
        return rows;
    }

    for &root in tree.roots() {
        flatten_node(tree, root, records, registry, state, &mut rows);
    }
    rows
}

fn flatten_node(
    tree: &GroupTree,
    node_index: NodeIndex,
    records: &[Arc<Record>],
    registry: &ColumnRegistry,
    state: &TableState,
    rows: &mut Vec<DisplayRow>,
) {
    let node = tree.node(node_index);
    let expanded = state.expansion.is_expanded(&node.node_id);

    let mut aggregates = FxHashMap::default();
    for &(column, value) in &node.aggregates {
        aggregates.insert(registry.column(column).id.clone(), value);
    }

    rows.push(DisplayRow::Group(GroupRow {
        node_id: node.node_id.clone(),
        column_id: registry.column(node.column).id.clone(),
        key: node.key.clone(),
        depth: node.depth,
        leaf_count: node.leaf_count(),
        expanded,
        aggregates,
    }));

    if !expanded {
        return;
    }

    if node.children.is_empty() {
        for &record_index in tree.leaf_slice(node) {
            rows.push(DisplayRow::Leaf(LeafRow {
                record: Arc::clone(&records[record_index]),
                depth: node.depth + 1,
            }));
        }
    } else {
        for &child in &node.children {
            flatten_node(tree, child, records, registry, state, rows);
        }
    }
}

// ============================================================================
// PIPELINE STATS
// ============================================================================

/// Counters for introspection and tests. The rebuild counters make the
/// memoization boundary observable: a page turn must not move
/// `tree_rebuilds`, a filter change must.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PipelineStats {
    pub record_count: usize,
    pub filtered_count: usize,
    pub group_count: usize,
    pub visible_row_count: usize,

    pub filter_rebuilds: u64,
    pub tree_rebuilds: u64,
    pub flatten_rebuilds: u64,
}

// ============================================================================
// TABLE
// ============================================================================

/// The stateful pipeline facade. Owns the snapshot, the immutable state
/// value and the memoized stage outputs; every mutation goes through the
/// pure reducer and flips the dirty flags of the affected stages only.
#[derive(Debug)]
pub struct Table {
    registry: ColumnRegistry,
    records: Vec<Arc<Record>>,
    state: TableState,

    /// Registry indices for `state.grouping` (kept in lockstep, validated
    /// whenever the grouping changes).
    grouping_indices: Vec<ColumnIndex>,

    filtered: Vec<usize>,
    tree: GroupTree,
    flattened: Vec<DisplayRow>,

    filtered_dirty: bool,
    tree_dirty: bool,
    flatten_dirty: bool,

    stats: PipelineStats,
}

impl Table {
    /// Creates an empty table with default state (ungrouped, collapsed
    /// nodes, first page, default page size).
    pub fn new(registry: ColumnRegistry) -> Self {
        Table {
            registry,
            records: Vec::new(),
            state: TableState::default(),
            grouping_indices: Vec::new(),
            filtered: Vec::new(),
            tree: GroupTree::default(),
            flattened: Vec::new(),
            filtered_dirty: true,
            tree_dirty: true,
            flatten_dirty: true,
            stats: PipelineStats::default(),
        }
    }

    /// Creates a table with a caller-provided initial state (e.g. a
    /// default grouping or expanded-by-default nodes). Fails fast on a
    /// grouping id missing from the registry or a zero page size.
    pub fn with_initial(registry: ColumnRegistry, state: TableState) -> Result<Self, ConfigError> {
        if state.pagination.page_size == 0 {
            return Err(ConfigError::InvalidPageSize);
        }
        let grouping_indices = registry.resolve_grouping(&state.grouping)?;
        let mut table = Table::new(registry);
        table.state = state;
        table.grouping_indices = grouping_indices;
        Ok(table)
    }

    pub fn registry(&self) -> &ColumnRegistry {
        &self.registry
    }

    pub fn state(&self) -> &TableState {
        &self.state
    }

    /// Replaces the record snapshot wholesale. All derived stages are
    /// rebuilt on next read; expansion and pagination state survive (node
    /// ids are content-keyed, the page index re-clamps).
    pub fn set_records(&mut self, records: Vec<Record>) {
        self.records = records.into_iter().map(Arc::new).collect();
        self.mark_filter_dirty();
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn set_filter(&mut self, predicate: Option<RecordPredicate>) {
        self.state = apply_transition(&self.state, TableAction::SetFilter(predicate));
        self.mark_filter_dirty();
    }

    /// Replaces the grouping column order. Errors if any id is absent
    /// from the registry; on error the current state is left untouched.
    pub fn set_grouping(&mut self, columns: Vec<String>) -> Result<(), ConfigError> {
        let indices = self.registry.resolve_grouping(&columns)?;
        self.state = apply_transition(&self.state, TableAction::SetGrouping(columns));
        self.grouping_indices = indices;
        self.mark_tree_dirty();
        Ok(())
    }

    /// Toggles one group node. Returns false (and changes nothing) when
    /// the id does not exist in the current tree.
    pub fn toggle_group(&mut self, node_id: &str) -> bool {
        self.ensure_tree();
        if self.tree.node_by_id(node_id).is_none() {
            return false;
        }
        self.state = apply_transition(&self.state, TableAction::ToggleGroup(node_id.to_string()));
        self.flatten_dirty = true;
        true
    }

    /// Stores a page index. Out-of-range values are kept and clamped on
    /// the next read, per the state-bounds policy.
    pub fn set_page_index(&mut self, page_index: usize) {
        self.state = apply_transition(&self.state, TableAction::SetPageIndex(page_index));
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), ConfigError> {
        if page_size == 0 {
            return Err(ConfigError::InvalidPageSize);
        }
        self.state = apply_transition(&self.state, TableAction::SetPageSize(page_size));
        Ok(())
    }

    /// The current page of display rows plus pagination metadata. The
    /// effective (clamped) page index is written back into the state so
    /// later reads and snapshots agree.
    pub fn visible_page(&mut self) -> VisiblePage {
        self.ensure_flattened();

        let total = self.flattened.len();
        let page_count = self.state.pagination.page_count(total);
        let page_index = self.state.pagination.clamped_index(total);
        self.state.pagination.page_index = page_index;

        let range = self.state.pagination.page_range(total);
        VisiblePage {
            rows: self.flattened[range].to_vec(),
            page_index,
            page_count,
            total_visible_rows: total,
        }
    }

    /// The full flattened display list (all pages).
    pub fn flattened_rows(&mut self) -> &[DisplayRow] {
        self.ensure_flattened();
        &self.flattened
    }

    /// The grouped+aggregated tree, for introspection and tests.
    pub fn group_tree(&mut self) -> &GroupTree {
        self.ensure_tree();
        &self.tree
    }

    pub fn stats(&mut self) -> PipelineStats {
        self.ensure_flattened();
        self.stats
    }

    // ------------------------------------------------------------------
    // Stage recomputation
    // ------------------------------------------------------------------

    fn mark_filter_dirty(&mut self) {
        self.filtered_dirty = true;
        self.tree_dirty = true;
        self.flatten_dirty = true;
    }

    fn mark_tree_dirty(&mut self) {
        self.tree_dirty = true;
        self.flatten_dirty = true;
    }

    fn ensure_filtered(&mut self) {
        if !self.filtered_dirty {
            return;
        }
        self.filtered = match &self.state.filter {
            Some(predicate) => self
                .records
                .iter()
                .enumerate()
                .filter(|(_, r)| predicate.matches(r))
                .map(|(i, _)| i)
                .collect(),
            None => (0..self.records.len()).collect(),
        };
        self.filtered_dirty = false;
        self.stats.filter_rebuilds += 1;
        self.stats.record_count = self.records.len();
        self.stats.filtered_count = self.filtered.len();
        debug!(
            "filter stage rebuilt: {} of {} records pass",
            self.filtered.len(),
            self.records.len()
        );
    }

    fn ensure_tree(&mut self) {
        self.ensure_filtered();
        if !self.tree_dirty {
            return;
        }
        self.tree = build_group_tree(
            &self.records,
            &self.filtered,
            &self.grouping_indices,
            &self.registry,
        );
        compute_aggregates(&mut self.tree, &self.records, &self.registry);
        self.tree_dirty = false;
        self.stats.tree_rebuilds += 1;
        self.stats.group_count = self.tree.node_count();
        debug!(
            "group stage rebuilt: {} nodes over {} leaves, {} levels",
            self.tree.node_count(),
            self.tree.leaf_count(),
            self.grouping_indices.len()
        );
    }

    fn ensure_flattened(&mut self) {
        self.ensure_tree();
        if !self.flatten_dirty {
            return;
        }
        self.flattened = flatten_tree(&self.tree, &self.records, &self.registry, &self.state);
        self.flatten_dirty = false;
        self.stats.flatten_rebuilds += 1;
        self.stats.visible_row_count = self.flattened.len();
        debug!("flatten stage rebuilt: {} visible rows", self.flattened.len());
    }
}
