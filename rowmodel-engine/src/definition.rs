//! FILENAME: rowmodel-engine/src/definition.rs
//! Column definitions - the configuration side of the row model.
//!
//! This module contains everything needed to DESCRIBE a table's columns:
//! how a value is read from a record, how a grouping key is derived from
//! it, which aggregation (if any) rolls it up, and how grouped keys are
//! ordered. Presentation (formatting, widths, headers) deliberately lives
//! outside the engine; these definitions carry only the data-transform
//! capabilities the pipeline consumes.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use records::{FieldValue, Record};

use crate::error::ConfigError;

/// Index into the column registry (0-based).
pub type ColumnIndex = usize;

/// Reads one value out of a record. Custom accessors derive values that
/// are not stored verbatim in the record.
pub type AccessorFn = Arc<dyn Fn(&Record) -> FieldValue + Send + Sync>;

/// A custom aggregation over the full set of leaf records under a group
/// node. Always receives every leaf, never partial child rollups.
pub type LeafAggregateFn = Arc<dyn Fn(&[Arc<Record>]) -> f64 + Send + Sync>;

// ============================================================================
// AGGREGATION
// ============================================================================

/// Aggregation attached to a column. Built-in functions are referenced by
/// name (`AggregateSpec::from_name`); anything else is a configuration
/// error at setup time.
#[derive(Clone)]
pub enum AggregateSpec {
    /// Numeric sum; non-numeric leaf values contribute zero.
    Sum,
    /// Number of leaf records.
    Count,
    /// Number of leaf records whose value for the column is truthy.
    TruthyCount,
    /// Numeric minimum (empty set yields 0).
    Min,
    /// Numeric maximum (empty set yields 0).
    Max,
    /// Numeric mean over the subtree's numeric values (empty set yields 0).
    Average,
    /// Caller-registered function over the full leaf slice.
    Custom { name: String, func: LeafAggregateFn },
}

impl AggregateSpec {
    /// Resolves a built-in aggregation by its registered name.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "sum" => Ok(AggregateSpec::Sum),
            "count" => Ok(AggregateSpec::Count),
            "truthyCount" => Ok(AggregateSpec::TruthyCount),
            "min" => Ok(AggregateSpec::Min),
            "max" => Ok(AggregateSpec::Max),
            "average" => Ok(AggregateSpec::Average),
            other => Err(ConfigError::UnknownAggregation(other.to_string())),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AggregateSpec::Sum => "sum",
            AggregateSpec::Count => "count",
            AggregateSpec::TruthyCount => "truthyCount",
            AggregateSpec::Min => "min",
            AggregateSpec::Max => "max",
            AggregateSpec::Average => "average",
            AggregateSpec::Custom { name, .. } => name,
        }
    }

    /// Whether this function must see the full leaf slice at every tree
    /// level. Associative functions (`sum`, `count`, `min`, `max`) roll up
    /// from direct children instead; truthy counting is NOT associative
    /// over partial results, so it stays in the leaf-slice family.
    pub fn needs_leaf_rows(&self) -> bool {
        matches!(
            self,
            AggregateSpec::TruthyCount | AggregateSpec::Average | AggregateSpec::Custom { .. }
        )
    }
}

impl fmt::Debug for AggregateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AggregateSpec({})", self.name())
    }
}

// ============================================================================
// KEY ORDERING
// ============================================================================

/// Ordering of a column's grouped keys within their parent partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyOrder {
    /// Keys appear in the order they are first encountered in the
    /// filtered record set (stable, not sorted).
    FirstSeen,
    Ascending,
    Descending,
}

impl Default for KeyOrder {
    fn default() -> Self {
        KeyOrder::FirstSeen
    }
}

// ============================================================================
// COLUMN DEFINITIONS
// ============================================================================

/// One column of the table: identity plus the pure data-transform
/// capabilities the pipeline needs.
#[derive(Clone)]
pub struct ColumnDef {
    /// Unique identifier across the registry.
    pub id: String,

    /// Value accessor. `None` reads the record field named like the
    /// column id.
    accessor: Option<AccessorFn>,

    /// Grouping-key extractor. `None` falls back to the accessor value.
    grouping_value: Option<AccessorFn>,

    /// Aggregation rolled up onto group rows, if any.
    pub aggregation: Option<AggregateSpec>,

    /// Ordering of this column's grouped keys.
    pub key_order: KeyOrder,
}

impl ColumnDef {
    pub fn new(id: impl Into<String>) -> Self {
        ColumnDef {
            id: id.into(),
            accessor: None,
            grouping_value: None,
            aggregation: None,
            key_order: KeyOrder::FirstSeen,
        }
    }

    /// Reads this column from a differently named record field. The common
    /// case is a derived column layered over a raw field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.accessor = Some(Arc::new(move |record: &Record| record.field(&field).clone()));
        self
    }

    pub fn with_accessor<F>(mut self, f: F) -> Self
    where
        F: Fn(&Record) -> FieldValue + Send + Sync + 'static,
    {
        self.accessor = Some(Arc::new(f));
        self
    }

    /// Derives the grouping key independently of the displayed value
    /// (e.g. boolean-coercing a nullable date into purchased yes/no).
    pub fn with_grouping_value<F>(mut self, f: F) -> Self
    where
        F: Fn(&Record) -> FieldValue + Send + Sync + 'static,
    {
        self.grouping_value = Some(Arc::new(f));
        self
    }

    pub fn with_aggregation(mut self, spec: AggregateSpec) -> Self {
        self.aggregation = Some(spec);
        self
    }

    pub fn with_key_order(mut self, order: KeyOrder) -> Self {
        self.key_order = order;
        self
    }

    /// The column's value for a record.
    pub fn value(&self, record: &Record) -> FieldValue {
        match &self.accessor {
            Some(f) => f(record),
            None => record.field(&self.id).clone(),
        }
    }

    /// The column's grouping key for a record. Falls back to the plain
    /// accessor value when no extractor is configured.
    pub fn grouping_key(&self, record: &Record) -> FieldValue {
        match &self.grouping_value {
            Some(f) => f(record),
            None => self.value(record),
        }
    }
}

impl fmt::Debug for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDef")
            .field("id", &self.id)
            .field("custom_accessor", &self.accessor.is_some())
            .field("custom_grouping_value", &self.grouping_value.is_some())
            .field("aggregation", &self.aggregation)
            .field("key_order", &self.key_order)
            .finish()
    }
}

// ============================================================================
// COLUMN REGISTRY
// ============================================================================

/// The validated, immutable set of column definitions for one table.
/// Duplicate ids are rejected at construction; grouping references are
/// validated against this registry before any record is processed.
#[derive(Debug, Clone)]
pub struct ColumnRegistry {
    columns: Vec<ColumnDef>,
    index_by_id: FxHashMap<String, ColumnIndex>,
}

impl ColumnRegistry {
    pub fn new(columns: Vec<ColumnDef>) -> Result<Self, ConfigError> {
        let mut index_by_id = FxHashMap::default();
        for (index, column) in columns.iter().enumerate() {
            if index_by_id.insert(column.id.clone(), index).is_some() {
                return Err(ConfigError::DuplicateColumnId(column.id.clone()));
            }
        }
        Ok(ColumnRegistry { columns, index_by_id })
    }

    pub fn index_of(&self, id: &str) -> Option<ColumnIndex> {
        self.index_by_id.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&ColumnDef> {
        self.index_of(id).map(|i| &self.columns[i])
    }

    pub fn column(&self, index: ColumnIndex) -> &ColumnDef {
        &self.columns[index]
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Columns that carry an aggregation, in registry order.
    pub fn aggregating_columns(&self) -> impl Iterator<Item = (ColumnIndex, &ColumnDef)> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.aggregation.is_some())
    }

    /// Maps an ordered list of grouping column ids to registry indices,
    /// failing fast on the first unknown id.
    pub fn resolve_grouping(&self, ids: &[String]) -> Result<Vec<ColumnIndex>, ConfigError> {
        ids.iter()
            .map(|id| {
                self.index_of(id)
                    .ok_or_else(|| ConfigError::UnknownGroupingColumn(id.clone()))
            })
            .collect()
    }
}
