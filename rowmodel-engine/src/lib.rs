//! FILENAME: rowmodel-engine/src/lib.rs
//! Row-model pipeline for groupable, aggregatable, paginated tables.
//!
//! This crate turns a flat snapshot of transactional records into pages
//! of display rows: filter, group into a keyed tree, aggregate per node,
//! flatten honoring expansion state, paginate. It depends on `records`
//! only for the shared data model (FieldValue, Record).
//!
//! Layers:
//! - `definition`: Column configuration (what the table IS)
//! - `state`: Serializable user intent plus the pure reducer
//! - `engine`: Grouping, aggregation, flattening (HOW we compute)
//! - `view`: Renderable output rows (WHAT we display)

pub mod definition;
pub mod error;
pub mod state;
pub mod engine;
pub mod view;

pub use definition::*;
pub use error::ConfigError;
pub use state::*;
pub use view::*;
pub use engine::{
    build_group_tree, compute_aggregates, flatten_tree,
    GroupNode, GroupTree, KeyValue, NodeIndex, OrderedFloat, PipelineStats, Table,
};
