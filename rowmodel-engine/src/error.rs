//! FILENAME: rowmodel-engine/src/error.rs

use thiserror::Error;

/// Configuration errors. These indicate a programming or setup mistake
/// upstream (a bad column reference, a bad page size), so they surface
/// immediately at the call that introduces them and are never swallowed
/// into fallback behavior.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown grouping column: {0}")]
    UnknownGroupingColumn(String),

    #[error("Unknown aggregation function: {0}")]
    UnknownAggregation(String),

    #[error("Duplicate column id: {0}")]
    DuplicateColumnId(String),

    #[error("Page size must be greater than zero")]
    InvalidPageSize,
}
