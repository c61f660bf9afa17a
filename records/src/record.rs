//! FILENAME: records/src/record.rs
//! Records - immutable rows of named scalar fields.
//!
//! A record is built once (usually by an ingest layer or a generator) and
//! then shared read-only behind `Arc` by every pipeline stage and display
//! row that references it.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::value::FieldValue;

static EMPTY_VALUE: FieldValue = FieldValue::Empty;

/// One transactional record: a unique id plus named field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier, assigned by the data source.
    pub id: String,

    /// Field name to value. Absent names read as `FieldValue::Empty`.
    fields: FxHashMap<String, FieldValue>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Record {
            id: id.into(),
            fields: FxHashMap::default(),
        }
    }

    /// Builder-style field assignment, for fixtures and generators.
    pub fn with(mut self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) {
        self.fields.insert(field.to_string(), value.into());
    }

    /// Reads a field. Missing fields are indistinguishable from explicit
    /// `Empty` values, matching how nullable source columns behave.
    pub fn field(&self, name: &str) -> &FieldValue {
        self.fields.get(name).unwrap_or(&EMPTY_VALUE)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}
