//! FILENAME: records/src/lib.rs
//! Shared record model for the row-model pipeline.
//!
//! This crate holds the data types everything else agrees on: scalar
//! field values and immutable named-field records. It carries no pipeline
//! logic; the engine crate consumes these types and the demo app produces
//! them.

pub mod record;
pub mod value;

pub use record::Record;
pub use value::FieldValue;
