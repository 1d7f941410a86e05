//! Core vocabulary shared across the cluster
//!
//! - Documents and field values
//! - Sort keys (field + direction sequences)
//! - Index schema
//! - Match queries
//! - Hash-slot document routing

pub mod document;
pub mod query;
pub mod schema;
pub mod shard;
pub mod sort;

// Re-export commonly used types
pub use document::{Document, FieldValue};
pub use query::{Query, QueryParseError};
pub use schema::{DynamicField, FieldDef, FieldType, IndexSchema, SchemaError};
pub use shard::{slot_for_key, SlotRange, TOTAL_SLOTS};
pub use sort::{SortDirection, SortField, SortKey, SortParseError, SortValues};
