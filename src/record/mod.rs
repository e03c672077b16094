//! Record mapping.
//!
//! This module turns plain structs into rows and back:
//! - Column annotations and cached field descriptors (`schema`)
//! - Rust type ↔ `Value` conversions (`column`)
//! - Record type → table name bindings (`registry`)
//! - Row hydration (`hydrate`)
//! - `impl_record!` and `args!` macros

pub mod column;
pub mod hydrate;
#[macro_use]
pub mod macros;
pub mod registry;
pub mod schema;

pub use column::ColumnType;
pub use hydrate::{hydrate, hydrate_new};
pub use registry::{TableRegistry, default_table_name};
pub use schema::{Column, ColumnFlags, Record, Schema, SchemaBuilder, parse_tag};
