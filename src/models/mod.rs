//! Data models shared by the mapper and the drivers.
//!
//! This module re-exports the value and row types that cross the boundary
//! between records and the database driver.

pub mod row;
pub mod value;

pub use row::Row;
pub use value::{Kind, Value};
