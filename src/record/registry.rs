//! Record type → table name bindings.
//!
//! The registry is filled while the application starts up and then handed to
//! [`Db`](crate::Db), which keeps it behind an `Arc`. From that point on it can
//! only be read, so registration always happens before the first lookup.

use super::Record;
use std::any::TypeId;
use std::collections::HashMap;

/// Derived table name for a type that was never registered: `lowercase(name) + "s"`.
pub fn default_table_name(type_name: &str) -> String {
    format!("{}s", type_name.to_lowercase())
}

#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    names: HashMap<TypeId, String>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or overwrite) the table used for record type `R`.
    pub fn set_table_name<R: Record>(&mut self, name: impl Into<String>) -> &mut Self {
        self.names.insert(TypeId::of::<R>(), name.into());
        self
    }

    /// Builder-style variant of [`set_table_name`](Self::set_table_name).
    pub fn with_table<R: Record>(mut self, name: impl Into<String>) -> Self {
        self.set_table_name::<R>(name);
        self
    }

    /// Table for `R`: the registered name, or the derived default.
    /// A registered empty name counts as unregistered.
    pub fn table_name<R: Record>(&self) -> String {
        match self.names.get(&TypeId::of::<R>()) {
            Some(name) if !name.is_empty() => name.clone(),
            _ => default_table_name(R::schema().type_name()),
        }
    }

    /// `"<table>:<id>"`, used in diagnostics.
    pub fn pk_string<R: Record>(&self, record: &R) -> String {
        format!("{}:{}", self.table_name::<R>(), record.id())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
