//! Field descriptors for records.
//!
//! A record type describes its bound columns once, through [`SchemaBuilder`], and
//! the resulting [`Schema`] is cached for the life of the process. Everything the
//! mapper needs (column names, write policy, field access, identity) comes from
//! the schema, so no per-call introspection happens.
//!
//! # Column annotations
//!
//! Columns are declared with a tag of the form `<column>[,<flag>]*`:
//!
//! - `nowrite`: never written by INSERT or UPDATE (computed columns, triggers)
//! - `nullempty`: left out of INSERT when the field holds its empty value
//!
//! `Option<T>` fields behave as `nullempty` whether or not the flag is present.

use super::column::ColumnType;
use crate::error::{DbError, DbResult};
use crate::models::Value;
use std::collections::HashMap;

pub const FLAG_NULL_EMPTY: &str = "nullempty";
pub const FLAG_NO_WRITE: &str = "nowrite";

/// Write-policy flags of a bound column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnFlags {
    pub null_empty: bool,
    pub no_write: bool,
}

/// Split a column tag into the column name and its flags. Unknown flags are ignored.
pub fn parse_tag(tag: &str) -> (String, ColumnFlags) {
    let mut parts = tag.split(',');
    let name = parts.next().unwrap_or_default().trim().to_string();
    let mut flags = ColumnFlags::default();
    for flag in parts.map(str::trim) {
        match flag {
            FLAG_NULL_EMPTY => flags.null_empty = true,
            FLAG_NO_WRITE => flags.no_write = true,
            _ => {}
        }
    }
    (name, flags)
}

type Reader<R> = Box<dyn Fn(&R) -> Value + Send + Sync>;
type EmptyCheck<R> = Box<dyn Fn(&R) -> bool + Send + Sync>;
type Writer<R> = Box<dyn Fn(&mut R, Value) -> Result<(), Value> + Send + Sync>;
type IdReader<R> = Box<dyn Fn(&R) -> i64 + Send + Sync>;

/// One bound column of record type `R`.
pub struct Column<R> {
    name: String,
    flags: ColumnFlags,
    optional: bool,
    read: Reader<R>,
    empty: EmptyCheck<R>,
    write: Writer<R>,
}

impl<R> Column<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flags(&self) -> ColumnFlags {
        self.flags
    }

    /// Whether the column is skipped on INSERT when empty (flag or `Option` field).
    pub fn null_if_empty(&self) -> bool {
        self.flags.null_empty || self.optional
    }

    /// Current field value as a statement argument.
    pub fn read(&self, record: &R) -> Value {
        (self.read)(record)
    }

    pub fn is_empty(&self, record: &R) -> bool {
        (self.empty)(record)
    }

    /// Store `value` into the field, failing when it does not fit the field type.
    pub fn write(&self, record: &mut R, value: Value) -> DbResult<()> {
        (self.write)(record, value).map_err(|rejected| {
            DbError::decode(
                &self.name,
                format!("cannot store {} value into this field", rejected.type_name()),
            )
        })
    }

    /// Whether INSERT should carry this column for `record`.
    pub fn writes_on_insert(&self, record: &R) -> bool {
        !(self.flags.no_write || (self.null_if_empty() && self.is_empty(record)))
    }

    /// Whether UPDATE should carry this column. Emptiness does not matter here.
    pub fn writes_on_update(&self) -> bool {
        !self.flags.no_write
    }
}

impl<R> std::fmt::Debug for Column<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("optional", &self.optional)
            .finish()
    }
}

/// Cached description of a record type.
pub struct Schema<R> {
    type_name: &'static str,
    columns: Vec<Column<R>>,
    by_name: HashMap<String, usize>,
    identity: Option<IdReader<R>>,
}

impl<R: 'static> Schema<R> {
    pub fn builder(type_name: &'static str) -> SchemaBuilder<R> {
        SchemaBuilder {
            type_name,
            columns: Vec::new(),
            identity: None,
            embedded_identity: None,
        }
    }

    /// Rust type name, used to derive the default table name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Bound columns in declaration order, embedded columns flattened in place.
    pub fn columns(&self) -> &[Column<R>] {
        &self.columns
    }

    /// Column bound to `name`. On duplicate names the last declared column wins.
    pub fn column(&self, name: &str) -> Option<&Column<R>> {
        self.by_name.get(name).map(|&idx| &self.columns[idx])
    }

    /// Visit every bound column with its flags and current value.
    pub fn walk(&self, record: &R, mut visit: impl FnMut(&str, ColumnFlags, Value)) {
        for column in &self.columns {
            visit(column.name(), column.flags(), column.read(record));
        }
    }

    pub fn has_identity(&self) -> bool {
        self.identity.is_some()
    }

    /// Identity (primary key) of `record`, or 0 when the type declares none.
    pub fn id(&self, record: &R) -> i64 {
        self.identity.as_ref().map(|id| id(record)).unwrap_or(0)
    }
}

impl<R> std::fmt::Debug for Schema<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("type_name", &self.type_name)
            .field("columns", &self.columns)
            .field("identity", &self.identity.is_some())
            .finish()
    }
}

/// Builder for [`Schema`]. Columns are kept in the order they are declared.
pub struct SchemaBuilder<R> {
    type_name: &'static str,
    columns: Vec<Column<R>>,
    identity: Option<IdReader<R>>,
    embedded_identity: Option<IdReader<R>>,
}

impl<R: 'static> SchemaBuilder<R> {
    /// Bind a field to the column described by `tag`.
    pub fn column<T: ColumnType>(
        mut self,
        tag: &str,
        get: fn(&R) -> &T,
        get_mut: fn(&mut R) -> &mut T,
    ) -> Self {
        let (name, flags) = parse_tag(tag);
        self.columns.push(Column {
            name,
            flags,
            optional: T::OPTIONAL,
            read: Box::new(move |r: &R| get(r).to_value()),
            empty: Box::new(move |r: &R| get(r).is_empty()),
            write: Box::new(move |r: &mut R, value: Value| {
                *get_mut(r) = T::from_value(value)?;
                Ok(())
            }),
        });
        self
    }

    /// Bind a field that is also the record's identity.
    pub fn id<T: ColumnType>(
        mut self,
        tag: &str,
        get: fn(&R) -> &T,
        get_mut: fn(&mut R) -> &mut T,
    ) -> Self {
        self.identity = Some(Box::new(move |r: &R| get(r).to_value().as_i64().unwrap_or(0)));
        self.column(tag, get, get_mut)
    }

    /// Flatten the columns of an embedded record into this one.
    ///
    /// The embedded identity is used only when the outer record declares none.
    pub fn embed<C: Record>(mut self, get: fn(&R) -> &C, get_mut: fn(&mut R) -> &mut C) -> Self {
        let inner: &'static Schema<C> = C::schema();
        for column in inner.columns() {
            self.columns.push(Column {
                name: column.name.clone(),
                flags: column.flags,
                optional: column.optional,
                read: Box::new(move |r: &R| column.read(get(r))),
                empty: Box::new(move |r: &R| column.is_empty(get(r))),
                write: Box::new(move |r: &mut R, value: Value| (column.write)(get_mut(r), value)),
            });
        }
        if inner.has_identity() && self.embedded_identity.is_none() {
            self.embedded_identity = Some(Box::new(move |r: &R| inner.id(get(r))));
        }
        self
    }

    pub fn build(self) -> Schema<R> {
        let by_name = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, column)| (column.name.clone(), idx))
            .collect();
        Schema {
            type_name: self.type_name,
            columns: self.columns,
            by_name,
            identity: self.identity.or(self.embedded_identity),
        }
    }
}

/// A plain data type mapped to a table.
///
/// Implement it with [`impl_record!`](crate::impl_record), or by hand by returning
/// a schema cached in a `OnceLock`.
pub trait Record: Default + Send + Sync + 'static {
    fn schema() -> &'static Schema<Self>;

    /// Identity of this record, 0 when it has none.
    fn id(&self) -> i64 {
        Self::schema().id(self)
    }
}
