//! Record ↔ statement translation.
//!
//! The statement builders are pure functions over a record and its table name;
//! [`Mapper`] resolves the table, runs the statement on any [`Queryer`] and
//! hydrates the result back into the record.
//!
//! # Predicates
//!
//! Fetch operations take a predicate. A plain predicate becomes the WHERE clause
//! of `select * from "<table>"`. A predicate starting with `:` is a complete
//! statement and is used verbatim, minus the `:`.
//!
//! # Writes
//!
//! INSERT and UPDATE both end in `returning *`, and the returned row is hydrated
//! into the record, so after a write the record holds what the database stored,
//! including server-side defaults and identity values.

use super::queryer::Queryer;
use crate::error::{DbError, DbResult};
use crate::models::Value;
use crate::record::{Record, TableRegistry, hydrate, hydrate_new};
use std::sync::Arc;
use tracing::debug;

/// Marks a predicate as a complete statement.
pub const COMPLETE_STATEMENT_PREFIX: char = ':';

/// A statement ready to run: SQL text plus positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

/// Build the SELECT for a fetch predicate.
pub fn select_statement(table: &str, predicate: &str) -> DbResult<String> {
    if let Some(statement) = predicate.strip_prefix(COMPLETE_STATEMENT_PREFIX) {
        if statement.trim().is_empty() {
            return Err(DbError::invalid_input("complete statement is empty"));
        }
        return Ok(statement.to_string());
    }
    if predicate.trim().is_empty() {
        return Err(DbError::invalid_input(
            "predicate is empty; use \"true\" to match every row",
        ));
    }
    Ok(format!(r#"select * from "{table}" where {predicate}"#))
}

/// Build the INSERT for `record`.
///
/// Columns flagged `nowrite` are skipped, and so are `nullempty`/optional columns
/// holding their empty value. With no column left the row is inserted with
/// default values.
pub fn insert_statement<R: Record>(table: &str, record: &R) -> Statement {
    let mut fields = Vec::new();
    let mut exprs = Vec::new();
    let mut args = Vec::new();

    for column in R::schema().columns() {
        if !column.writes_on_insert(record) {
            continue;
        }
        args.push(column.read(record));
        fields.push(format!(r#""{}""#, column.name()));
        exprs.push(format!("${}", args.len()));
    }

    let sql = if fields.is_empty() {
        format!(r#"insert into "{table}" default values returning *"#)
    } else {
        format!(
            r#"insert into "{table}" ({}) values ({}) returning *"#,
            fields.join(", "),
            exprs.join(", ")
        )
    };
    Statement { sql, args }
}

/// Build the UPDATE for `record`, keyed on its identity (`$1`).
///
/// Every column except `nowrite` ones is written, empty or not.
pub fn update_statement<R: Record>(table: &str, record: &R) -> Statement {
    let mut exprs = Vec::new();
    let mut args = vec![Value::Int(record.id())];

    for column in R::schema().columns() {
        if !column.writes_on_update() {
            continue;
        }
        args.push(column.read(record));
        exprs.push(format!(r#""{}"=${}"#, column.name(), args.len()));
    }

    let sql = format!(
        r#"update "{table}" set {} where id=$1 returning *"#,
        exprs.join(", ")
    );
    Statement { sql, args }
}

/// Runs record operations against a queryer, resolving tables through a registry.
#[derive(Debug, Clone, Default)]
pub struct Mapper {
    tables: Arc<TableRegistry>,
}

impl Mapper {
    pub fn new(tables: TableRegistry) -> Self {
        Self {
            tables: Arc::new(tables),
        }
    }

    pub fn tables(&self) -> &TableRegistry {
        &self.tables
    }

    /// Table name for record type `R`.
    pub fn table<R: Record>(&self) -> String {
        self.tables.table_name::<R>()
    }

    /// `"<table>:<id>"` for diagnostics.
    pub fn pk_string<R: Record>(&self, record: &R) -> String {
        self.tables.pk_string(record)
    }

    /// Load the first row matching `predicate` into `record`.
    ///
    /// Returns `false`, leaving `record` untouched, when nothing matched.
    pub async fn fetch_one<Q: Queryer, R: Record>(
        &self,
        q: &mut Q,
        record: &mut R,
        predicate: &str,
        args: &[Value],
    ) -> DbResult<bool> {
        let sql = select_statement(&self.table::<R>(), predicate)?;
        debug!(sql = %sql, params = args.len(), "Fetching record");

        match q.query_row(&sql, args).await? {
            Some(row) => {
                hydrate(record, &row)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Load every row matching `predicate` as a fresh record, in cursor order.
    pub async fn fetch_all<Q: Queryer, R: Record>(
        &self,
        q: &mut Q,
        predicate: &str,
        args: &[Value],
    ) -> DbResult<Vec<R>> {
        let sql = select_statement(&self.table::<R>(), predicate)?;
        debug!(sql = %sql, params = args.len(), "Fetching records");

        let rows = q.query(&sql, args).await?;
        rows.iter().map(hydrate_new::<R>).collect()
    }

    /// Insert `record` and reload it from the returned row.
    pub async fn insert<Q: Queryer, R: Record>(&self, q: &mut Q, record: &mut R) -> DbResult<()> {
        let table = self.table::<R>();
        let statement = insert_statement(&table, record);
        debug!(sql = %statement.sql, params = statement.args.len(), "Inserting record");

        let row = q
            .query_row(&statement.sql, &statement.args)
            .await?
            .ok_or_else(|| {
                DbError::internal(format!(
                    "insert into \"{table}\" returned no row; the statement must support `returning *`"
                ))
            })?;
        hydrate(record, &row)
    }

    /// Update the stored row with `record`'s identity and reload it.
    ///
    /// Fails with [`DbError::UpdateFailed`], leaving `record` untouched, when no
    /// row has that identity.
    pub async fn update<Q: Queryer, R: Record>(&self, q: &mut Q, record: &mut R) -> DbResult<()> {
        let statement = update_statement(&self.table::<R>(), record);
        debug!(sql = %statement.sql, params = statement.args.len(), "Updating record");

        match q.query_row(&statement.sql, &statement.args).await? {
            Some(row) => hydrate(record, &row),
            None => Err(DbError::update_failed(self.pk_string(record))),
        }
    }
}
