//! The capability the mapper and the transaction engine need from a driver.
//!
//! The traits are implemented by the PostgreSQL driver in [`super::postgres`], by
//! the trace decorator in [`super::trace`], and by anything else that can run
//! statements (test doubles included).

use crate::error::DbResult;
use crate::models::{Row, Value};
use std::future::Future;

/// Runs statements with `$n` positional arguments.
pub trait Queryer: Send {
    /// Run a statement and collect every row it returns, in cursor order.
    fn query(&mut self, sql: &str, args: &[Value])
    -> impl Future<Output = DbResult<Vec<Row>>> + Send;

    /// Run a statement and return its first row, if any.
    fn query_row(
        &mut self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = DbResult<Option<Row>>> + Send;

    /// Run a statement and return the number of affected rows.
    fn exec(&mut self, sql: &str, args: &[Value]) -> impl Future<Output = DbResult<u64>> + Send;
}

/// A queryer bound to an open transaction.
pub trait Transactional: Queryer + Sized {
    fn commit(self) -> impl Future<Output = DbResult<()>> + Send;

    fn rollback(self) -> impl Future<Output = DbResult<()>> + Send;
}

/// Source of transactions and of plain, auto-committing queryers.
pub trait Connector: Send + Sync {
    type Tx: Transactional + 'static;

    type Handle<'a>: Queryer
    where
        Self: 'a;

    /// A queryer that runs each statement outside any explicit transaction.
    fn handle(&self) -> Self::Handle<'_>;

    fn begin(&self) -> impl Future<Output = DbResult<Self::Tx>> + Send;
}
