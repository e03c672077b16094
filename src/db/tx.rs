//! The handle a transaction callback works with.
//!
//! A [`Tx`] lives for exactly one attempt. It carries the traced driver
//! transaction, the attempt number, the attempt's start time and the hooks the
//! callback registered. Every operation returns `Result<_, TxAbort>`: driver
//! errors are classified on the way out (SQLSTATE class 40 is retryable), so `?`
//! unwinds the callback straight back to the retry engine.

use super::mapper::Mapper;
use super::queryer::{Queryer, Transactional};
use super::trace::Traced;
use crate::error::{DbError, TxAbort};
use crate::impl_record;
use crate::models::{Row, Value};
use crate::record::Record;
use chrono::{DateTime, SubsecRound, Utc};
use futures_util::future::BoxFuture;
use std::mem;
use tracing::debug;

/// Async hook run after the callback succeeds and before COMMIT.
pub type CommitHook<T> =
    Box<dyn for<'c> FnOnce(&'c mut Tx<T>) -> BoxFuture<'c, Result<(), TxAbort>> + Send>;
/// Hook run after a successful COMMIT.
pub type DoneHook = Box<dyn FnOnce() + Send>;
/// Hook run after a failed attempt, with the final retry decision.
pub type FailHook = Box<dyn FnOnce(bool) + Send>;

#[derive(Debug, Default)]
struct SeqValue {
    nextval: i64,
}

impl_record! {
    SeqValue {
        nextval => "nextval",
    }
}

/// One attempt of a transaction.
pub struct Tx<T: Transactional> {
    conn: Traced<T>,
    mapper: Mapper,
    now: DateTime<Utc>,
    attempt: u32,
    on_commit: Vec<CommitHook<T>>,
    on_done: Vec<DoneHook>,
    on_fail: Vec<FailHook>,
}

impl<T: Transactional> std::fmt::Debug for Tx<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tx")
            .field("attempt", &self.attempt)
            .field("now", &self.now)
            .field("on_commit", &self.on_commit.len())
            .field("on_done", &self.on_done.len())
            .field("on_fail", &self.on_fail.len())
            .finish_non_exhaustive()
    }
}

impl<T: Transactional> Tx<T> {
    pub(crate) fn new(conn: Traced<T>, mapper: Mapper, attempt: u32) -> Self {
        Self {
            conn,
            mapper,
            now: Utc::now().trunc_subsecs(3),
            attempt,
            on_commit: Vec::new(),
            on_done: Vec::new(),
            on_fail: Vec::new(),
        }
    }

    /// Start time of this attempt, UTC, truncated to milliseconds.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Attempt number, starting at 1.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn table<R: Record>(&self) -> String {
        self.mapper.table::<R>()
    }

    pub fn pk_string<R: Record>(&self, record: &R) -> String {
        self.mapper.pk_string(record)
    }

    /// Statement timings collected so far; empty unless tracing is enabled.
    pub fn trace_log(&self) -> &str {
        self.conn.stats()
    }

    // -------------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------------

    pub async fn query(&mut self, sql: &str, args: &[Value]) -> Result<Vec<Row>, TxAbort> {
        Ok(self.conn.query(sql, args).await?)
    }

    pub async fn query_row(&mut self, sql: &str, args: &[Value]) -> Result<Option<Row>, TxAbort> {
        Ok(self.conn.query_row(sql, args).await?)
    }

    /// Run a statement, returning the number of affected rows.
    pub async fn exec(&mut self, sql: &str, args: &[Value]) -> Result<u64, TxAbort> {
        Ok(self.conn.exec(sql, args).await?)
    }

    // -------------------------------------------------------------------------
    // Records
    // -------------------------------------------------------------------------

    /// Load the first row matching `predicate` into `record`; `false` if none matched.
    pub async fn fetch_one<R: Record>(
        &mut self,
        record: &mut R,
        predicate: &str,
        args: &[Value],
    ) -> Result<bool, TxAbort> {
        Ok(self
            .mapper
            .fetch_one(&mut self.conn, record, predicate, args)
            .await?)
    }

    /// Fetch the first record matching `predicate`, or `None`.
    ///
    /// A matched row is returned even when its id is 0; only "no row" yields `None`.
    pub async fn get<R: Record>(
        &mut self,
        predicate: &str,
        args: &[Value],
    ) -> Result<Option<R>, TxAbort> {
        let mut record = R::default();
        let found = self.fetch_one(&mut record, predicate, args).await?;
        Ok(found.then_some(record))
    }

    pub async fn get_all<R: Record>(
        &mut self,
        predicate: &str,
        args: &[Value],
    ) -> Result<Vec<R>, TxAbort> {
        Ok(self.mapper.fetch_all(&mut self.conn, predicate, args).await?)
    }

    /// Insert `record`; afterwards it holds the stored row.
    pub async fn insert<R: Record>(&mut self, record: &mut R) -> Result<(), TxAbort> {
        Ok(self.mapper.insert(&mut self.conn, record).await?)
    }

    /// Update the stored row with `record`'s identity; afterwards `record` holds it.
    pub async fn update<R: Record>(&mut self, record: &mut R) -> Result<(), TxAbort> {
        Ok(self.mapper.update(&mut self.conn, record).await?)
    }

    /// Next value of the named sequence.
    pub async fn next_seq(&mut self, sequence: &str) -> Result<i64, TxAbort> {
        let mut seq = SeqValue::default();
        let found = self
            .fetch_one(&mut seq, ":select nextval($1::regclass)", &[Value::from(sequence)])
            .await?;
        if !found {
            return Err(TxAbort::abort(DbError::internal(format!(
                "nextval('{sequence}') returned no row"
            ))));
        }
        Ok(seq.nextval)
    }

    // -------------------------------------------------------------------------
    // Control flow
    // -------------------------------------------------------------------------

    /// Stop the transaction for good. Use as `return tx.abort_now(err);` or with `?`.
    pub fn abort_now<V>(&self, error: impl Into<DbError>) -> Result<V, TxAbort> {
        Err(TxAbort::abort(error))
    }

    /// Roll back and run the callback again, subject to the attempt ceiling.
    pub fn retry_now<V>(&self, error: impl Into<DbError>) -> Result<V, TxAbort> {
        Err(TxAbort::retry(error))
    }

    // -------------------------------------------------------------------------
    // Hooks
    // -------------------------------------------------------------------------

    /// Run `hook` after the callback returns successfully, before COMMIT, in
    /// registration order. The hook can still abort the transaction.
    pub fn on_commit<F>(&mut self, hook: F)
    where
        F: for<'c> FnOnce(&'c mut Tx<T>) -> BoxFuture<'c, Result<(), TxAbort>> + Send + 'static,
    {
        self.on_commit.push(Box::new(hook));
    }

    /// Run `hook` once the transaction has committed.
    pub fn on_done(&mut self, hook: impl FnOnce() + Send + 'static) {
        self.on_done.push(Box::new(hook));
    }

    /// Run `hook` when this attempt fails. It receives whether another attempt follows.
    pub fn on_fail(&mut self, hook: impl FnOnce(bool) + Send + 'static) {
        self.on_fail.push(Box::new(hook));
    }

    /// Run the commit hooks registered so far. Hooks registered by a commit hook
    /// are ignored.
    pub(crate) async fn run_commit_hooks(&mut self) -> Result<(), TxAbort> {
        let hooks = mem::take(&mut self.on_commit);
        if !hooks.is_empty() {
            debug!(count = hooks.len(), attempt = self.attempt, "Running commit hooks");
        }
        for hook in hooks {
            hook(&mut *self).await?;
        }
        Ok(())
    }

    pub(crate) fn into_parts(self) -> (Traced<T>, Vec<DoneHook>, Vec<FailHook>) {
        (self.conn, self.on_done, self.on_fail)
    }
}
