//! Database handle and transaction retry engine.
//!
//! # Architecture
//!
//! Each call to [`Db::transaction`] runs attempts until one commits or fails for
//! good. One attempt is:
//!
//! ```text
//! begin → set isolation → callback → commit hooks → commit
//!                              └──── (abort) ──────→ rollback
//! ```
//!
//! A failed attempt is retried when its [`TxAbort`] says so: serialization and
//! deadlock failures (SQLSTATE class 40), failed commits, and explicit
//! [`Tx::retry_now`]. Once more than `max_retries` retries would be needed the
//! call fails with [`DbError::TooManyAttempts`]. Waits between attempts grow
//! quadratically with the attempt number, carry random jitter and never shrink.
//!
//! Hooks belong to a single attempt. A retried attempt starts with none, so a
//! callback that wants a hook on every attempt registers it every time.

use super::mapper::Mapper;
use super::postgres::PgConnector;
use super::queryer::{Connector, Queryer, Transactional};
use super::trace::Traced;
use super::tx::Tx;
use crate::config::{DbConfig, IsolationLevel, RetryPolicy};
use crate::error::{DbError, DbResult, TxAbort};
use crate::models::Value;
use crate::record::{Record, TableRegistry};
use futures_util::future::BoxFuture;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Entry point for record operations and transactions.
#[derive(Debug, Clone)]
pub struct Db<C: Connector> {
    connector: C,
    mapper: Mapper,
    retry: RetryPolicy,
    isolation: IsolationLevel,
    trace: bool,
}

impl Db<PgConnector> {
    /// Connect to PostgreSQL using `config`.
    pub async fn connect(config: &DbConfig, tables: TableRegistry) -> DbResult<Self> {
        let connector = PgConnector::connect(config).await?;
        Ok(Self::new(connector, tables)
            .with_retry_policy(config.retry)
            .with_isolation(config.isolation)
            .with_trace(config.trace))
    }

    pub async fn close(&self) {
        self.connector.close().await;
    }
}

impl<C: Connector> Db<C> {
    /// Wrap `connector`. The table registry is frozen from here on.
    pub fn new(connector: C, tables: TableRegistry) -> Self {
        Self {
            connector,
            mapper: Mapper::new(tables),
            retry: RetryPolicy::default(),
            isolation: IsolationLevel::default(),
            trace: false,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    /// Collect per-statement timings for every transaction.
    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    // -------------------------------------------------------------------------
    // Direct record operations (outside any explicit transaction)
    // -------------------------------------------------------------------------

    pub async fn fetch_one<R: Record>(
        &self,
        record: &mut R,
        predicate: &str,
        args: &[Value],
    ) -> DbResult<bool> {
        let mut handle = self.connector.handle();
        self.mapper.fetch_one(&mut handle, record, predicate, args).await
    }

    /// Fetch the first record matching `predicate`, or `None`.
    ///
    /// A matched row is returned even when its id is 0; only "no row" yields `None`.
    pub async fn get<R: Record>(&self, predicate: &str, args: &[Value]) -> DbResult<Option<R>> {
        let mut record = R::default();
        let found = self.fetch_one(&mut record, predicate, args).await?;
        Ok(found.then_some(record))
    }

    pub async fn get_all<R: Record>(&self, predicate: &str, args: &[Value]) -> DbResult<Vec<R>> {
        let mut handle = self.connector.handle();
        self.mapper.fetch_all(&mut handle, predicate, args).await
    }

    pub async fn insert<R: Record>(&self, record: &mut R) -> DbResult<()> {
        let mut handle = self.connector.handle();
        self.mapper.insert(&mut handle, record).await
    }

    pub async fn update<R: Record>(&self, record: &mut R) -> DbResult<()> {
        let mut handle = self.connector.handle();
        self.mapper.update(&mut handle, record).await
    }

    // -------------------------------------------------------------------------
    // Transactions
    // -------------------------------------------------------------------------

    /// Run `callback` inside a transaction, retrying transient failures.
    ///
    /// ```ignore
    /// let total = db
    ///     .transaction(|tx| {
    ///         Box::pin(async move {
    ///             let mut order = tx.get::<Order>("id=$1", &args![id]).await?.unwrap_or_default();
    ///             order.total += 1;
    ///             tx.update(&mut order).await?;
    ///             Ok::<_, TxAbort>(order.total)
    ///         })
    ///     })
    ///     .await?;
    /// ```
    ///
    /// Failing to begin a transaction is returned as is, without retrying.
    pub async fn transaction<R, F>(&self, mut callback: F) -> DbResult<R>
    where
        R: Send,
        F: for<'c> FnMut(&'c mut Tx<C::Tx>) -> BoxFuture<'c, Result<R, TxAbort>> + Send,
    {
        let mut attempt: u32 = 1;
        let mut last_delay = Duration::ZERO;

        loop {
            let started = Instant::now();
            let conn = self.connector.begin().await?;
            let mut conn = Traced::new(conn, self.trace);

            if let Err(e) = conn.exec(&self.isolation.statement(), &[]).await {
                warn!(
                    isolation = %self.isolation,
                    error = %e,
                    "Could not set transaction isolation level, ignoring"
                );
            }

            let mut tx = Tx::new(conn, self.mapper.clone(), attempt);
            let outcome = match callback(&mut tx).await {
                Ok(value) => tx.run_commit_hooks().await.map(|()| value),
                Err(abort) => Err(abort),
            };

            let (conn, on_done, on_fail) = tx.into_parts();
            let outcome = match outcome {
                Ok(value) => match conn.commit().await {
                    Ok(()) => Ok(value),
                    Err(e) => Err(TxAbort::retry(e)),
                },
                Err(abort) => {
                    if let Err(e) = conn.rollback().await {
                        warn!(attempt, error = %e, "Rollback failed");
                    }
                    Err(abort)
                }
            };

            let TxAbort { error: err, retry } = match outcome {
                Ok(value) => {
                    info!(
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Transaction committed"
                    );
                    for hook in on_done {
                        hook();
                    }
                    return Ok(value);
                }
                Err(abort) => abort,
            };

            let (err, retry) = if retry && attempt > self.retry.max_retries {
                (DbError::too_many_attempts(attempt, err), false)
            } else {
                (err, retry)
            };

            for hook in on_fail {
                hook(retry);
            }

            if !retry {
                error!(attempt, error = %err, "Transaction failed");
                return Err(err);
            }

            attempt += 1;
            let delay = self.retry.delay_for(attempt).max(last_delay);
            last_delay = delay;
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying transaction"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            debug!(attempt, "Starting transaction attempt");
        }
    }
}
