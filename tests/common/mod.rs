//! Scripted in-memory connector shared by the integration tests.

#![allow(dead_code)]

use sqlrecord::db::{Connector, Queryer, Transactional};
use sqlrecord::{DbError, DbResult, Row, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Responder = dyn Fn(&str, &[Value]) -> DbResult<Vec<Row>> + Send + Sync;

/// Everything the connector saw, in order.
#[derive(Debug, Default)]
pub struct Journal {
    statements: Mutex<Vec<(String, Vec<Value>)>>,
    begins: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

impl Journal {
    pub fn statements(&self) -> Vec<String> {
        self.entries().into_iter().map(|(sql, _)| sql).collect()
    }

    pub fn entries(&self) -> Vec<(String, Vec<Value>)> {
        self.statements.lock().unwrap().clone()
    }

    pub fn begins(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    fn record(&self, sql: &str, args: &[Value]) {
        self.statements
            .lock()
            .unwrap()
            .push((sql.to_string(), args.to_vec()));
    }
}

/// Connector whose statements are answered by a closure.
#[derive(Clone)]
pub struct MockConnector {
    responder: Arc<Responder>,
    journal: Arc<Journal>,
    failing_commits: Arc<AtomicUsize>,
    fail_begin: bool,
}

impl MockConnector {
    pub fn new(responder: impl Fn(&str, &[Value]) -> DbResult<Vec<Row>> + Send + Sync + 'static) -> Self {
        Self {
            responder: Arc::new(responder),
            journal: Arc::new(Journal::default()),
            failing_commits: Arc::new(AtomicUsize::new(0)),
            fail_begin: false,
        }
    }

    /// Answers every statement with no rows.
    pub fn empty() -> Self {
        Self::new(|_, _| Ok(Vec::new()))
    }

    /// Make the next `n` commits fail with a serialization failure.
    pub fn failing_commits(self, n: usize) -> Self {
        self.failing_commits.store(n, Ordering::SeqCst);
        self
    }

    pub fn failing_begin(mut self) -> Self {
        self.fail_begin = true;
        self
    }

    pub fn journal(&self) -> Arc<Journal> {
        self.journal.clone()
    }

    fn queryer(&self) -> MockQueryer {
        MockQueryer {
            responder: self.responder.clone(),
            journal: self.journal.clone(),
            failing_commits: self.failing_commits.clone(),
        }
    }
}

pub struct MockQueryer {
    responder: Arc<Responder>,
    journal: Arc<Journal>,
    failing_commits: Arc<AtomicUsize>,
}

impl Queryer for MockQueryer {
    async fn query(&mut self, sql: &str, args: &[Value]) -> DbResult<Vec<Row>> {
        self.journal.record(sql, args);
        (self.responder)(sql, args)
    }

    async fn query_row(&mut self, sql: &str, args: &[Value]) -> DbResult<Option<Row>> {
        Ok(self.query(sql, args).await?.into_iter().next())
    }

    async fn exec(&mut self, sql: &str, args: &[Value]) -> DbResult<u64> {
        Ok(self.query(sql, args).await?.len() as u64)
    }
}

impl Transactional for MockQueryer {
    async fn commit(self) -> DbResult<()> {
        self.journal.record("commit", &[]);
        let failing = self
            .failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(serialization_failure());
        }
        self.journal.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self) -> DbResult<()> {
        self.journal.record("rollback", &[]);
        self.journal.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Connector for MockConnector {
    type Tx = MockQueryer;
    type Handle<'a> = MockQueryer;

    fn handle(&self) -> MockQueryer {
        self.queryer()
    }

    async fn begin(&self) -> DbResult<MockQueryer> {
        if self.fail_begin {
            return Err(DbError::connection("connection refused", "Start the server"));
        }
        self.journal.begins.fetch_add(1, Ordering::SeqCst);
        Ok(self.queryer())
    }
}

/// SQLSTATE 40001, the error a serializable transaction gets on conflict.
pub fn serialization_failure() -> DbError {
    DbError::database(
        "could not serialize access due to read/write dependencies among transactions",
        Some("40001".to_string()),
        "Concurrent transaction conflict; retry the transaction",
    )
}

/// SQLSTATE 23505.
pub fn unique_violation() -> DbError {
    DbError::database(
        "duplicate key value violates unique constraint",
        Some("23505".to_string()),
        "Check the SQL syntax and referenced objects",
    )
}

pub fn row<const N: usize>(pairs: [(&str, Value); N]) -> Row {
    Row::from_pairs(pairs)
}

pub fn is_isolation(sql: &str) -> bool {
    sql.starts_with("set transaction isolation level")
}
