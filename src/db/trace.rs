//! Per-statement timing for transactions.
//!
//! [`Traced`] wraps a queryer and, when enabled, keeps a log with one line per
//! statement: the elapsed time in microseconds and the statement text with its
//! whitespace collapsed and each `$n` placeholder annotated with its argument:
//!
//! ```text
//! tx=5b0c0a8e-...
//!      412µs select * from "widgets" where id=$1:7
//!      180µs commit
//! ```
//!
//! The log is emitted at debug level on the `sqlrecord::trace` target when the
//! transaction commits or rolls back. Disabled tracing costs one branch per call.

use super::queryer::{Queryer, Transactional};
use crate::error::DbResult;
use crate::models::{Row, Value};
use regex::{Captures, Regex};
use std::fmt::Write as _;
use std::sync::LazyLock;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([0-9]+)").expect("valid regex"));

/// Collapse whitespace and annotate `$n` placeholders with their arguments.
/// Placeholders without a matching argument are left as they are.
pub fn format_statement(sql: &str, args: &[Value]) -> String {
    let collapsed = SPACE_RE.replace_all(sql.trim(), " ");
    PARAM_RE
        .replace_all(&collapsed, |caps: &Captures<'_>| {
            let placeholder = &caps[0];
            match caps[1].parse::<usize>() {
                Ok(n) if n > 0 && n <= args.len() => format!("{placeholder}:{}", args[n - 1]),
                _ => placeholder.to_string(),
            }
        })
        .into_owned()
}

#[derive(Debug)]
struct TraceLog {
    enabled: bool,
    id: Uuid,
    log: String,
}

impl TraceLog {
    fn record(&mut self, started: Instant, sql: &str, args: &[Value]) {
        if !self.enabled {
            return;
        }
        if self.log.is_empty() {
            let _ = writeln!(self.log, "tx={}", self.id);
        }
        let took = started.elapsed().as_micros();
        let _ = writeln!(self.log, "{took:>8}µs {}", format_statement(sql, args));
    }

    fn flush(&self, outcome: &'static str) {
        if self.enabled && !self.log.is_empty() {
            debug!(target: "sqlrecord::trace", trace_id = %self.id, outcome, "\n{}", self.log);
        }
    }
}

/// Queryer decorator collecting statement timings.
#[derive(Debug)]
pub struct Traced<Q> {
    inner: Q,
    trace: TraceLog,
}

impl<Q> Traced<Q> {
    pub fn new(inner: Q, enabled: bool) -> Self {
        Self {
            inner,
            trace: TraceLog {
                enabled,
                id: Uuid::new_v4(),
                log: String::new(),
            },
        }
    }

    /// The log collected so far; empty when tracing is off.
    pub fn stats(&self) -> &str {
        &self.trace.log
    }
}

impl<Q: Queryer> Queryer for Traced<Q> {
    async fn query(&mut self, sql: &str, args: &[Value]) -> DbResult<Vec<Row>> {
        let started = Instant::now();
        let result = self.inner.query(sql, args).await;
        self.trace.record(started, sql, args);
        result
    }

    async fn query_row(&mut self, sql: &str, args: &[Value]) -> DbResult<Option<Row>> {
        let started = Instant::now();
        let result = self.inner.query_row(sql, args).await;
        self.trace.record(started, sql, args);
        result
    }

    async fn exec(&mut self, sql: &str, args: &[Value]) -> DbResult<u64> {
        let started = Instant::now();
        let result = self.inner.exec(sql, args).await;
        self.trace.record(started, sql, args);
        result
    }
}

impl<Q: Transactional> Transactional for Traced<Q> {
    async fn commit(self) -> DbResult<()> {
        let Traced { inner, mut trace } = self;
        let started = Instant::now();
        let result = inner.commit().await;
        trace.record(started, "commit", &[]);
        trace.flush(if result.is_ok() { "committed" } else { "commit failed" });
        result
    }

    async fn rollback(self) -> DbResult<()> {
        let Traced { inner, mut trace } = self;
        let started = Instant::now();
        let result = inner.rollback().await;
        trace.record(started, "rollback", &[]);
        trace.flush("rolled back");
        result
    }
}
