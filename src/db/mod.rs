//! Database access layer.
//!
//! This module provides:
//! - The queryer capability drivers implement
//! - Record ↔ statement translation
//! - The transaction handle and the retry engine
//! - Per-statement tracing
//! - The PostgreSQL driver

pub mod database;
pub mod mapper;
pub mod postgres;
pub mod queryer;
pub mod trace;
pub mod tx;

pub use crate::config::IsolationLevel;
pub use database::Db;
pub use mapper::{Mapper, Statement};
pub use postgres::{PgConnector, PgHandle, PgTx};
pub use queryer::{Connector, Queryer, Transactional};
pub use trace::{Traced, format_statement};
pub use tx::{CommitHook, DoneHook, FailHook, Tx};
