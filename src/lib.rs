//! sqlrecord
//!
//! A record-mapping and transaction layer for PostgreSQL. Plain structs bound to
//! table columns are loaded, inserted and updated through generated statements,
//! and units of work run under serializable isolation with automatic retries on
//! serialization conflicts.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
#[macro_use]
pub mod record;

pub use config::{DbConfig, IsolationLevel, PoolOptions, RetryPolicy};
pub use db::{Connector, Db, Mapper, PgConnector, Queryer, Transactional, Tx};
pub use error::{DbError, DbResult, TxAbort};
pub use models::{Kind, Row, Value};
pub use record::{ColumnType, Record, Schema, TableRegistry};
pub use futures_util::future::BoxFuture;
