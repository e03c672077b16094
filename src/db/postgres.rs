//! PostgreSQL driver built on sqlx.
//!
//! # Architecture
//!
//! Values cross the driver boundary in two directions:
//! 1. Arguments: each [`Value`] is bound to the sqlx query with its native type,
//!    NULLs bound with the type their `Kind` names
//! 2. Results: `categorize_type` classifies each column's type name and the
//!    matching decoder turns it into a [`Value`]
//!
//! Column types that have no decoder become [`Value::Unsupported`], which only
//! fails when a bound field tries to store it.

use super::queryer::{Connector, Queryer, Transactional};
use crate::config::DbConfig;
use crate::error::{DbError, DbResult};
use crate::models::{Kind, Row, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{Column, Postgres, Row as _, Transaction, TypeInfo};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

// =============================================================================
// Parameter Binding
// =============================================================================

/// Bind a value to a PostgreSQL query.
pub(crate) fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &'q Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null(kind) => bind_null(query, *kind),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.as_str()),
        Value::Bytes(v) => query.bind(v.as_slice()),
        Value::Json(v) => query.bind(Json(v)),
        Value::Timestamp(v) => query.bind(*v),
        Value::Uuid(v) => query.bind(*v),
        // never produced for arguments; bind as untyped NULL
        Value::Unsupported(_) => query.bind(None::<String>),
    }
}

fn bind_null(
    query: Query<'_, Postgres, PgArguments>,
    kind: Kind,
) -> Query<'_, Postgres, PgArguments> {
    match kind {
        Kind::Bool => query.bind(None::<bool>),
        Kind::Int => query.bind(None::<i64>),
        Kind::Float => query.bind(None::<f64>),
        Kind::Bytes => query.bind(None::<Vec<u8>>),
        Kind::Json => query.bind(None::<JsonValue>),
        Kind::Timestamp => query.bind(None::<DateTime<Utc>>),
        Kind::Uuid => query.bind(None::<Uuid>),
        Kind::Text | Kind::Unknown => query.bind(None::<String>),
    }
}

fn prepare<'q>(sql: &'q str, args: &'q [Value]) -> Query<'q, Postgres, PgArguments> {
    args.iter().fold(sqlx::query(sql), bind_value)
}

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for PostgreSQL column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Uuid,
    Timestamp,
    Unknown,
}

/// Classify a PostgreSQL type name into a logical category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_lowercase();

    if lower.contains("numeric") || lower.contains("decimal") {
        return TypeCategory::Decimal;
    }

    match lower.as_str() {
        "int2" | "int4" | "int8" | "smallint" | "integer" | "bigint" => TypeCategory::Integer,
        "float4" | "float8" | "real" | "double precision" => TypeCategory::Float,
        "bool" | "boolean" => TypeCategory::Boolean,
        "text" | "varchar" | "bpchar" | "name" | "char" | "unknown" => TypeCategory::Text,
        "bytea" => TypeCategory::Binary,
        "json" | "jsonb" => TypeCategory::Json,
        "uuid" => TypeCategory::Uuid,
        "timestamptz" | "timestamp" | "date" => TypeCategory::Timestamp,
        _ => TypeCategory::Unknown,
    }
}

// =============================================================================
// Row Decoding
// =============================================================================

/// Decode a PostgreSQL row into a driver-neutral [`Row`].
pub(crate) fn decode_row(row: &PgRow, columns: &Arc<[String]>) -> DbResult<Row> {
    let values = row
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            let type_name = col.type_info().name();
            decode_column(row, idx, type_name)
                .map_err(|e| DbError::decode(col.name(), e.to_string()))
        })
        .collect::<DbResult<Vec<_>>>()?;
    Ok(Row::new(columns.clone(), values))
}

fn column_names(row: &PgRow) -> Arc<[String]> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

fn decode_rows(rows: Vec<PgRow>) -> DbResult<Vec<Row>> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let columns = column_names(first);
    rows.iter().map(|row| decode_row(row, &columns)).collect()
}

fn or_null<T>(value: Option<T>, kind: Kind, wrap: impl FnOnce(T) -> Value) -> Value {
    value.map(wrap).unwrap_or(Value::Null(kind))
}

fn decode_column(row: &PgRow, idx: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    let value = match categorize_type(type_name) {
        TypeCategory::Integer => match type_name {
            "INT2" => or_null(row.try_get::<Option<i16>, _>(idx)?, Kind::Int, |v| {
                Value::Int(v.into())
            }),
            "INT4" => or_null(row.try_get::<Option<i32>, _>(idx)?, Kind::Int, |v| {
                Value::Int(v.into())
            }),
            _ => or_null(row.try_get::<Option<i64>, _>(idx)?, Kind::Int, Value::Int),
        },
        TypeCategory::Float => match type_name {
            "FLOAT4" => or_null(row.try_get::<Option<f32>, _>(idx)?, Kind::Float, |v| {
                Value::Float(v.into())
            }),
            _ => or_null(row.try_get::<Option<f64>, _>(idx)?, Kind::Float, Value::Float),
        },
        TypeCategory::Boolean => or_null(row.try_get::<Option<bool>, _>(idx)?, Kind::Bool, Value::Bool),
        TypeCategory::Text => or_null(row.try_get::<Option<String>, _>(idx)?, Kind::Text, Value::Text),
        TypeCategory::Binary => {
            or_null(row.try_get::<Option<Vec<u8>>, _>(idx)?, Kind::Bytes, Value::Bytes)
        }
        TypeCategory::Json => {
            or_null(row.try_get::<Option<JsonValue>, _>(idx)?, Kind::Json, Value::Json)
        }
        TypeCategory::Uuid => or_null(row.try_get::<Option<Uuid>, _>(idx)?, Kind::Uuid, Value::Uuid),
        TypeCategory::Timestamp => match type_name {
            "TIMESTAMP" => or_null(
                row.try_get::<Option<NaiveDateTime>, _>(idx)?,
                Kind::Timestamp,
                |v| Value::Timestamp(v.and_utc()),
            ),
            "DATE" => or_null(
                row.try_get::<Option<NaiveDate>, _>(idx)?,
                Kind::Timestamp,
                |v| Value::Timestamp(v.and_time(NaiveTime::MIN).and_utc()),
            ),
            _ => or_null(
                row.try_get::<Option<DateTime<Utc>>, _>(idx)?,
                Kind::Timestamp,
                Value::Timestamp,
            ),
        },
        TypeCategory::Decimal | TypeCategory::Unknown => Value::Unsupported(type_name.to_string()),
    };
    Ok(value)
}

// =============================================================================
// Queryers
// =============================================================================

/// Auto-committing queryer over the pool.
#[derive(Debug, Clone, Copy)]
pub struct PgHandle<'a> {
    pool: &'a PgPool,
}

impl Queryer for PgHandle<'_> {
    async fn query(&mut self, sql: &str, args: &[Value]) -> DbResult<Vec<Row>> {
        let rows = prepare(sql, args).fetch_all(self.pool).await?;
        decode_rows(rows)
    }

    async fn query_row(&mut self, sql: &str, args: &[Value]) -> DbResult<Option<Row>> {
        let row = prepare(sql, args).fetch_optional(self.pool).await?;
        row.map(|r| decode_row(&r, &column_names(&r))).transpose()
    }

    async fn exec(&mut self, sql: &str, args: &[Value]) -> DbResult<u64> {
        let result = prepare(sql, args).execute(self.pool).await?;
        Ok(result.rows_affected())
    }
}

/// An open PostgreSQL transaction.
///
/// Dropping it without committing rolls it back.
pub struct PgTx {
    inner: Transaction<'static, Postgres>,
}

impl std::fmt::Debug for PgTx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgTx").finish_non_exhaustive()
    }
}

impl Queryer for PgTx {
    async fn query(&mut self, sql: &str, args: &[Value]) -> DbResult<Vec<Row>> {
        let rows = prepare(sql, args).fetch_all(&mut *self.inner).await?;
        decode_rows(rows)
    }

    async fn query_row(&mut self, sql: &str, args: &[Value]) -> DbResult<Option<Row>> {
        let row = prepare(sql, args).fetch_optional(&mut *self.inner).await?;
        row.map(|r| decode_row(&r, &column_names(&r))).transpose()
    }

    async fn exec(&mut self, sql: &str, args: &[Value]) -> DbResult<u64> {
        let result = prepare(sql, args).execute(&mut *self.inner).await?;
        Ok(result.rows_affected())
    }
}

impl Transactional for PgTx {
    async fn commit(self) -> DbResult<()> {
        self.inner.commit().await.map_err(DbError::from)
    }

    async fn rollback(self) -> DbResult<()> {
        self.inner.rollback().await.map_err(DbError::from)
    }
}

// =============================================================================
// Connector
// =============================================================================

/// Connector over a sqlx PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgConnector {
    pool: PgPool,
}

impl PgConnector {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool for `config`.
    pub async fn connect(config: &DbConfig) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool.max_connections_or_default())
            .min_connections(config.pool.min_connections_or_default())
            .acquire_timeout(Duration::from_secs(config.pool.acquire_timeout_or_default()))
            .connect(&config.connection_string)
            .await?;

        info!(
            database = config.database.as_deref().unwrap_or("<default>"),
            max_connections = config.pool.max_connections_or_default(),
            "Connected to PostgreSQL"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl Connector for PgConnector {
    type Tx = PgTx;
    type Handle<'a> = PgHandle<'a>;

    fn handle(&self) -> PgHandle<'_> {
        PgHandle { pool: &self.pool }
    }

    async fn begin(&self) -> DbResult<PgTx> {
        let inner = self.pool.begin().await?;
        debug!("Transaction started (PostgreSQL)");
        Ok(PgTx { inner })
    }
}
