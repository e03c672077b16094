//! Error types for sqlrecord.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! `DbError` is what callers see; `TxAbort` is the signal that unwinds a transaction
//! callback back to the retry engine.

use thiserror::Error;

/// SQLSTATE class for "transaction rollback" (serialization failure, deadlock, ...).
pub const TRANSACTION_ROLLBACK_CLASS: &str = "40";

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "40001" for serialization_failure
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Schema error: {message} (object: {object})")]
    Schema { message: String, object: String },

    #[error("Timeout: {operation}")]
    Timeout { operation: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Failed to decode column '{column}': {message}")]
    Decode { column: String, message: String },

    #[error("update failed, did you mean to insert instead? record={record}")]
    UpdateFailed { record: String },

    #[error("too many transaction attempts ({attempts}), last error: {last}")]
    TooManyAttempts {
        attempts: u32,
        #[source]
        last: Box<DbError>,
    },

    #[error("Transaction aborted: {message}")]
    Aborted { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>, object: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            object: object.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a column decode error.
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an "update matched no row" error for the given `table:id` string.
    pub fn update_failed(record: impl Into<String>) -> Self {
        Self::UpdateFailed {
            record: record.into(),
        }
    }

    /// Wrap the last transient failure once the attempt ceiling is exceeded.
    pub fn too_many_attempts(attempts: u32, last: DbError) -> Self {
        Self::TooManyAttempts {
            attempts,
            last: Box::new(last),
        }
    }

    /// Create an application-initiated abort error.
    pub fn aborted(message: impl Into<String>) -> Self {
        Self::Aborted {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// SQLSTATE reported by the driver, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Database { sql_state, .. } => sql_state.as_deref(),
            _ => None,
        }
    }

    /// True when the driver classified the failure as a serialization or
    /// deadlock conflict (SQLSTATE class 40). Such transactions should be retried.
    pub fn is_transient(&self) -> bool {
        self.sql_state()
            .is_some_and(|code| code.starts_with(TRANSACTION_ROLLBACK_CLASS))
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                let suggestion = if code
                    .as_deref()
                    .is_some_and(|c| c.starts_with(TRANSACTION_ROLLBACK_CLASS))
                {
                    "Concurrent transaction conflict; retry the transaction"
                } else {
                    "Check the SQL syntax and referenced objects"
                };
                DbError::database(db_err.message(), code, suggestion)
            }
            sqlx::Error::RowNotFound => DbError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => {
                DbError::timeout("connection pool acquire exceeded acquire_timeout")
            },
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection pool is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::TypeNotFound { type_name } => DbError::schema(
                format!("Type not found: {}", type_name),
                type_name.to_string(),
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::schema(format!("Column not found: {}", col), col.to_string())
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => DbError::decode(index, source.to_string()),
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Signal that stops a transaction attempt and unwinds to the retry engine.
///
/// Every fallible operation on a transaction handle returns this as its error, so
/// `?` carries a failure from arbitrarily deep inside the callback back to the
/// engine, which rolls back and then either retries or gives up depending on
/// `retry`.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct TxAbort {
    pub error: DbError,
    pub retry: bool,
}

impl TxAbort {
    /// Abort the transaction without retrying.
    pub fn abort(error: impl Into<DbError>) -> Self {
        Self {
            error: error.into(),
            retry: false,
        }
    }

    /// Abort the transaction and ask the engine to run it again.
    pub fn retry(error: impl Into<DbError>) -> Self {
        Self {
            error: error.into(),
            retry: true,
        }
    }
}

impl From<DbError> for TxAbort {
    fn from(error: DbError) -> Self {
        let retry = error.is_transient();
        Self { error, retry }
    }
}

impl From<sqlx::Error> for TxAbort {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}
