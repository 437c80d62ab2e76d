//! Error taxonomy for merge jobs
//!
//! Library entry points return [`MergeResult`]. The CLI and configuration layer wrap these in
//! `anyhow` with context, the same way the rest of the binary reports failures.

use serde::Serialize;
use thiserror::Error;

use crate::db::error_context::SqlErrorContext;

pub type MergeResult<T> = std::result::Result<T, MergeError>;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("invalid merge request: {0}")]
    InvalidRequest(String),

    #[error("schema \"{schema}\" does not exist")]
    SchemaNotFound { schema: String },

    #[error("table \"{schema}\".\"{table}\" does not exist")]
    TableNotFound { schema: String, table: String },

    #[error("{}", describe_cycle(tables, cycles))]
    CircularDependency {
        /// Every table the sorter could not place, sorted by name
        tables: Vec<String>,
        /// Strongly connected components among those tables
        cycles: Vec<Vec<String>>,
    },

    #[error("table \"{table}\" has no columns in common with the target definition")]
    ColumnMismatch { table: String },

    #[error("constraint \"{constraint}\" on table \"{table}\" rejected the merged data: {message}")]
    ConstraintViolation {
        table: String,
        constraint: String,
        message: String,
    },

    #[error("transaction failed: {0}")]
    Transaction(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("another merge into schema \"{target}\" is already running")]
    TargetLocked { target: String },

    #[error("merge cancelled, all changes rolled back")]
    Cancelled,

    #[error("merge exceeded the {seconds}s time limit, all changes rolled back")]
    Timeout { seconds: u64 },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Stable, machine-readable label for a [`MergeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    SchemaNotFound,
    TableNotFound,
    CircularDependency,
    ColumnMismatch,
    ConstraintViolation,
    Transaction,
    Connection,
    TargetLocked,
    Cancelled,
    Timeout,
    Database,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::SchemaNotFound => "schema_not_found",
            ErrorKind::TableNotFound => "table_not_found",
            ErrorKind::CircularDependency => "circular_dependency",
            ErrorKind::ColumnMismatch => "column_mismatch",
            ErrorKind::ConstraintViolation => "constraint_violation",
            ErrorKind::Transaction => "transaction",
            ErrorKind::Connection => "connection",
            ErrorKind::TargetLocked => "target_locked",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Database => "database",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl MergeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MergeError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            MergeError::SchemaNotFound { .. } => ErrorKind::SchemaNotFound,
            MergeError::TableNotFound { .. } => ErrorKind::TableNotFound,
            MergeError::CircularDependency { .. } => ErrorKind::CircularDependency,
            MergeError::ColumnMismatch { .. } => ErrorKind::ColumnMismatch,
            MergeError::ConstraintViolation { .. } => ErrorKind::ConstraintViolation,
            MergeError::Transaction(_) => ErrorKind::Transaction,
            MergeError::Connection(_) => ErrorKind::Connection,
            MergeError::TargetLocked { .. } => ErrorKind::TargetLocked,
            MergeError::Cancelled => ErrorKind::Cancelled,
            MergeError::Timeout { .. } => ErrorKind::Timeout,
            MergeError::Database(_) => ErrorKind::Database,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        MergeError::InvalidRequest(message.into())
    }

    pub fn schema_not_found(schema: &str) -> Self {
        MergeError::SchemaNotFound {
            schema: schema.to_string(),
        }
    }

    /// Classify a statement failure against `table`.
    ///
    /// Integrity violations (SQLSTATE class 23) become [`MergeError::ConstraintViolation`];
    /// anything else stays a plain database error.
    pub fn from_statement(table: &str, fallback_constraint: &str, error: sqlx::Error) -> Self {
        let context = SqlErrorContext::from_sqlx_error(&error);
        if context.is_integrity_violation() {
            MergeError::ConstraintViolation {
                table: table.to_string(),
                constraint: context
                    .constraint
                    .clone()
                    .unwrap_or_else(|| fallback_constraint.to_string()),
                message: context.summary(),
            }
        } else {
            MergeError::Database(error)
        }
    }

    /// Message prefixed with the error kind, as reported in a failed outcome
    pub fn labelled(&self) -> String {
        format!("[{}] {}", self.kind(), self)
    }
}

fn describe_cycle(tables: &[String], cycles: &[Vec<String>]) -> String {
    let mut msg = format!(
        "circular foreign-key dependency; tables left unordered: {}",
        tables.join(", ")
    );
    if !cycles.is_empty() {
        let loops = cycles
            .iter()
            .map(|cycle| format!("[{}]", cycle.join(" <-> ")))
            .collect::<Vec<_>>()
            .join(", ");
        msg.push_str(&format!(" (cycles: {})", loops));
    }
    msg
}
