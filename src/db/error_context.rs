//! Structured context pulled out of PostgreSQL errors.
//! Used to classify statement failures during a merge and to report them readably.

use sqlx::postgres::PgDatabaseError;

/// Rich error context extracted from PostgreSQL errors
#[derive(Debug, Clone, Default)]
pub struct SqlErrorContext {
    /// The primary error message
    pub message: String,
    /// Additional detail from PostgreSQL
    pub detail: Option<String>,
    /// SQLSTATE (e.g. "23503" for foreign_key_violation)
    pub code: Option<String>,
    /// Table the server blamed, when it names one
    pub table: Option<String>,
    /// Constraint the server blamed, when it names one
    pub constraint: Option<String>,
}

impl SqlErrorContext {
    /// Extract error context from a sqlx error
    ///
    /// Uses structured data from PgDatabaseError - no string parsing needed.
    pub fn from_sqlx_error(error: &sqlx::Error) -> Self {
        if let Some(db_error) = error.as_database_error()
            && let Some(pg_error) = db_error.try_downcast_ref::<PgDatabaseError>()
        {
            return Self {
                message: pg_error.message().to_string(),
                detail: pg_error.detail().map(|s| s.to_string()),
                code: Some(pg_error.code().to_string()),
                table: pg_error.table().map(|s| s.to_string()),
                constraint: pg_error.constraint().map(|s| s.to_string()),
            };
        }

        // Fallback for non-PostgreSQL errors
        Self {
            message: error.to_string(),
            ..Default::default()
        }
    }

    /// SQLSTATE class 23: integrity constraint violation
    pub fn is_integrity_violation(&self) -> bool {
        self.code.as_deref().is_some_and(|code| code.starts_with("23"))
    }

    /// One-line message with the server's detail appended
    pub fn summary(&self) -> String {
        let mut msg = self.message.clone();
        if let Some(detail) = &self.detail {
            msg.push_str(&format!(" ({})", detail));
        }
        if let Some(code) = &self.code {
            msg.push_str(&format!(" [SQLSTATE {}]", code));
        }
        msg
    }
}
