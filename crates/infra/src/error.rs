//! Repository error model.
//!
//! SQLx errors are mapped to `RepositoryError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | RepositoryError |
//! |------------|----------------------|-----------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `Conflict` |
//! | Database (check constraint violation) | `23514` | `Constraint` |
//! | Database (other) | Any other | `Database` |
//! | RowNotFound | N/A | `NotFound` |
//! | ColumnDecode / Decode | N/A | `Serialization` |
//! | Other | N/A | `Database` |

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl RepositoryError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub(crate) fn lock_poisoned() -> Self {
        Self::Database("in-memory store lock poisoned".to_string())
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Map SQLx errors to `RepositoryError`, tagging the message with `operation`.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("{operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23503") => RepositoryError::Conflict(msg),
                Some("23514") => RepositoryError::Constraint(msg),
                _ => RepositoryError::Database(msg),
            }
        }
        sqlx::Error::RowNotFound => RepositoryError::NotFound(operation.to_string()),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            RepositoryError::Serialization(format!("{operation}: {err}"))
        }
        sqlx::Error::PoolClosed => RepositoryError::Database(format!("connection pool closed in {operation}")),
        _ => RepositoryError::Database(format!("sqlx error in {operation}: {err}")),
    }
}
