//! Cleanup error types

use thiserror::Error;

pub type CleanupResult<T> = std::result::Result<T, CleanupError>;

#[derive(Debug, Error)]
pub enum CleanupError {
    /// The database cannot be reached; fatal to the whole cleanup run
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    /// A statement failed; fatal only to the enclosing transaction
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
}

impl CleanupError {
    pub fn is_connection_error(&self) -> bool {
        matches!(self, CleanupError::ConnectionFailed(_))
    }
}

impl From<sqlx::Error> for CleanupError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => CleanupError::ConnectionFailed(error.to_string()),
            sqlx::Error::Configuration(_) => CleanupError::ConnectionFailed(error.to_string()),
            other => CleanupError::QueryFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_errors_are_classified() {
        assert!(CleanupError::from(sqlx::Error::PoolTimedOut).is_connection_error());
        assert!(CleanupError::from(sqlx::Error::PoolClosed).is_connection_error());
        assert!(!CleanupError::from(sqlx::Error::RowNotFound).is_connection_error());
        assert!(!CleanupError::QueryFailed("syntax".into()).is_connection_error());
    }
}
