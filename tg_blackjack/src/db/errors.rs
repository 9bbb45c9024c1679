//! Store error types.

use thiserror::Error;

use super::timeouts::TimeoutError;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Query exceeded its time budget
    #[error("Database operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// A row the operation depends on does not exist
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A stored value could not be decoded
    #[error("Corrupt {column} value: {value:?}")]
    Corrupt { column: &'static str, value: String },
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub(crate) fn corrupt(column: &'static str, value: impl ToString) -> Self {
        Self::Corrupt {
            column,
            value: value.to_string(),
        }
    }

    /// Get a client-safe error message that doesn't leak table names,
    /// identifiers or SQL details.
    pub fn client_message(&self) -> String {
        match self {
            StoreError::NotFound { entity, .. } => format!("{entity} not found"),
            _ => "Internal server error".to_string(),
        }
    }
}

impl From<TimeoutError> for StoreError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(duration) => StoreError::Timeout(duration),
            TimeoutError::Database(e) => StoreError::Database(e),
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_client_message_hides_internals() {
        let err = StoreError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.client_message(), "Internal server error");

        let err = StoreError::corrupt("gameplays.cards", "Z?");
        assert_eq!(err.client_message(), "Internal server error");
        assert!(err.to_string().contains("Z?"));

        let err = StoreError::not_found("Balance", "chat -100 player 7");
        assert_eq!(err.client_message(), "Balance not found");
    }

    #[test]
    fn test_timeout_error_conversion() {
        let err: StoreError = TimeoutError::Timeout(Duration::from_secs(5)).into();
        assert!(matches!(err, StoreError::Timeout(d) if d.as_secs() == 5));
    }
}
