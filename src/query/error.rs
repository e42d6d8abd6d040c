//! Query error types
//!
//! Defines all error conditions the orchestrator surfaces to its caller.
//! The transient "store inaccessible" condition never appears here: the
//! orchestrator absorbs it into an empty result.

use thiserror::Error;

/// Errors that can occur during query operations
#[derive(Error, Debug)]
pub enum QueryError {
    /// No store is configured, or the store reports no health data
    #[error("Health store is unavailable")]
    StoreUnavailable,

    /// Workout identifier did not resolve to exactly one workout
    #[error("Workout not found: {0}")]
    NotFound(String),

    /// Workout identifier is not a valid UUID
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Invalid time range specified
    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    /// Any other store error
    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn test_error_display() {
        let err = QueryError::NotFound("4F9A".to_string());
        assert_eq!(err.to_string(), "Workout not found: 4F9A");

        let err: QueryError = StoreError::Backend("query failed".into()).into();
        assert_eq!(err.to_string(), "Store error: Backend error: query failed");
    }
}
