//! Pipeline error types
//!
//! The taxonomy every connection operation reports. Each call yields either
//! a complete result or exactly one of these; the transient "store
//! inaccessible" condition never appears because the orchestrator absorbs
//! it.

use crate::config::ConfigError;
use crate::normalize::NormalizeError;
use crate::query::QueryError;
use crate::schema::{DataType, SchemaError};
use thiserror::Error;

/// Errors surfaced by the connection facade
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The connection was used before it was configured correctly
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Required data types were not granted
    #[error("Authorization not granted for: {0}")]
    Authorization(String),

    /// Workout identifier did not resolve
    #[error("Not found: {0}")]
    NotFound(String),

    /// No health store is present
    #[error("Health store is unavailable")]
    StoreUnavailable,

    /// Records could not be encoded for delivery
    #[error("Encoding error: {0}")]
    Encoding(#[from] SchemaError),

    /// The domain has no normalized form yet
    #[error("Unsupported data type: {0}")]
    UnsupportedType(DataType),

    #[error("Connection is closed")]
    ConnectionClosed,

    #[error("No callback URL configured")]
    CallbackUrlNotProvided,

    /// A workout-scoped fetch was issued without an identifier
    #[error("Missing identifier for {0}")]
    MissingIdentifier(DataType),

    /// A characteristic fetch named no characteristics
    #[error("Missing filter for {0}")]
    MissingFilter(DataType),

    #[error("Query error: {0}")]
    Query(QueryError),

    #[error("Normalization error: {0}")]
    Normalize(NormalizeError),
}

impl From<QueryError> for PipelineError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::NotFound(id) => PipelineError::NotFound(id),
            QueryError::StoreUnavailable => PipelineError::StoreUnavailable,
            other => PipelineError::Query(other),
        }
    }
}

impl From<ConfigError> for PipelineError {
    fn from(err: ConfigError) -> Self {
        PipelineError::Configuration(err.to_string())
    }
}

impl From<NormalizeError> for PipelineError {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::Unsupported(data_type) => PipelineError::UnsupportedType(data_type),
            other => PipelineError::Normalize(other),
        }
    }
}

/// Result type for connection operations
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn test_query_errors_are_lifted() {
        let err: PipelineError = QueryError::NotFound("abc".into()).into();
        assert!(matches!(err, PipelineError::NotFound(ref id) if id == "abc"));

        let err: PipelineError = QueryError::StoreUnavailable.into();
        assert!(matches!(err, PipelineError::StoreUnavailable));

        let err: PipelineError = QueryError::Store(StoreError::Backend("boom".into())).into();
        assert!(matches!(err, PipelineError::Query(QueryError::Store(_))));
    }

    #[test]
    fn test_unsupported_is_lifted() {
        let err: PipelineError = NormalizeError::Unsupported(DataType::Body).into();
        assert!(matches!(err, PipelineError::UnsupportedType(DataType::Body)));
        assert_eq!(err.to_string(), "Unsupported data type: body");
    }
}
