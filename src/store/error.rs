//! Health store error types
//!
//! Defines all errors a health store collaborator can report.

use thiserror::Error;

/// Errors that can occur while reading from the health store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Health data is not available on this device
    #[error("Health store is not available")]
    Unavailable,

    /// The store is temporarily inaccessible (e.g. device locked)
    #[error("Health store is temporarily inaccessible")]
    Inaccessible,

    /// The user declined read access for the requested types
    #[error("Authorization denied for: {0}")]
    AuthorizationDenied(String),

    /// Any other error raised by the backing engine
    #[error("Backend error: {0}")]
    Backend(String),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file could not be decoded
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

impl StoreError {
    /// Whether this is the transient condition that callers absorb
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Inaccessible)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Snapshot(err.to_string())
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::AuthorizationDenied("heartRate".to_string());
        assert_eq!(err.to_string(), "Authorization denied for: heartRate");

        let err = StoreError::Inaccessible;
        assert_eq!(err.to_string(), "Health store is temporarily inaccessible");
    }

    #[test]
    fn test_transient_classification() {
        assert!(StoreError::Inaccessible.is_transient());
        assert!(!StoreError::Unavailable.is_transient());
        assert!(!StoreError::Backend("boom".into()).is_transient());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let store_err: StoreError = json_err.into();
        assert!(matches!(store_err, StoreError::Snapshot(_)));
    }
}
