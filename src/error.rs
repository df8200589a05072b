//! Centralized error types for faultline services

use thiserror::Error;

/// Error kinds shared by all faultline services
#[derive(Debug, Error)]
pub enum Error {
    /// Circuit breaker is open — the call was rejected without being attempted
    #[error("circuit breaker is open")]
    CircuitOpen,

    /// Downstream call exceeded its deadline
    #[error("downstream call timed out after {0}ms")]
    UpstreamTimeout(u64),

    /// Persistent store operation failed
    #[error("storage error: {0}")]
    Storage(String),

    /// Admission gate wait exceeded its bound
    #[error("admission wait timed out after {0}ms")]
    AdmissionTimeout(u64),

    /// Downstream service could not be reached
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_open_display() {
        assert_eq!(Error::CircuitOpen.to_string(), "circuit breaker is open");
    }

    #[test]
    fn test_timeout_display() {
        assert_eq!(
            Error::UpstreamTimeout(5000).to_string(),
            "downstream call timed out after 5000ms"
        );
    }

    #[test]
    fn test_storage_display() {
        let err = Error::Storage("no such row".to_string());
        assert_eq!(err.to_string(), "storage error: no such row");
    }

    #[test]
    fn test_admission_timeout_display() {
        assert_eq!(
            Error::AdmissionTimeout(250).to_string(),
            "admission wait timed out after 250ms"
        );
    }

    #[test]
    fn test_config_display() {
        let err = Error::Config("missing listen address".to_string());
        assert!(err.to_string().contains("missing listen address"));
    }
}
