//! Error types for the context optimizer

use thiserror::Error;

/// Result type alias for context optimizer operations
pub type Result<T> = std::result::Result<T, ContextError>;

/// Main error type
///
/// Optimisation passes themselves never fail; these variants cover
/// construction (configuration, metrics, tokenizer setup) and the
/// collaborator read boundary.
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("Token estimator error: {0}")]
    Estimator(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<config::ConfigError> for ContextError {
    fn from(err: config::ConfigError) -> Self {
        ContextError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_maps_to_configuration() {
        let err: ContextError = config::ConfigError::Message("bad key".to_string()).into();
        assert!(matches!(err, ContextError::Configuration(_)));
        assert!(err.to_string().contains("bad key"));
    }

    #[test]
    fn test_io_error_display() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ContextError = io.into();
        assert_eq!(err.to_string(), "IO error: missing");
    }
}
