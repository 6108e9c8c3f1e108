//! Infrastructure-local error types
//!
//! These cover construction and configuration problems inside the adapter
//! layer. Failures of remote calls themselves are always expressed through
//! the gateway taxonomy, never through this type.

use thiserror::Error;

/// Errors raised while building or configuring infrastructure components.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("http client error: {0}")]
    Http(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for InfraError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type alias for infrastructure operations
pub type InfraResult<T> = std::result::Result<T, InfraError>;
