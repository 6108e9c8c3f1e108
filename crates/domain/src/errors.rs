//! Error types used throughout the gateway

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for SuiteGate remote calls.
///
/// Every failure that crosses the gateway boundary is one of these variants;
/// raw transport errors are classified into the taxonomy exactly once, at the
/// wire boundary, and never leak upward.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum GatewayError {
    /// Credential material is missing, malformed, or expired. Not retryable;
    /// requires operator intervention.
    #[error("credential configuration error: {0}")]
    AuthConfiguration(String),

    /// The remote rejected the credential or session ticket.
    #[error("authentication rejected: {0}")]
    Authentication(String),

    /// The remote is rate limiting the tenant. Retryable with backoff.
    #[error("throttled by remote service: {message}")]
    Throttled {
        message: String,
        /// Server-provided hint, when present on the wire.
        retry_after_secs: Option<u64>,
    },

    /// A connectivity-level fault (timeout, reset, DNS). Retryable with a
    /// smaller attempt budget than throttling.
    #[error("transient network fault: {0}")]
    TransientNetwork(String),

    /// The credential is valid but lacks a role or scope for the operation.
    #[error("permission denied: {0}")]
    Permission(String),

    /// The request itself is malformed: unknown operation or bad parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// All retry attempts were consumed without success.
    #[error("retries exhausted for '{operation}' after {attempts} attempts (last: {last_kind})")]
    ExhaustedRetries {
        operation: String,
        attempts: u32,
        last_kind: ErrorKind,
    },

    /// The caller's deadline elapsed or the caller dropped the call.
    #[error("call cancelled: {0}")]
    Cancelled(String),
}

impl GatewayError {
    /// Stable kind tag for this error, used by audit records and retry policy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthConfiguration(_) => ErrorKind::AuthConfiguration,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::Throttled { .. } => ErrorKind::Throttled,
            Self::TransientNetwork(_) => ErrorKind::TransientNetwork,
            Self::Permission(_) => ErrorKind::Permission,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::ExhaustedRetries { .. } => ErrorKind::ExhaustedRetries,
            Self::Cancelled(_) => ErrorKind::Cancelled,
        }
    }

    /// Whether the retry loop may attempt this call again.
    ///
    /// Authentication is deliberately excluded: the executor handles it with
    /// a single re-authentication pass outside the backoff budget.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Server-provided backoff hint, when the remote supplied one.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Throttled {
                retry_after_secs: Some(secs),
                ..
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }

    /// Convenience constructor for throttling without a server hint.
    #[must_use]
    pub fn throttled(message: impl Into<String>) -> Self {
        Self::Throttled {
            message: message.into(),
            retry_after_secs: None,
        }
    }
}

/// Lightweight, copyable tag identifying an error class.
///
/// Carried in audit records and retry bookkeeping where the full error
/// payload is not needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    AuthConfiguration,
    Authentication,
    Throttled,
    TransientNetwork,
    Permission,
    InvalidRequest,
    ExhaustedRetries,
    Cancelled,
}

impl ErrorKind {
    /// Stable string form used in audit lines and structured log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthConfiguration => "auth_configuration",
            Self::Authentication => "authentication",
            Self::Throttled => "throttled",
            Self::TransientNetwork => "transient_network",
            Self::Permission => "permission",
            Self::InvalidRequest => "invalid_request",
            Self::ExhaustedRetries => "exhausted_retries",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the retry loop may attempt again on this kind.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Throttled | Self::TransientNetwork)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type alias for gateway operations
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
