//! Common data types used throughout the gateway

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{
    DEFAULT_REPORT_TTL_SECS, DEFAULT_STATIC_TTL_SECS, DEFAULT_USER_TTL_SECS,
};
use crate::errors::ErrorKind;

/// Remote service a call is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteService {
    /// Directory of users, groups, and license assignments.
    Directory,
    /// Mailbox and messaging administration.
    Messaging,
    /// Usage and activity reporting.
    Reporting,
    /// Tenant service-health feed.
    ServiceHealth,
}

impl RemoteService {
    /// Stable string form used in routes, audit lines, and log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::Messaging => "messaging",
            Self::Reporting => "reporting",
            Self::ServiceHealth => "service_health",
        }
    }
}

impl fmt::Display for RemoteService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secret material backing a credential profile.
///
/// `Debug` redacts secret bytes so profiles can appear in logs safely.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CredentialMaterial {
    /// App-only certificate credential with a hard expiry.
    Certificate {
        thumbprint: String,
        not_after: DateTime<Utc>,
    },
    /// Client secret, hot-swappable at runtime.
    ClientSecret { secret: String },
}

impl fmt::Debug for CredentialMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Certificate {
                thumbprint,
                not_after,
            } => f
                .debug_struct("Certificate")
                .field("thumbprint", thumbprint)
                .field("not_after", not_after)
                .finish(),
            Self::ClientSecret { .. } => f
                .debug_struct("ClientSecret")
                .field("secret", &"<redacted>")
                .finish(),
        }
    }
}

/// Registered application credential for one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialProfile {
    pub profile_id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub material: CredentialMaterial,
}

impl CredentialProfile {
    /// Identity key: at most one active profile may exist per tenant/client
    /// pair.
    #[must_use]
    pub fn identity(&self) -> (String, String) {
        (self.tenant_id.clone(), self.client_id.clone())
    }
}

/// Grant returned by a successful authentication handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeGrant {
    /// Opaque ticket presented on subsequent calls.
    pub ticket: String,
    /// Remote-declared ticket lifetime, before the safety margin is applied.
    pub lifetime_secs: u64,
}

/// Lifecycle state of a service session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Expired,
    Failed,
}

/// Live session with one remote service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub service: RemoteService,
    pub profile_id: String,
    pub state: SessionState,
    pub ticket: String,
    pub established_at: DateTime<Utc>,
    /// Remote lifetime minus the configured safety margin.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session is still usable at `now`.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.state == SessionState::Connected && now < self.expires_at
    }
}

/// Cache category for an operation's responses.
///
/// The category is always an explicit input; nothing infers it from
/// operation names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheCategory {
    /// Rarely-changing tenant data (license SKUs, service plans).
    Static,
    /// Per-user directory data.
    User,
    /// Usage and activity reports.
    Report,
}

impl CacheCategory {
    /// Default TTL in seconds when the config does not override it.
    #[must_use]
    pub const fn default_ttl_secs(self) -> u64 {
        match self {
            Self::Static => DEFAULT_STATIC_TTL_SECS,
            Self::User => DEFAULT_USER_TTL_SECS,
            Self::Report => DEFAULT_REPORT_TTL_SECS,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::User => "user",
            Self::Report => "report",
        }
    }
}

impl fmt::Display for CacheCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A console read query submitted to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRequest {
    /// Registered operation name, e.g. `listUsers`.
    pub operation: String,
    /// Operation parameters; must be a JSON object (possibly empty).
    #[serde(default = "empty_params")]
    pub params: serde_json::Value,
    /// Caller deadline for the whole call, retries included.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

fn empty_params() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl CallRequest {
    /// Request with empty parameters and no deadline.
    #[must_use]
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            params: empty_params(),
            timeout_ms: None,
        }
    }

    /// Request with the given parameter object.
    #[must_use]
    pub fn with_params(operation: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            operation: operation.into(),
            params,
            timeout_ms: None,
        }
    }
}

/// Tagged gateway response: live remote data or flagged placeholder data.
///
/// Fallback payloads are never returned untagged; the consumer can always
/// tell degraded data apart from live data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum GatewayResponse {
    /// Data returned by the remote service.
    Live { data: serde_json::Value },
    /// Deterministic placeholder data served after a tolerated failure.
    Fallback {
        data: serde_json::Value,
        /// Failure class that triggered degradation.
        reason: ErrorKind,
    },
}

impl GatewayResponse {
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    /// The payload, regardless of source.
    #[must_use]
    pub const fn data(&self) -> &serde_json::Value {
        match self {
            Self::Live { data } | Self::Fallback { data, .. } => data,
        }
    }
}

/// Outcome tag for one audited call attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// The attempt returned live data.
    Success,
    /// The attempt failed and another attempt follows.
    Retry,
    /// The attempt failed terminally.
    Failure,
    /// Placeholder data was served after a terminal failure.
    Fallback,
}

/// One line of the append-only audit trail. Each call attempt emits exactly
/// one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub service: RemoteService,
    pub profile_id: String,
    /// 1-based attempt number within the call.
    pub attempt: u32,
    pub outcome: AuditOutcome,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

#[cfg(test)]
mod tests {
    //! Unit tests for types.

    use super::*;

    /// Validates `CredentialMaterial` debug redaction.
    ///
    /// Assertions:
    /// - Confirms client secrets never appear in `Debug` output.
    /// - Ensures certificate thumbprints remain visible.
    #[test]
    fn secret_material_is_redacted_in_debug() {
        let secret = CredentialMaterial::ClientSecret {
            secret: "hunter2".into(),
        };
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));

        let cert = CredentialMaterial::Certificate {
            thumbprint: "AB12".into(),
            not_after: Utc::now(),
        };
        assert!(format!("{cert:?}").contains("AB12"));
    }

    /// Validates `Session::is_live` against state and expiry.
    ///
    /// Assertions:
    /// - Confirms a connected, unexpired session is live.
    /// - Ensures expiry and non-connected states report not live.
    #[test]
    fn session_liveness() {
        let now = Utc::now();
        let mut session = Session {
            id: Uuid::new_v4(),
            service: RemoteService::Directory,
            profile_id: "p1".into(),
            state: SessionState::Connected,
            ticket: "t".into(),
            established_at: now,
            expires_at: now + chrono::Duration::seconds(60),
        };
        assert!(session.is_live(now));
        assert!(!session.is_live(now + chrono::Duration::seconds(61)));
        session.state = SessionState::Expired;
        assert!(!session.is_live(now));
    }

    /// Validates the tagged response distinguishes fallback data.
    ///
    /// Assertions:
    /// - Confirms the `source` tag appears in serialized form.
    /// - Ensures `is_fallback` reflects the variant.
    #[test]
    fn response_tagging() {
        let live = GatewayResponse::Live {
            data: serde_json::json!({"users": []}),
        };
        assert!(!live.is_fallback());

        let degraded = GatewayResponse::Fallback {
            data: serde_json::json!({"users": []}),
            reason: ErrorKind::ExhaustedRetries,
        };
        assert!(degraded.is_fallback());
        let json = serde_json::to_string(&degraded).unwrap();
        assert!(json.contains("\"source\":\"fallback\""));
        assert!(json.contains("\"reason\":\"exhausted_retries\""));
    }

    /// Validates category default TTL ordering.
    ///
    /// Assertions:
    /// - Confirms static data outlives user data, which outlives reports.
    #[test]
    fn category_ttls_are_ordered() {
        assert!(
            CacheCategory::Static.default_ttl_secs() > CacheCategory::User.default_ttl_secs()
        );
        assert!(CacheCategory::User.default_ttl_secs() > CacheCategory::Report.default_ttl_secs());
    }
}
