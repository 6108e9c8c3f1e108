//! Infrastructure ports implemented by adapter crates

use async_trait::async_trait;
use suitegate_domain::{
    AuditRecord, CredentialProfile, GatewayResult, HandshakeGrant, RemoteService, Session,
};

/// Transport to the remote suite services.
///
/// Implementations classify every wire-level failure into the gateway error
/// taxonomy before returning; callers never see raw transport errors. This is
/// the only place classification happens.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Perform the authentication handshake for `service` with `profile`.
    async fn authenticate(
        &self,
        service: RemoteService,
        profile: &CredentialProfile,
    ) -> GatewayResult<HandshakeGrant>;

    /// Execute one read query under an established session.
    async fn call(
        &self,
        session: &Session,
        operation: &str,
        params: &serde_json::Value,
    ) -> GatewayResult<serde_json::Value>;
}

/// Append-only audit trail.
///
/// Recording must never fail the caller: implementations swallow their own
/// errors and report them through the diagnostic log channel only.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append one record to the trail.
    async fn record(&self, record: AuditRecord);
}
