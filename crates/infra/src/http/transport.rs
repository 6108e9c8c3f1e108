//! HTTP implementation of the remote transport port
//!
//! Every wire-level failure is classified into the gateway taxonomy right
//! here, from the HTTP status code or the reqwest error category. Nothing
//! above this module ever inspects a status code or an error message; no
//! retry logic lives here either, the executor owns the loop.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use suitegate_core::RemoteTransport;
use suitegate_domain::{
    CredentialMaterial, CredentialProfile, GatewayError, GatewayResult, HandshakeGrant,
    RemoteService, Session,
};
use tracing::debug;

use crate::errors::{InfraError, InfraResult};

/// Transport speaking JSON over HTTP to the suite's management endpoints.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: ReqwestClient,
    base_url: String,
}

impl HttpTransport {
    /// Start building a new transport.
    #[must_use]
    pub fn builder(base_url: impl Into<String>) -> HttpTransportBuilder {
        HttpTransportBuilder::new(base_url)
    }

    fn auth_url(&self, service: RemoteService) -> String {
        format!("{}/{}/auth", self.base_url, service.as_str())
    }

    fn query_url(&self, service: RemoteService) -> String {
        format!("{}/{}/query", self.base_url, service.as_str())
    }
}

/// Builder for [`HttpTransport`].
#[derive(Debug)]
pub struct HttpTransportBuilder {
    base_url: String,
    timeout: Duration,
    user_agent: String,
}

impl HttpTransportBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            user_agent: concat!("suitegate/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Per-request timeout at the socket level. The caller's call deadline
    /// is enforced separately by the executor.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    pub fn build(self) -> InfraResult<HttpTransport> {
        let base_url = self.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(InfraError::Config("base_url must not be empty".into()));
        }
        let client = ReqwestClient::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent)
            .no_proxy()
            .build()
            .map_err(|err| InfraError::Http(err.to_string()))?;
        Ok(HttpTransport { client, base_url })
    }
}

#[derive(Debug, Deserialize)]
struct WireGrant {
    ticket: String,
    lifetime_secs: u64,
}

#[async_trait]
impl RemoteTransport for HttpTransport {
    async fn authenticate(
        &self,
        service: RemoteService,
        profile: &CredentialProfile,
    ) -> GatewayResult<HandshakeGrant> {
        let body = match &profile.material {
            CredentialMaterial::ClientSecret { secret } => json!({
                "tenant_id": profile.tenant_id,
                "client_id": profile.client_id,
                "grant_type": "client_secret",
                "client_secret": secret,
            }),
            CredentialMaterial::Certificate { thumbprint, .. } => json!({
                "tenant_id": profile.tenant_id,
                "client_id": profile.client_id,
                "grant_type": "certificate",
                "thumbprint": thumbprint,
            }),
        };

        let url = self.auth_url(service);
        debug!(%service, %url, "sending handshake");
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let response = ensure_success(response).await?;
        let grant: WireGrant = response.json().await.map_err(|err| {
            GatewayError::TransientNetwork(format!("malformed handshake response: {err}"))
        })?;
        Ok(HandshakeGrant {
            ticket: grant.ticket,
            lifetime_secs: grant.lifetime_secs,
        })
    }

    async fn call(
        &self,
        session: &Session,
        operation: &str,
        params: &serde_json::Value,
    ) -> GatewayResult<serde_json::Value> {
        let url = self.query_url(session.service);
        debug!(service = %session.service, %operation, "sending query");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&session.ticket)
            .json(&json!({ "operation": operation, "params": params }))
            .send()
            .await
            .map_err(classify_transport_error)?;

        let response = ensure_success(response).await?;
        response.json().await.map_err(|err| {
            GatewayError::TransientNetwork(format!("malformed query response: {err}"))
        })
    }
}

/// Map a non-success status to the taxonomy; pass successes through.
async fn ensure_success(response: Response) -> GatewayResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after_secs = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());
    let detail = response.text().await.unwrap_or_default();
    let detail = if detail.is_empty() {
        status.to_string()
    } else {
        detail
    };

    Err(classify_status(status, detail, retry_after_secs))
}

fn classify_status(
    status: StatusCode,
    detail: String,
    retry_after_secs: Option<u64>,
) -> GatewayError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => GatewayError::Throttled {
            message: detail,
            retry_after_secs,
        },
        StatusCode::UNAUTHORIZED => GatewayError::Authentication(detail),
        StatusCode::FORBIDDEN => GatewayError::Permission(detail),
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
            GatewayError::InvalidRequest(detail)
        }
        status if status.is_server_error() => {
            GatewayError::TransientNetwork(format!("{status}: {detail}"))
        }
        status => GatewayError::TransientNetwork(format!("unexpected status {status}: {detail}")),
    }
}

/// Classify socket-level reqwest failures.
fn classify_transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        return GatewayError::TransientNetwork(format!("request timed out: {err}"));
    }
    if err.is_connect() {
        return GatewayError::TransientNetwork(format!("connection failed: {err}"));
    }
    GatewayError::TransientNetwork(err.to_string())
}
