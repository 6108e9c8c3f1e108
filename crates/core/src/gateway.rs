//! Gateway facade
//!
//! Wires the credential store, session manager, and call executor together
//! from one settings struct. Every dependency is injected explicitly; the
//! crate holds no global state, so two gateways (say, production and a test
//! double) coexist in one process without touching each other.

use std::sync::Arc;
use std::time::Duration;

use suitegate_common::{CacheStatsSnapshot, Clock, RetrySchedule, ScheduleError, SystemClock};
use suitegate_domain::constants::{
    DEFAULT_BACKOFF_BASE, DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_BACKOFF_SECS,
    DEFAULT_MAX_CONCURRENT_CALLS, DEFAULT_NETWORK_ATTEMPTS, DEFAULT_PERMIT_WAIT_SECS,
    DEFAULT_THROTTLE_ATTEMPTS, SESSION_SAFETY_MARGIN_SECS,
};
use suitegate_domain::{
    CallRequest, CredentialProfile, GatewayResponse, GatewayResult, RemoteService,
};

use crate::credentials::CredentialManager;
use crate::executor::{CallExecutor, CategoryTtls, ExecutorConfig};
use crate::ports::{AuditSink, RemoteTransport};
use crate::session::SessionManager;

/// Behavioral settings for a gateway instance.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub throttle_attempts: u32,
    pub network_attempts: u32,
    pub initial_backoff: Duration,
    pub backoff_base: f64,
    pub max_backoff: Duration,
    pub session_safety_margin: Duration,
    pub max_concurrent_calls: usize,
    pub permit_wait: Duration,
    pub fallback_enabled: bool,
    pub default_timeout: Option<Duration>,
    pub ttls: CategoryTtls,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            throttle_attempts: DEFAULT_THROTTLE_ATTEMPTS,
            network_attempts: DEFAULT_NETWORK_ATTEMPTS,
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
            backoff_base: DEFAULT_BACKOFF_BASE,
            max_backoff: Duration::from_secs(DEFAULT_MAX_BACKOFF_SECS),
            session_safety_margin: Duration::from_secs(SESSION_SAFETY_MARGIN_SECS),
            max_concurrent_calls: DEFAULT_MAX_CONCURRENT_CALLS,
            permit_wait: Duration::from_secs(DEFAULT_PERMIT_WAIT_SECS),
            fallback_enabled: true,
            default_timeout: None,
            ttls: CategoryTtls::default(),
        }
    }
}

impl GatewaySettings {
    fn executor_config(&self) -> Result<ExecutorConfig, ScheduleError> {
        let schedule = RetrySchedule::builder()
            .max_attempts(self.throttle_attempts)
            .exponential_backoff(self.initial_backoff, self.backoff_base, self.max_backoff)
            .equal_jitter()
            .build()?;
        Ok(ExecutorConfig {
            schedule,
            network_attempts: self.network_attempts,
            fallback_enabled: self.fallback_enabled,
            default_timeout: self.default_timeout,
            max_concurrent_calls: self.max_concurrent_calls,
            permit_wait: self.permit_wait,
            ttls: self.ttls,
        })
    }
}

/// The single entry point console callers use.
pub struct Gateway<T, A, C = SystemClock> {
    credentials: Arc<CredentialManager<C>>,
    sessions: Arc<SessionManager<T, C>>,
    executor: CallExecutor<T, A, C>,
}

impl<T, A> Gateway<T, A>
where
    T: RemoteTransport,
    A: AuditSink,
{
    /// Gateway on the system clock.
    pub fn new(
        transport: Arc<T>,
        audit: Arc<A>,
        settings: GatewaySettings,
    ) -> Result<Self, ScheduleError> {
        Self::with_clock(transport, audit, settings, SystemClock)
    }
}

impl<T, A, C> Gateway<T, A, C>
where
    T: RemoteTransport,
    A: AuditSink,
    C: Clock + Clone,
{
    /// Gateway reading time through the given clock.
    pub fn with_clock(
        transport: Arc<T>,
        audit: Arc<A>,
        settings: GatewaySettings,
        clock: C,
    ) -> Result<Self, ScheduleError> {
        let config = settings.executor_config()?;
        let credentials = Arc::new(CredentialManager::with_clock(clock.clone()));
        let sessions = Arc::new(SessionManager::new(
            Arc::clone(&transport),
            Arc::clone(&credentials),
            settings.session_safety_margin,
            clock.clone(),
        ));
        let executor =
            CallExecutor::with_clock(transport, Arc::clone(&sessions), audit, config, clock);
        Ok(Self {
            credentials,
            sessions,
            executor,
        })
    }

    /// Execute one console read query.
    pub async fn execute(&self, request: CallRequest) -> GatewayResult<GatewayResponse> {
        self.executor.execute(request).await
    }

    /// Register the credential profile for a service.
    pub fn register_credential(
        &self,
        service: RemoteService,
        profile: CredentialProfile,
    ) -> GatewayResult<()> {
        self.credentials.register(service, profile)
    }

    /// Hot-swap the client secret for a service.
    pub fn rotate_secret(
        &self,
        service: RemoteService,
        new_secret: impl Into<String>,
    ) -> GatewayResult<()> {
        self.credentials.rotate_secret(service, new_secret)
    }

    /// Drop the session for a service; the next call handshakes anew.
    pub fn invalidate_session(&self, service: RemoteService) {
        self.sessions.invalidate(service);
    }

    /// Response-cache counters for the diagnostics pane.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.executor.cache_stats()
    }

    /// Drop every cached response.
    pub fn clear_cache(&self) {
        self.executor.clear_cache();
    }
}
