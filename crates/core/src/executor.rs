//! Call execution with retries, auditing, and fallback
//!
//! One executor instance serves the whole console. Each call flows through
//! validation, the response cache, the per-service concurrency limiter, and
//! the session manager before reaching the transport; every wire attempt
//! leaves one audit record behind.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use suitegate_common::{
    BackoffStrategy, CacheConfig, CacheStatsSnapshot, Clock, ConcurrencyLimiter, LimiterError,
    RetryDecision, RetryPolicy, RetrySchedule, SingleFlightCache, SystemClock,
};
use suitegate_domain::constants::{
    DEFAULT_MAX_CONCURRENT_CALLS, DEFAULT_NETWORK_ATTEMPTS, DEFAULT_PERMIT_WAIT_SECS,
    DEFAULT_THROTTLE_ATTEMPTS,
};
use suitegate_domain::{
    AuditOutcome, AuditRecord, CacheCategory, CallRequest, ErrorKind, GatewayError, GatewayResult,
    GatewayResponse, RemoteService,
};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::fallback::FallbackDataProvider;
use crate::operations::{self, OperationSpec};
use crate::ports::{AuditSink, RemoteTransport};
use crate::session::SessionManager;

/// Cache TTLs per operation category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryTtls {
    pub static_ttl: Duration,
    pub user_ttl: Duration,
    pub report_ttl: Duration,
}

impl Default for CategoryTtls {
    fn default() -> Self {
        Self {
            static_ttl: Duration::from_secs(CacheCategory::Static.default_ttl_secs()),
            user_ttl: Duration::from_secs(CacheCategory::User.default_ttl_secs()),
            report_ttl: Duration::from_secs(CacheCategory::Report.default_ttl_secs()),
        }
    }
}

impl CategoryTtls {
    /// TTL for one category.
    #[must_use]
    pub const fn ttl_for(&self, category: CacheCategory) -> Duration {
        match category {
            CacheCategory::Static => self.static_ttl,
            CacheCategory::User => self.user_ttl,
            CacheCategory::Report => self.report_ttl,
        }
    }
}

/// Tuning knobs for the executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Backoff schedule; its `max_attempts` is the throttling budget.
    pub schedule: RetrySchedule,
    /// Smaller attempt budget for transient network faults.
    pub network_attempts: u32,
    /// Serve tagged placeholder data on tolerated terminal failures.
    pub fallback_enabled: bool,
    /// Deadline applied when the request carries none.
    pub default_timeout: Option<Duration>,
    /// Concurrent in-flight calls allowed per service.
    pub max_concurrent_calls: usize,
    /// How long a caller queues for a concurrency permit.
    pub permit_wait: Duration,
    pub ttls: CategoryTtls,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            schedule: RetrySchedule::builder()
                .max_attempts(DEFAULT_THROTTLE_ATTEMPTS)
                .build()
                .unwrap_or_default(),
            network_attempts: DEFAULT_NETWORK_ATTEMPTS,
            fallback_enabled: true,
            default_timeout: None,
            max_concurrent_calls: DEFAULT_MAX_CONCURRENT_CALLS,
            permit_wait: Duration::from_secs(DEFAULT_PERMIT_WAIT_SECS),
            ttls: CategoryTtls::default(),
        }
    }
}

/// Retry decisions keyed on the error taxonomy.
///
/// Throttling gets the full budget and honors server `Retry-After` hints
/// (clamped to the backoff cap); network faults get a smaller budget;
/// everything else stops immediately. Authentication never retries here: the
/// executor's one-time reauthentication pass handles it.
struct TaxonomyRetryPolicy {
    throttle_attempts: u32,
    network_attempts: u32,
    max_delay: Duration,
}

impl RetryPolicy<GatewayError> for TaxonomyRetryPolicy {
    fn should_retry(&self, error: &GatewayError, attempt: u32) -> RetryDecision {
        match error.kind() {
            ErrorKind::Throttled if attempt < self.throttle_attempts => error
                .retry_after()
                .map_or(RetryDecision::Retry, |hint| {
                    RetryDecision::RetryAfter(hint.min(self.max_delay))
                }),
            ErrorKind::TransientNetwork if attempt < self.network_attempts => {
                RetryDecision::Retry
            }
            _ => RetryDecision::Stop,
        }
    }
}

/// Executes console read queries against the remote suite.
pub struct CallExecutor<T, A, C = SystemClock> {
    transport: Arc<T>,
    sessions: Arc<SessionManager<T, C>>,
    audit: Arc<A>,
    cache: SingleFlightCache<String, serde_json::Value, GatewayError, C>,
    limiters: DashMap<RemoteService, ConcurrencyLimiter>,
    fallback: FallbackDataProvider,
    policy: TaxonomyRetryPolicy,
    config: ExecutorConfig,
    clock: C,
}

impl<T, A> CallExecutor<T, A>
where
    T: RemoteTransport,
    A: AuditSink,
{
    /// Executor on the system clock.
    #[must_use]
    pub fn new(
        transport: Arc<T>,
        sessions: Arc<SessionManager<T>>,
        audit: Arc<A>,
        config: ExecutorConfig,
    ) -> Self {
        Self::with_clock(transport, sessions, audit, config, SystemClock)
    }
}

impl<T, A, C> CallExecutor<T, A, C>
where
    T: RemoteTransport,
    A: AuditSink,
    C: Clock + Clone,
{
    /// Executor reading time through the given clock.
    #[must_use]
    pub fn with_clock(
        transport: Arc<T>,
        sessions: Arc<SessionManager<T, C>>,
        audit: Arc<A>,
        config: ExecutorConfig,
        clock: C,
    ) -> Self {
        let max_delay = match &config.schedule.backoff {
            BackoffStrategy::Fixed(delay) => *delay,
            BackoffStrategy::Exponential { max_delay, .. } => *max_delay,
        };
        let policy = TaxonomyRetryPolicy {
            throttle_attempts: config.schedule.max_attempts,
            network_attempts: config.network_attempts,
            max_delay,
        };
        Self {
            transport,
            sessions,
            audit,
            cache: SingleFlightCache::with_clock(CacheConfig::default(), clock.clone()),
            limiters: DashMap::new(),
            fallback: FallbackDataProvider::new(),
            policy,
            config,
            clock,
        }
    }

    /// Execute one read query end to end.
    ///
    /// Validation failures and unknown operations return `InvalidRequest`
    /// without any session or network activity. The caller's deadline covers
    /// the whole call, backoff sleeps included; when it elapses the caller
    /// gets `Cancelled` while any coalesced computation continues for the
    /// remaining waiters.
    pub async fn execute(&self, request: CallRequest) -> GatewayResult<GatewayResponse> {
        let spec = operations::resolve(&request.operation)?;
        operations::validate_params(spec, &request.params)?;

        let deadline = request
            .timeout_ms
            .map(Duration::from_millis)
            .or(self.config.default_timeout);

        let inner = self.execute_inner(spec, &request);
        let result = match deadline {
            Some(limit) => match tokio::time::timeout(limit, inner).await {
                Ok(result) => result,
                Err(_) => {
                    // The attempt in flight was dropped before it could
                    // report, so the trail entry for the invocation is
                    // written here. Attempt 0 marks it as synthetic.
                    self.record(
                        spec,
                        "n/a",
                        0,
                        AuditOutcome::Failure,
                        limit,
                        Some(ErrorKind::Cancelled),
                    )
                    .await;
                    Err(GatewayError::Cancelled(format!(
                        "deadline of {limit:?} elapsed for '{}'",
                        request.operation
                    )))
                }
            },
            None => inner.await,
        };

        match result {
            Ok(data) => Ok(GatewayResponse::Live { data }),
            Err(err) => self.degrade(spec, err).await,
        }
    }

    /// Snapshot of response-cache counters for the diagnostics pane.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.cache.stats()
    }

    /// Drop every cached response.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    async fn execute_inner(
        &self,
        spec: &'static OperationSpec,
        request: &CallRequest,
    ) -> GatewayResult<serde_json::Value> {
        match spec.category {
            Some(category) => {
                let key = operations::cache_key(spec.name, &request.params);
                let ttl = self.config.ttls.ttl_for(category);
                self.cache
                    .get_or_compute(key, ttl, || self.perform_call(spec, request))
                    .await
            }
            None => self.perform_call(spec, request).await,
        }
    }

    /// The retry loop. Emits one audit record per wire attempt.
    async fn perform_call(
        &self,
        spec: &'static OperationSpec,
        request: &CallRequest,
    ) -> GatewayResult<serde_json::Value> {
        let limiter = self
            .limiters
            .entry(spec.service)
            .or_insert_with(|| {
                ConcurrencyLimiter::new(self.config.max_concurrent_calls, self.config.permit_wait)
            })
            .clone();
        let _permit = limiter.acquire().await.map_err(|err| match err {
            LimiterError::Saturated { waited } => GatewayError::Throttled {
                message: format!(
                    "local concurrency limit for service '{}' after {waited:?}",
                    spec.service
                ),
                retry_after_secs: None,
            },
            LimiterError::Closed => GatewayError::Cancelled("limiter closed".to_string()),
        })?;

        // Wire attempts are numbered for the audit trail; the reauth pass is
        // excluded from the budget counter, not from the numbering.
        let mut wire_attempt: u32 = 0;
        let mut budget_used: u32 = 0;
        let mut reauth_used = false;

        loop {
            wire_attempt += 1;
            let started = self.clock.now();
            let (outcome, profile_id) = match self.sessions.acquire(spec.service).await {
                Ok(session) => {
                    let profile_id = session.profile_id.clone();
                    let result = self
                        .transport
                        .call(&session, spec.name, &request.params)
                        .await;
                    (result, profile_id)
                }
                Err(err) => (Err(err), "unregistered".to_string()),
            };
            let latency = self.clock.now().saturating_duration_since(started);

            let err = match outcome {
                Ok(data) => {
                    self.record(spec, &profile_id, wire_attempt, AuditOutcome::Success, latency, None)
                        .await;
                    return Ok(data);
                }
                Err(err) => err,
            };

            if err.kind() == ErrorKind::Authentication && !reauth_used {
                reauth_used = true;
                self.sessions.invalidate(spec.service);
                debug!(
                    operation = spec.name,
                    service = %spec.service,
                    "session rejected mid-call, re-authenticating once"
                );
                self.record(
                    spec,
                    &profile_id,
                    wire_attempt,
                    AuditOutcome::Retry,
                    latency,
                    Some(ErrorKind::Authentication),
                )
                .await;
                continue;
            }

            budget_used += 1;
            match self.policy.should_retry(&err, budget_used) {
                RetryDecision::Retry => {
                    let delay = self.config.schedule.delay_for(budget_used - 1);
                    warn!(
                        operation = spec.name,
                        attempt = wire_attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "attempt failed, backing off"
                    );
                    self.record(
                        spec,
                        &profile_id,
                        wire_attempt,
                        AuditOutcome::Retry,
                        latency,
                        Some(err.kind()),
                    )
                    .await;
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::RetryAfter(delay) => {
                    warn!(
                        operation = spec.name,
                        attempt = wire_attempt,
                        delay_ms = delay.as_millis() as u64,
                        "remote dictated backoff"
                    );
                    self.record(
                        spec,
                        &profile_id,
                        wire_attempt,
                        AuditOutcome::Retry,
                        latency,
                        Some(err.kind()),
                    )
                    .await;
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::Stop => {
                    let terminal = if err.is_retryable() {
                        GatewayError::ExhaustedRetries {
                            operation: spec.name.to_string(),
                            attempts: wire_attempt,
                            last_kind: err.kind(),
                        }
                    } else {
                        err
                    };
                    self.record(
                        spec,
                        &profile_id,
                        wire_attempt,
                        AuditOutcome::Failure,
                        latency,
                        Some(terminal.kind()),
                    )
                    .await;
                    return Err(terminal);
                }
            }
        }
    }

    /// Serve tagged placeholder data for tolerated terminal failures.
    async fn degrade(
        &self,
        spec: &'static OperationSpec,
        err: GatewayError,
    ) -> GatewayResult<GatewayResponse> {
        let kind = err.kind();
        let tolerated =
            matches!(kind, ErrorKind::Authentication | ErrorKind::ExhaustedRetries);
        if self.config.fallback_enabled && tolerated {
            if let Some(data) = self.fallback.placeholder(spec.name) {
                warn!(operation = spec.name, reason = %kind, "serving placeholder data");
                // Synthetic trail entry: attempt 0 marks a record that did
                // not correspond to a wire attempt.
                self.record(spec, "n/a", 0, AuditOutcome::Fallback, Duration::ZERO, Some(kind))
                    .await;
                return Ok(GatewayResponse::Fallback { data, reason: kind });
            }
        }
        Err(err)
    }

    async fn record(
        &self,
        spec: &'static OperationSpec,
        profile_id: &str,
        attempt: u32,
        outcome: AuditOutcome,
        latency: Duration,
        error_kind: Option<ErrorKind>,
    ) {
        let record = AuditRecord {
            id: Uuid::new_v4(),
            timestamp: DateTime::<Utc>::from(self.clock.system_time()),
            operation: spec.name.to_string(),
            service: spec.service,
            profile_id: profile_id.to_string(),
            attempt,
            outcome,
            latency_ms: u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
            error_kind,
        };
        self.audit.record(record).await;
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for executor.

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use suitegate_common::MockClock;
    use suitegate_domain::{
        CredentialMaterial, CredentialProfile, HandshakeGrant, Session,
    };

    use super::*;
    use crate::credentials::CredentialManager;

    struct MockTransport {
        script: Mutex<VecDeque<GatewayResult<serde_json::Value>>>,
        calls: AtomicU32,
        handshakes: AtomicU32,
        call_delay: Duration,
        call_instants: Mutex<Vec<tokio::time::Instant>>,
    }

    impl MockTransport {
        fn scripted(script: Vec<GatewayResult<serde_json::Value>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
                handshakes: AtomicU32::new(0),
                call_delay: Duration::ZERO,
                call_instants: Mutex::new(Vec::new()),
            }
        }

        fn with_call_delay(mut self, delay: Duration) -> Self {
            self.call_delay = delay;
            self
        }
    }

    #[async_trait]
    impl RemoteTransport for MockTransport {
        async fn authenticate(
            &self,
            _service: RemoteService,
            _profile: &CredentialProfile,
        ) -> GatewayResult<HandshakeGrant> {
            self.handshakes.fetch_add(1, Ordering::SeqCst);
            Ok(HandshakeGrant {
                ticket: "ticket".into(),
                lifetime_secs: 3600,
            })
        }

        async fn call(
            &self,
            _session: &Session,
            _operation: &str,
            _params: &serde_json::Value,
        ) -> GatewayResult<serde_json::Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.call_instants.lock().push(tokio::time::Instant::now());
            if !self.call_delay.is_zero() {
                tokio::time::sleep(self.call_delay).await;
            }
            self.script
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({ "ok": true })))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        records: Mutex<Vec<AuditRecord>>,
    }

    impl RecordingSink {
        fn outcomes(&self) -> Vec<AuditOutcome> {
            self.records.lock().iter().map(|r| r.outcome).collect()
        }
    }

    #[async_trait]
    impl AuditSink for RecordingSink {
        async fn record(&self, record: AuditRecord) {
            self.records.lock().push(record);
        }
    }

    fn fast_config() -> ExecutorConfig {
        ExecutorConfig {
            schedule: RetrySchedule::builder()
                .max_attempts(5)
                .fixed_backoff(Duration::from_millis(1))
                .no_jitter()
                .build()
                .unwrap(),
            network_attempts: 3,
            fallback_enabled: false,
            default_timeout: None,
            max_concurrent_calls: 4,
            permit_wait: Duration::from_millis(100),
            ttls: CategoryTtls::default(),
        }
    }

    struct Harness {
        executor: CallExecutor<MockTransport, RecordingSink, MockClock>,
        transport: Arc<MockTransport>,
        sink: Arc<RecordingSink>,
    }

    fn harness(transport: MockTransport, config: ExecutorConfig) -> Harness {
        let clock = MockClock::new();
        let transport = Arc::new(transport);
        let sink = Arc::new(RecordingSink::default());
        let credentials = Arc::new(CredentialManager::with_clock(clock.clone()));
        for (idx, service) in [
            RemoteService::Directory,
            RemoteService::Messaging,
            RemoteService::Reporting,
            RemoteService::ServiceHealth,
        ]
        .into_iter()
        .enumerate()
        {
            credentials
                .register(
                    service,
                    CredentialProfile {
                        profile_id: format!("p{idx}"),
                        tenant_id: "contoso".into(),
                        client_id: format!("client-{idx}"),
                        material: CredentialMaterial::ClientSecret {
                            secret: "s".into(),
                        },
                    },
                )
                .unwrap();
        }
        let sessions = Arc::new(SessionManager::new(
            Arc::clone(&transport),
            credentials,
            Duration::from_secs(300),
            clock.clone(),
        ));
        let executor = CallExecutor::with_clock(
            Arc::clone(&transport),
            sessions,
            Arc::clone(&sink),
            config,
            clock,
        );
        Harness {
            executor,
            transport,
            sink,
        }
    }

    /// Validates retry-then-success under throttling.
    ///
    /// Assertions:
    /// - Confirms two throttled attempts are retried and the third succeeds.
    /// - Ensures exactly three audit records exist: retry, retry, success.
    #[tokio::test]
    async fn throttled_twice_then_success() {
        let h = harness(
            MockTransport::scripted(vec![
                Err(GatewayError::throttled("tenant limit")),
                Err(GatewayError::throttled("tenant limit")),
                Ok(json!({ "users": ["alice"] })),
            ]),
            fast_config(),
        );

        let response = h
            .executor
            .execute(CallRequest::new("listUsers"))
            .await
            .unwrap();
        assert!(!response.is_fallback());
        assert_eq!(response.data()["users"][0], "alice");
        assert_eq!(h.transport.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            h.sink.outcomes(),
            vec![AuditOutcome::Retry, AuditOutcome::Retry, AuditOutcome::Success]
        );
    }

    /// Validates that permission failures never retry.
    ///
    /// Assertions:
    /// - Confirms exactly one wire call happened.
    /// - Ensures the error propagates as `Permission` with a failure record.
    #[tokio::test]
    async fn permission_error_never_retries() {
        let h = harness(
            MockTransport::scripted(vec![Err(GatewayError::Permission("missing role".into()))]),
            fast_config(),
        );

        let err = h
            .executor
            .execute(CallRequest::new("listUsers"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
        assert_eq!(h.transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.sink.outcomes(), vec![AuditOutcome::Failure]);
    }

    /// Validates budget exhaustion wraps the last failure.
    ///
    /// Assertions:
    /// - Confirms the throttle budget allows five attempts in total.
    /// - Ensures the terminal error is `ExhaustedRetries` carrying the
    ///   throttled kind.
    #[tokio::test]
    async fn exhausted_throttle_budget() {
        let script = (0..5)
            .map(|_| Err(GatewayError::throttled("tenant limit")))
            .collect();
        let h = harness(MockTransport::scripted(script), fast_config());

        let err = h
            .executor
            .execute(CallRequest::new("listUsers"))
            .await
            .unwrap_err();
        match err {
            GatewayError::ExhaustedRetries {
                attempts,
                last_kind,
                ..
            } => {
                assert_eq!(attempts, 5);
                assert_eq!(last_kind, ErrorKind::Throttled);
            }
            other => panic!("expected ExhaustedRetries, got {other:?}"),
        }
        assert_eq!(h.transport.calls.load(Ordering::SeqCst), 5);
        assert_eq!(h.sink.outcomes().last(), Some(&AuditOutcome::Failure));
    }

    /// Validates the smaller budget for network faults.
    ///
    /// Assertions:
    /// - Confirms only three attempts are made for connectivity failures.
    #[tokio::test]
    async fn network_faults_get_smaller_budget() {
        let script = (0..5)
            .map(|_| Err(GatewayError::TransientNetwork("reset".into())))
            .collect();
        let h = harness(MockTransport::scripted(script), fast_config());

        let err = h
            .executor
            .execute(CallRequest::new("listUsers"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExhaustedRetries);
        assert_eq!(h.transport.calls.load(Ordering::SeqCst), 3);
    }

    /// Validates the one-time reauthentication pass.
    ///
    /// Assertions:
    /// - Confirms a mid-call session rejection triggers one new handshake
    ///   and then succeeds.
    /// - Ensures a second rejection propagates instead of looping.
    #[tokio::test]
    async fn session_rejection_reauthenticates_once() {
        let h = harness(
            MockTransport::scripted(vec![
                Err(GatewayError::Authentication("ticket expired".into())),
                Ok(json!({ "ok": true })),
            ]),
            fast_config(),
        );

        let response = h
            .executor
            .execute(CallRequest::new("listUsers"))
            .await
            .unwrap();
        assert!(!response.is_fallback());
        assert_eq!(h.transport.calls.load(Ordering::SeqCst), 2);
        assert_eq!(h.transport.handshakes.load(Ordering::SeqCst), 2);
        assert_eq!(
            h.sink.outcomes(),
            vec![AuditOutcome::Retry, AuditOutcome::Success]
        );

        // A transport that keeps rejecting exhausts the single free pass.
        let h = harness(
            MockTransport::scripted(vec![
                Err(GatewayError::Authentication("ticket expired".into())),
                Err(GatewayError::Authentication("ticket expired".into())),
            ]),
            fast_config(),
        );
        let err = h
            .executor
            .execute(CallRequest::new("listUsers"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(h.transport.calls.load(Ordering::SeqCst), 2);
    }

    /// Validates fail-fast on missing credentials.
    ///
    /// Assertions:
    /// - Confirms the error is `AuthConfiguration`.
    /// - Ensures neither handshake nor call reached the transport.
    #[tokio::test]
    async fn missing_credential_makes_no_network_calls() {
        let clock = MockClock::new();
        let transport = Arc::new(MockTransport::scripted(vec![]));
        let sink = Arc::new(RecordingSink::default());
        let credentials = Arc::new(CredentialManager::with_clock(clock.clone()));
        let sessions = Arc::new(SessionManager::new(
            Arc::clone(&transport),
            credentials,
            Duration::from_secs(300),
            clock.clone(),
        ));
        let executor = CallExecutor::with_clock(
            Arc::clone(&transport),
            sessions,
            Arc::clone(&sink),
            fast_config(),
            clock,
        );

        let err = executor
            .execute(CallRequest::new("listUsers"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthConfiguration);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert_eq!(transport.handshakes.load(Ordering::SeqCst), 0);
        assert_eq!(sink.outcomes(), vec![AuditOutcome::Failure]);
    }

    /// Validates fallback serving when enabled.
    ///
    /// Assertions:
    /// - Confirms persistent network failure degrades to tagged placeholder
    ///   data with the `ExhaustedRetries` reason.
    /// - Ensures a fallback audit record closes the trail.
    #[tokio::test]
    async fn fallback_serves_tagged_placeholder() {
        let script = (0..3)
            .map(|_| Err(GatewayError::TransientNetwork("reset".into())))
            .collect();
        let mut config = fast_config();
        config.fallback_enabled = true;
        let h = harness(MockTransport::scripted(script), config);

        let response = h
            .executor
            .execute(CallRequest::new("listUsers"))
            .await
            .unwrap();
        match &response {
            GatewayResponse::Fallback { data, reason } => {
                assert_eq!(*reason, ErrorKind::ExhaustedRetries);
                assert!(data["users"].as_array().unwrap().is_empty());
            }
            GatewayResponse::Live { .. } => panic!("expected fallback response"),
        }
        assert_eq!(h.sink.outcomes().last(), Some(&AuditOutcome::Fallback));
    }

    /// Validates error propagation when fallback is disabled.
    ///
    /// Assertions:
    /// - Confirms the terminal error reaches the caller untagged.
    #[tokio::test]
    async fn disabled_fallback_propagates_error() {
        let script = (0..3)
            .map(|_| Err(GatewayError::TransientNetwork("reset".into())))
            .collect();
        let h = harness(MockTransport::scripted(script), fast_config());

        let err = h
            .executor
            .execute(CallRequest::new("listUsers"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExhaustedRetries);
    }

    /// Validates response caching per category.
    ///
    /// Assertions:
    /// - Confirms a repeated query is served from cache with one wire call.
    /// - Ensures an uncached operation always goes to the wire.
    #[tokio::test]
    async fn cached_operations_skip_the_wire() {
        let h = harness(MockTransport::scripted(vec![]), fast_config());

        let first = h
            .executor
            .execute(CallRequest::new("listLicenseSkus"))
            .await
            .unwrap();
        let second = h
            .executor
            .execute(CallRequest::new("listLicenseSkus"))
            .await
            .unwrap();
        assert_eq!(first.data(), second.data());
        assert_eq!(h.transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.executor.cache_stats().hits, 1);

        // getServiceHealth bypasses the cache entirely.
        h.executor
            .execute(CallRequest::new("getServiceHealth"))
            .await
            .unwrap();
        h.executor
            .execute(CallRequest::new("getServiceHealth"))
            .await
            .unwrap();
        assert_eq!(h.transport.calls.load(Ordering::SeqCst), 3);
    }

    /// Validates request validation happens before any network activity.
    ///
    /// Assertions:
    /// - Confirms unknown operations and bad parameters yield
    ///   `InvalidRequest` with zero wire calls.
    #[tokio::test]
    async fn invalid_requests_fail_before_the_wire() {
        let h = harness(MockTransport::scripted(vec![]), fast_config());

        let err = h
            .executor
            .execute(CallRequest::new("formatAllDisks"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        let err = h
            .executor
            .execute(CallRequest::with_params("getUser", json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        assert_eq!(h.transport.calls.load(Ordering::SeqCst), 0);
        assert!(h.sink.outcomes().is_empty());
    }

    /// Validates deadline enforcement across the whole call.
    ///
    /// Assertions:
    /// - Confirms a slow transport call surfaces as `Cancelled` when the
    ///   request deadline elapses.
    /// - Ensures the cancelled invocation still leaves an audit record
    ///   carrying the cancelled kind.
    #[tokio::test]
    async fn deadline_cancels_slow_calls() {
        let h = harness(
            MockTransport::scripted(vec![]).with_call_delay(Duration::from_millis(200)),
            fast_config(),
        );

        let mut request = CallRequest::new("getServiceHealth");
        request.timeout_ms = Some(20);
        let err = h.executor.execute(request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);

        let records = h.sink.records.lock();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, AuditOutcome::Failure);
        assert_eq!(records[0].error_kind, Some(ErrorKind::Cancelled));
        assert_eq!(records[0].attempt, 0);
    }

    /// Validates the observable backoff schedule between throttled attempts.
    ///
    /// Assertions:
    /// - Confirms the gap before each retry follows the exponential shape
    ///   (1s, then 2s) under paused time.
    /// - Ensures gaps are non-decreasing and bounded by the configured cap.
    #[tokio::test(start_paused = true)]
    async fn backoff_delays_grow_between_attempts() {
        let config = ExecutorConfig {
            schedule: RetrySchedule::builder()
                .max_attempts(5)
                .exponential_backoff(Duration::from_secs(1), 2.0, Duration::from_secs(30))
                .no_jitter()
                .build()
                .unwrap(),
            ..fast_config()
        };
        let h = harness(
            MockTransport::scripted(vec![
                Err(GatewayError::throttled("tenant limit")),
                Err(GatewayError::throttled("tenant limit")),
                Ok(json!({ "ok": true })),
            ]),
            config,
        );

        h.executor
            .execute(CallRequest::new("listUsers"))
            .await
            .unwrap();

        let instants = h.transport.call_instants.lock();
        assert_eq!(instants.len(), 3);
        let first_gap = instants[1] - instants[0];
        let second_gap = instants[2] - instants[1];
        assert_eq!(first_gap, Duration::from_secs(1));
        assert_eq!(second_gap, Duration::from_secs(2));
        assert!(second_gap >= first_gap);
        assert!(second_gap <= Duration::from_secs(30));
    }

    /// Validates server-dictated backoff hints are honored and clamped.
    ///
    /// Assertions:
    /// - Confirms a throttled response with a hint still retries and
    ///   eventually succeeds.
    #[tokio::test]
    async fn retry_after_hint_is_honored() {
        let h = harness(
            MockTransport::scripted(vec![
                Err(GatewayError::Throttled {
                    message: "tenant limit".into(),
                    retry_after_secs: Some(0),
                }),
                Ok(json!({ "ok": true })),
            ]),
            fast_config(),
        );

        let response = h
            .executor
            .execute(CallRequest::new("listUsers"))
            .await
            .unwrap();
        assert!(!response.is_fallback());
        assert_eq!(h.transport.calls.load(Ordering::SeqCst), 2);
    }
}
