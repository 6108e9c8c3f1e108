//! Service session lifecycle
//!
//! At most one live session exists per remote service. Concurrent callers
//! needing a session for the same service coalesce onto a single handshake;
//! callers for different services never contend with each other.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use suitegate_common::{Clock, SystemClock};
use suitegate_domain::{GatewayError, GatewayResult, RemoteService, Session, SessionState};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::credentials::CredentialManager;
use crate::ports::RemoteTransport;

type HandshakeCell = Arc<OnceCell<Result<Session, GatewayError>>>;

/// Owns one session per remote service and the handshakes that create them.
pub struct SessionManager<T, C = SystemClock> {
    transport: Arc<T>,
    credentials: Arc<CredentialManager<C>>,
    sessions: DashMap<RemoteService, Session>,
    handshakes: DashMap<RemoteService, HandshakeCell>,
    failed: DashMap<RemoteService, ()>,
    safety_margin: Duration,
    clock: C,
}

impl<T, C> SessionManager<T, C>
where
    T: RemoteTransport,
    C: Clock + Clone,
{
    /// Manager with the given handshake transport and credential store.
    ///
    /// `safety_margin` is subtracted from every remote-declared ticket
    /// lifetime so sessions retire before the remote would reject them.
    #[must_use]
    pub fn new(
        transport: Arc<T>,
        credentials: Arc<CredentialManager<C>>,
        safety_margin: Duration,
        clock: C,
    ) -> Self {
        Self {
            transport,
            credentials,
            sessions: DashMap::new(),
            handshakes: DashMap::new(),
            failed: DashMap::new(),
            safety_margin,
            clock,
        }
    }

    /// Return the live session for `service`, performing the handshake if
    /// none exists.
    ///
    /// Repeated calls while a session is live return the same session without
    /// touching the network. Concurrent calls during a handshake share one
    /// handshake; its error, if any, is delivered to every waiter.
    pub async fn acquire(&self, service: RemoteService) -> GatewayResult<Session> {
        let now = self.wall_now();
        if let Some(existing) = self.sessions.get(&service) {
            if existing.is_live(now) {
                return Ok(existing.clone());
            }
        }
        // Only drop the session if it is still the stale one we just saw.
        if self
            .sessions
            .remove_if(&service, |_, session| !session.is_live(now))
            .is_some()
        {
            debug!(service = %service, "session expired, renewing");
        }

        let cell: HandshakeCell = self
            .handshakes
            .entry(service)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let result = cell
            .get_or_init(|| async { self.handshake(service).await })
            .await
            .clone();

        let retired = self
            .handshakes
            .remove_if(&service, |_, current| Arc::ptr_eq(current, &cell))
            .is_some();
        if retired {
            match &result {
                Ok(session) => {
                    self.failed.remove(&service);
                    self.sessions.insert(service, session.clone());
                }
                Err(_) => {
                    self.failed.insert(service, ());
                }
            }
        }

        result
    }

    /// Observable lifecycle state for `service`.
    ///
    /// Reports `Connecting` while a handshake is in flight, `Failed` after a
    /// handshake error until the next attempt, and `Expired` for a session
    /// past its lifetime.
    #[must_use]
    pub fn state(&self, service: RemoteService) -> SessionState {
        if let Some(session) = self.sessions.get(&service) {
            return if session.is_live(self.wall_now()) {
                SessionState::Connected
            } else {
                SessionState::Expired
            };
        }
        if self.handshakes.contains_key(&service) {
            return SessionState::Connecting;
        }
        if self.failed.contains_key(&service) {
            return SessionState::Failed;
        }
        SessionState::Disconnected
    }

    /// Drop the session for `service`; the next `acquire` handshakes anew.
    pub fn invalidate(&self, service: RemoteService) {
        if self.sessions.remove(&service).is_some() {
            info!(service = %service, "session invalidated");
        }
    }

    /// Current session for `service`, with expiry reflected in its state.
    #[must_use]
    pub fn current(&self, service: RemoteService) -> Option<Session> {
        let now = self.wall_now();
        self.sessions.get(&service).map(|session| {
            let mut session = session.clone();
            if session.state == SessionState::Connected && !session.is_live(now) {
                session.state = SessionState::Expired;
            }
            session
        })
    }

    async fn handshake(&self, service: RemoteService) -> GatewayResult<Session> {
        let profile = self.credentials.credential_for(service)?;
        debug!(service = %service, profile_id = %profile.profile_id, "authenticating");

        let grant = match self.transport.authenticate(service, &profile).await {
            Ok(grant) => grant,
            Err(err) => {
                warn!(service = %service, error = %err, "handshake failed");
                return Err(err);
            }
        };

        let now = self.wall_now();
        let lifetime = Duration::from_secs(grant.lifetime_secs);
        // Grants shorter than the margin keep their full lifetime; a zero
        // effective lifetime would thrash the handshake.
        let mut effective = lifetime.saturating_sub(self.safety_margin);
        if effective.is_zero() {
            effective = lifetime;
        }

        let session = Session {
            id: Uuid::new_v4(),
            service,
            profile_id: profile.profile_id,
            state: SessionState::Connected,
            ticket: grant.ticket,
            established_at: now,
            expires_at: now
                + chrono::Duration::from_std(effective)
                    .unwrap_or_else(|_| chrono::Duration::seconds(0)),
        };
        info!(
            service = %service,
            session_id = %session.id,
            expires_at = %session.expires_at,
            "session established"
        );
        Ok(session)
    }

    fn wall_now(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.clock.system_time())
    }
}
