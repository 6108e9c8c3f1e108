//! Credential profile bookkeeping
//!
//! Pure in-memory store mapping each remote service to its registered
//! application credential. No network or keychain I/O happens here; loading
//! and persisting profiles is the caller's concern.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use suitegate_common::{Clock, SystemClock};
use suitegate_domain::{
    CredentialMaterial, CredentialProfile, GatewayError, GatewayResult, RemoteService,
};
use tracing::info;

/// Store of credential profiles keyed by remote service.
///
/// Invariant: at most one active profile per `(tenant_id, client_id)` pair
/// across all services.
pub struct CredentialManager<C = SystemClock> {
    profiles: RwLock<HashMap<RemoteService, CredentialProfile>>,
    clock: C,
}

impl CredentialManager {
    /// Manager reading wall time from the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for CredentialManager {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> CredentialManager<C> {
    /// Manager with an injected clock; tests drive certificate expiry with a
    /// mock.
    #[must_use]
    pub fn with_clock(clock: C) -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Register `profile` as the credential for `service`.
    ///
    /// Re-registering the same profile for the same service replaces it.
    /// Registering a profile whose `(tenant_id, client_id)` is already bound
    /// elsewhere is a configuration error.
    pub fn register(
        &self,
        service: RemoteService,
        profile: CredentialProfile,
    ) -> GatewayResult<()> {
        let mut profiles = self.profiles.write();
        let identity = profile.identity();
        let conflict = profiles.iter().any(|(svc, existing)| {
            *svc != service
                && existing.identity() == identity
                && existing.profile_id != profile.profile_id
        });
        if conflict {
            return Err(GatewayError::AuthConfiguration(format!(
                "tenant '{}' client '{}' already has an active credential profile",
                identity.0, identity.1
            )));
        }
        info!(
            service = %service,
            profile_id = %profile.profile_id,
            "credential profile registered"
        );
        profiles.insert(service, profile);
        Ok(())
    }

    /// Fetch the credential for `service`, verifying it is usable.
    ///
    /// A certificate past its `not_after` is reported as a configuration
    /// error, never silently refreshed: certificate renewal is an operator
    /// action.
    pub fn credential_for(&self, service: RemoteService) -> GatewayResult<CredentialProfile> {
        let profiles = self.profiles.read();
        let profile = profiles.get(&service).ok_or_else(|| {
            GatewayError::AuthConfiguration(format!(
                "no credential profile registered for service '{service}'"
            ))
        })?;

        if let CredentialMaterial::Certificate {
            thumbprint,
            not_after,
        } = &profile.material
        {
            if self.wall_now() >= *not_after {
                return Err(GatewayError::AuthConfiguration(format!(
                    "certificate '{thumbprint}' for service '{service}' expired at {not_after}"
                )));
            }
        }

        Ok(profile.clone())
    }

    /// Hot-swap the client secret for `service` without a restart.
    ///
    /// Only secret-based profiles rotate this way; certificate profiles are
    /// replaced through `register`.
    pub fn rotate_secret(
        &self,
        service: RemoteService,
        new_secret: impl Into<String>,
    ) -> GatewayResult<()> {
        let mut profiles = self.profiles.write();
        let profile = profiles.get_mut(&service).ok_or_else(|| {
            GatewayError::AuthConfiguration(format!(
                "no credential profile registered for service '{service}'"
            ))
        })?;

        match &mut profile.material {
            CredentialMaterial::ClientSecret { secret } => {
                *secret = new_secret.into();
                info!(
                    service = %service,
                    profile_id = %profile.profile_id,
                    "client secret rotated"
                );
                Ok(())
            }
            CredentialMaterial::Certificate { .. } => Err(GatewayError::AuthConfiguration(
                format!("profile for service '{service}' is certificate-based; re-register to replace it"),
            )),
        }
    }

    /// Remove the profile for `service`, if any.
    pub fn remove(&self, service: RemoteService) -> bool {
        self.profiles.write().remove(&service).is_some()
    }

    fn wall_now(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.clock.system_time())
    }
}
