//! Configuration loader
//!
//! Loads the gateway configuration from a file with environment-variable
//! overrides on top.
//!
//! ## Loading Strategy
//! 1. `SUITEGATE_CONFIG_PATH`, when set, names the file to load
//! 2. Otherwise standard locations are probed
//! 3. Supports JSON and TOML formats (detected by extension)
//! 4. Individual environment variables override file values
//!
//! ## Environment Variables
//! - `SUITEGATE_CONFIG_PATH`: Explicit config file path
//! - `SUITEGATE_BASE_URL`: Remote suite endpoint base URL
//! - `SUITEGATE_AUDIT_LOG`: Audit JSONL file path
//! - `SUITEGATE_FALLBACK_ENABLED`: Serve placeholder data on tolerated
//!   failures (true/false)
//!
//! ## File Locations
//! The loader probes `./suitegate.toml`, `./suitegate.json`,
//! `./config/suitegate.toml`, and `./config/suitegate.json` in order.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use suitegate_core::{CategoryTtls, GatewaySettings};
use suitegate_domain::constants::{
    DEFAULT_BACKOFF_BASE, DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_BACKOFF_SECS,
    DEFAULT_MAX_CONCURRENT_CALLS, DEFAULT_NETWORK_ATTEMPTS, DEFAULT_PERMIT_WAIT_SECS,
    DEFAULT_REPORT_TTL_SECS, DEFAULT_STATIC_TTL_SECS, DEFAULT_THROTTLE_ATTEMPTS,
    DEFAULT_USER_TTL_SECS, SESSION_SAFETY_MARGIN_SECS,
};
use suitegate_domain::{CredentialProfile, RemoteService};

use crate::errors::{InfraError, InfraResult};

/// One credential profile bound to a service, as configured.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileEntry {
    pub service: RemoteService,
    #[serde(flatten)]
    pub profile: CredentialProfile,
}

/// Complete gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the remote suite's management endpoints.
    pub base_url: String,
    /// Path the audit trail is appended to.
    #[serde(default = "default_audit_log")]
    pub audit_log_path: PathBuf,
    #[serde(default = "default_true")]
    pub fallback_enabled: bool,

    // Retry shape
    #[serde(default = "default_throttle_attempts")]
    pub throttle_attempts: u32,
    #[serde(default = "default_network_attempts")]
    pub network_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_backoff_base")]
    pub backoff_base: f64,
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,

    // Cache TTLs per category
    #[serde(default = "default_static_ttl_secs")]
    pub static_ttl_secs: u64,
    #[serde(default = "default_user_ttl_secs")]
    pub user_ttl_secs: u64,
    #[serde(default = "default_report_ttl_secs")]
    pub report_ttl_secs: u64,

    // Sessions and concurrency
    #[serde(default = "default_safety_margin_secs")]
    pub session_safety_margin_secs: u64,
    #[serde(default = "default_max_concurrent_calls")]
    pub max_concurrent_calls: usize,
    #[serde(default = "default_permit_wait_secs")]
    pub permit_wait_secs: u64,
    /// Deadline applied to calls that carry none, in milliseconds.
    #[serde(default)]
    pub default_timeout_ms: Option<u64>,

    /// Credential profiles to register at startup.
    #[serde(default)]
    pub profiles: Vec<ProfileEntry>,
}

fn default_audit_log() -> PathBuf {
    PathBuf::from("suitegate-audit.jsonl")
}
const fn default_true() -> bool {
    true
}
const fn default_throttle_attempts() -> u32 {
    DEFAULT_THROTTLE_ATTEMPTS
}
const fn default_network_attempts() -> u32 {
    DEFAULT_NETWORK_ATTEMPTS
}
const fn default_initial_backoff_ms() -> u64 {
    DEFAULT_INITIAL_BACKOFF_MS
}
const fn default_backoff_base() -> f64 {
    DEFAULT_BACKOFF_BASE
}
const fn default_max_backoff_secs() -> u64 {
    DEFAULT_MAX_BACKOFF_SECS
}
const fn default_static_ttl_secs() -> u64 {
    DEFAULT_STATIC_TTL_SECS
}
const fn default_user_ttl_secs() -> u64 {
    DEFAULT_USER_TTL_SECS
}
const fn default_report_ttl_secs() -> u64 {
    DEFAULT_REPORT_TTL_SECS
}
const fn default_safety_margin_secs() -> u64 {
    SESSION_SAFETY_MARGIN_SECS
}
const fn default_max_concurrent_calls() -> usize {
    DEFAULT_MAX_CONCURRENT_CALLS
}
const fn default_permit_wait_secs() -> u64 {
    DEFAULT_PERMIT_WAIT_SECS
}

impl GatewayConfig {
    /// Validate value ranges.
    pub fn validate(&self) -> InfraResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(InfraError::Config("base_url must not be empty".into()));
        }
        if self.throttle_attempts == 0 || self.network_attempts == 0 {
            return Err(InfraError::Config(
                "attempt budgets must be greater than 0".into(),
            ));
        }
        if self.backoff_base <= 1.0 {
            return Err(InfraError::Config(
                "backoff_base must be greater than 1.0".into(),
            ));
        }
        if self.static_ttl_secs == 0 || self.user_ttl_secs == 0 || self.report_ttl_secs == 0 {
            return Err(InfraError::Config("cache TTLs must be non-zero".into()));
        }
        if self.max_concurrent_calls == 0 {
            return Err(InfraError::Config(
                "max_concurrent_calls must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Behavioral settings for `suitegate_core::Gateway`.
    #[must_use]
    pub fn settings(&self) -> GatewaySettings {
        GatewaySettings {
            throttle_attempts: self.throttle_attempts,
            network_attempts: self.network_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            backoff_base: self.backoff_base,
            max_backoff: Duration::from_secs(self.max_backoff_secs),
            session_safety_margin: Duration::from_secs(self.session_safety_margin_secs),
            max_concurrent_calls: self.max_concurrent_calls,
            permit_wait: Duration::from_secs(self.permit_wait_secs),
            fallback_enabled: self.fallback_enabled,
            default_timeout: self.default_timeout_ms.map(Duration::from_millis),
            ttls: CategoryTtls {
                static_ttl: Duration::from_secs(self.static_ttl_secs),
                user_ttl: Duration::from_secs(self.user_ttl_secs),
                report_ttl: Duration::from_secs(self.report_ttl_secs),
            },
        }
    }
}

/// Load configuration with automatic fallback strategy.
///
/// Reads `.env` if present, picks the config file named by
/// `SUITEGATE_CONFIG_PATH` or the first probed location, applies environment
/// overrides, and validates the result.
///
/// # Errors
/// Returns `InfraError::Config` if no file is found, the format is invalid,
/// or validation fails.
pub fn load() -> InfraResult<GatewayConfig> {
    dotenvy::dotenv().ok();

    let explicit = std::env::var("SUITEGATE_CONFIG_PATH").ok().map(PathBuf::from);
    let mut config = load_from_file(explicit)?;
    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file.
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `InfraError::Config` if the file is missing or malformed.
pub fn load_from_file(path: Option<PathBuf>) -> InfraResult<GatewayConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(InfraError::Config(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            InfraError::Config("no config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "loading gateway configuration");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| InfraError::Config(format!("failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content; format follows the extension.
fn parse_config(contents: &str, path: &Path) -> InfraResult<GatewayConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| InfraError::Config(format!("invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| InfraError::Config(format!("invalid JSON format: {e}"))),
        other => Err(InfraError::Config(format!(
            "unsupported config format: {other}"
        ))),
    }
}

/// Probe the standard locations for a configuration file.
#[must_use]
pub fn probe_config_paths() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    [
        cwd.join("suitegate.toml"),
        cwd.join("suitegate.json"),
        cwd.join("config/suitegate.toml"),
        cwd.join("config/suitegate.json"),
    ]
    .into_iter()
    .find(|path| path.exists())
}

fn apply_env_overrides(config: &mut GatewayConfig) -> InfraResult<()> {
    if let Ok(base_url) = std::env::var("SUITEGATE_BASE_URL") {
        config.base_url = base_url;
    }
    if let Ok(path) = std::env::var("SUITEGATE_AUDIT_LOG") {
        config.audit_log_path = PathBuf::from(path);
    }
    if let Ok(raw) = std::env::var("SUITEGATE_FALLBACK_ENABLED") {
        config.fallback_enabled = parse_bool(&raw).ok_or_else(|| {
            InfraError::Config(format!("invalid SUITEGATE_FALLBACK_ENABLED value: {raw}"))
        })?;
    }
    Ok(())
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive).
fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
