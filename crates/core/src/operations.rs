//! Registry of console read queries
//!
//! Every operation the gateway accepts is declared here with its target
//! service, cache category, and parameter schema. Requests referencing an
//! unknown operation or carrying malformed parameters are rejected before any
//! session or network work happens.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use suitegate_domain::{CacheCategory, GatewayError, GatewayResult, RemoteService};

/// Declaration of one read query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSpec {
    pub name: &'static str,
    pub service: RemoteService,
    /// Cache category, or `None` for operations that always hit the remote.
    pub category: Option<CacheCategory>,
    pub required_params: &'static [&'static str],
    pub optional_params: &'static [&'static str],
}

static REGISTRY: Lazy<HashMap<&'static str, OperationSpec>> = Lazy::new(|| {
    let specs = [
        OperationSpec {
            name: "listUsers",
            service: RemoteService::Directory,
            category: Some(CacheCategory::User),
            required_params: &[],
            optional_params: &["filter", "top"],
        },
        OperationSpec {
            name: "getUser",
            service: RemoteService::Directory,
            category: Some(CacheCategory::User),
            required_params: &["userId"],
            optional_params: &[],
        },
        OperationSpec {
            name: "listGroups",
            service: RemoteService::Directory,
            category: Some(CacheCategory::User),
            required_params: &[],
            optional_params: &["filter"],
        },
        OperationSpec {
            name: "listLicenseSkus",
            service: RemoteService::Directory,
            category: Some(CacheCategory::Static),
            required_params: &[],
            optional_params: &[],
        },
        OperationSpec {
            name: "listMailboxes",
            service: RemoteService::Messaging,
            category: Some(CacheCategory::User),
            required_params: &[],
            optional_params: &["filter"],
        },
        OperationSpec {
            name: "getMailboxUsage",
            service: RemoteService::Messaging,
            category: Some(CacheCategory::Report),
            required_params: &["period"],
            optional_params: &[],
        },
        OperationSpec {
            name: "getServiceHealth",
            service: RemoteService::ServiceHealth,
            category: None,
            required_params: &[],
            optional_params: &[],
        },
        OperationSpec {
            name: "getUsageReport",
            service: RemoteService::Reporting,
            category: Some(CacheCategory::Report),
            required_params: &["period"],
            optional_params: &["reportType"],
        },
    ];
    specs.into_iter().map(|spec| (spec.name, spec)).collect()
});

/// Look up an operation by name.
pub fn resolve(operation: &str) -> GatewayResult<&'static OperationSpec> {
    REGISTRY.get(operation).ok_or_else(|| {
        GatewayError::InvalidRequest(format!("unknown operation '{operation}'"))
    })
}

/// Validate a parameter object against the operation's schema.
///
/// Parameters must be a JSON object; required keys must be present and
/// unknown keys are rejected.
pub fn validate_params(spec: &OperationSpec, params: &serde_json::Value) -> GatewayResult<()> {
    let object = params.as_object().ok_or_else(|| {
        GatewayError::InvalidRequest(format!(
            "parameters for '{}' must be a JSON object",
            spec.name
        ))
    })?;

    for required in spec.required_params {
        match object.get(*required) {
            Some(value) if !value.is_null() => {}
            _ => {
                return Err(GatewayError::InvalidRequest(format!(
                    "operation '{}' requires parameter '{required}'",
                    spec.name
                )));
            }
        }
    }

    for key in object.keys() {
        let known = spec.required_params.contains(&key.as_str())
            || spec.optional_params.contains(&key.as_str());
        if !known {
            return Err(GatewayError::InvalidRequest(format!(
                "operation '{}' does not accept parameter '{key}'",
                spec.name
            )));
        }
    }

    Ok(())
}

/// Deterministic cache key: operation name plus parameters sorted by name.
///
/// Two requests with the same parameters in different order produce the same
/// key.
#[must_use]
pub fn cache_key(operation: &str, params: &serde_json::Value) -> String {
    let mut key = String::from(operation);
    if let Some(object) = params.as_object() {
        let mut entries: Vec<_> = object.iter().collect();
        entries.sort_by_key(|(name, _)| name.as_str());
        for (name, value) in entries {
            key.push('|');
            key.push_str(name);
            key.push('=');
            match value {
                serde_json::Value::String(s) => key.push_str(s),
                other => key.push_str(&other.to_string()),
            }
        }
    }
    key
}
