//! # SuiteGate Infrastructure
//!
//! Infrastructure implementations of core gateway ports.
//!
//! This crate contains:
//! - The HTTP transport to the remote suite services
//! - The append-only JSONL audit sink
//! - Configuration loading (file + environment)
//!
//! ## Architecture
//! - Implements traits defined in `suitegate-core`
//! - Depends on `suitegate-domain` and `suitegate-core`
//! - Contains all "impure" code (network, filesystem)

pub mod audit;
pub mod config;
pub mod errors;
pub mod http;

// Re-export commonly used items
pub use audit::JsonlAuditSink;
pub use config::{load, load_from_file, GatewayConfig, ProfileEntry};
pub use errors::InfraError;
pub use http::{HttpTransport, HttpTransportBuilder};
