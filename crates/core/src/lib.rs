//! # SuiteGate Core
//!
//! Pure gateway logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Credential and session management
//! - The call executor with retry, audit, and fallback handling
//! - Port/adapter interfaces (traits)
//! - The operation registry for console read queries
//!
//! ## Architecture Principles
//! - Only depends on `suitegate-common` and `suitegate-domain`
//! - No HTTP or filesystem code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod credentials;
pub mod executor;
pub mod fallback;
pub mod gateway;
pub mod operations;
pub mod ports;
pub mod session;

// Re-export specific items to avoid ambiguity
pub use credentials::CredentialManager;
pub use executor::{CallExecutor, CategoryTtls, ExecutorConfig};
pub use fallback::FallbackDataProvider;
pub use gateway::{Gateway, GatewaySettings};
pub use operations::{cache_key, resolve, validate_params, OperationSpec};
pub use ports::{AuditSink, RemoteTransport};
pub use session::SessionManager;
