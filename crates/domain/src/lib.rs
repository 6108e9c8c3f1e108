//! # SuiteGate Domain
//!
//! Business domain types and models for the SuiteGate remote-call gateway.
//!
//! This crate contains:
//! - Credential, session, and call data types
//! - The gateway error taxonomy and Result definitions
//! - Audit record structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other SuiteGate crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::{ErrorKind, GatewayError, GatewayResult};
pub use types::{
    AuditOutcome, AuditRecord, CacheCategory, CallRequest, CredentialMaterial, CredentialProfile,
    GatewayResponse, HandshakeGrant, RemoteService, Session, SessionState,
};
