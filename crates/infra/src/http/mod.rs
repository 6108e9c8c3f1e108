//! HTTP adapters for the remote suite services

pub mod transport;

pub use transport::{HttpTransport, HttpTransportBuilder};
