//! HTTP transport implementation
//!
//! Provides a reqwest-backed client implementing the `Transport` trait,
//! with per-request timeouts and retries of connection-level failures.

pub mod client;
pub mod retry;

pub use client::{HttpTransport, HttpTransportConfig};
pub use retry::RetryPolicy;
