//! Transport layer for the ferrule middleware
//!
//! Resource calls leave the process either over HTTP or through a message
//! queue. This crate provides both behind small traits so the endpoint layer
//! can be tested against fakes, plus the helper-process plumbing used to
//! launch the shared discovery registry.
//!
//! # Architecture
//!
//! - **Transport trait**: request/response over HTTP, implemented by `HttpTransport` (reqwest)
//! - **QueueTransport trait**: correlated request/reply over a queue, implemented by `MemoryBroker`
//! - **Process management**: `ProcessConfig`/`ProcessHandle` for helper processes
//! - **Error handling**: one `TransportError` for every transport
//!
//! # Usage
//!
//! ```ignore
//! use ferrule_transport::{HttpRequest, HttpTransport, Transport};
//!
//! let transport = HttpTransport::new()?;
//! let request = HttpRequest::new("GET", "http://svc.local/v1/purchases");
//! let response = transport.send_http(request).await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod http;
pub mod process;
pub mod queue;
pub mod traits;

pub use error::{Result, TransportError};
pub use http::{HttpTransport, HttpTransportConfig, RetryPolicy};
pub use process::{ProcessConfig, ProcessHandle};
pub use queue::{MemoryBroker, QueueConsumer, QueueTransport};
pub use traits::{HttpRequest, HttpResponse, Transport};
