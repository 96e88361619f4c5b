#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Core abstractions for the ferrule middleware.
//!
//! This crate provides the foundational pieces every other ferrule crate
//! builds on:
//!
//! - **Retry and polling** via the `BackoffStrategy` trait and
//!   `ExponentialBackoff`, including deadline-bounded polling used when
//!   waiting for a lazily started helper service to come up
//! - **Lazily initialised resources** via `Resource` and `LazyResource`
//! - **Declarative error boundaries** via the `error_boundary!` macro
//! - **JSON serialisation** via `SerializePipeline`, including the
//!   newline-delimited framing used by line protocols
//!
//! # Examples
//!
//! ```rust
//! use ferrule_core::prelude::*;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backoff = ExponentialBackoff::builder()
//!     .max_retries(3)
//!     .initial_delay(Duration::from_millis(100))
//!     .build();
//!
//! let result = backoff.execute(|| async {
//!     Ok::<_, std::io::Error>(42)
//! }).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod resource;
pub mod retry;
pub mod serde;

/// Convenient re-exports of commonly used items.
///
/// ```rust
/// use ferrule_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::ErrorBoundary;
    pub use crate::error_boundary;
    pub use crate::resource::{LazyResource, Resource};
    pub use crate::retry::{
        BackoffStrategy, ExponentialBackoff, ExponentialBackoffBuilder, PollTimeout,
    };
    pub use crate::serde::SerializePipeline;
}
