//! Declarative error conversion between crate layers.

mod boundary;

pub use boundary::ErrorBoundary;
