use std::error::Error;

/// A boundary between two error types.
///
/// Each ferrule crate has its own error enum. Boundaries describe how an
/// error crossing from one layer into the next is translated, so `?` works
/// across the seam without scattered `map_err` calls.
pub trait ErrorBoundary {
    /// The error raised by the lower layer.
    type Inner: Error + Send + Sync;

    /// The error exposed by the upper layer.
    type Outer: Error + Send + Sync;

    /// Translate an inner error into the outer error type.
    fn convert(inner: Self::Inner) -> Self::Outer;
}

/// Define a `From` conversion between two error types.
///
/// ```
/// use ferrule_core::error_boundary;
///
/// #[derive(Debug, thiserror::Error)]
/// enum StoreError {
///     #[error("transport: {0}")]
///     Transport(String),
/// }
///
/// error_boundary!(std::io::Error => StoreError, |e| {
///     StoreError::Transport(e.to_string())
/// });
///
/// fn read_snapshot() -> Result<Vec<u8>, StoreError> {
///     Ok(std::fs::read("/nonexistent/snapshot")?)
/// }
///
/// assert!(matches!(read_snapshot(), Err(StoreError::Transport(_))));
/// ```
#[macro_export]
macro_rules! error_boundary {
    ($inner:ty => $outer:ty, |$err:ident| $body:expr) => {
        impl ::std::convert::From<$inner> for $outer {
            fn from($err: $inner) -> $outer {
                $body
            }
        }
    };
}
