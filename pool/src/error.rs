use thiserror::Error;

/// Errors returned by [`crate::Pool::acquire`].
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum PoolError {
    /// No slot became free before the caller's deadline elapsed.
    #[error("pool exhausted: no slot freed within {waited_ms}ms (capacity {capacity})")]
    AcquireTimeout { waited_ms: u128, capacity: usize },
}
