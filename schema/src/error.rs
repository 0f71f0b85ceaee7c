use thiserror::Error;

/// Errors produced by the pure validators and constructors in [`crate`].
///
/// These are always [`Invalid`](SchemaError::Invalid) in the terminology of the gateway's
/// error-kind taxonomy: they are returned to the caller and never retried.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum SchemaError {
    #[error("invalid instrument symbol {symbol:?}: {reason}")]
    InvalidInstrument { symbol: String, reason: String },

    #[error("invalid route/canonical type {kind:?}: {reason}")]
    InvalidCanonicalType { kind: String, reason: String },

    #[error("invalid filter rule on field {field:?}: {reason}")]
    InvalidFilter { field: String, reason: String },
}
