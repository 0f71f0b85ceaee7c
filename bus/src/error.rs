use kestrel_schema::{CanonicalType, ProviderId, SchemaError};
use thiserror::Error;

/// Errors produced by [`crate::DispatchTable`] and [`crate::DataBus`].
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum BusError {
    #[error("invalid route: {0}")]
    InvalidRoute(#[from] SchemaError),

    #[error("no route for provider {provider} type {canonical_type}")]
    RouteNotFound {
        provider: ProviderId,
        canonical_type: CanonicalType,
    },

    #[error("subscriber {subscriber_id} not found")]
    UnknownSubscriber { subscriber_id: u64 },
}
