use kestrel_schema::{CanonicalType, ProviderId, SchemaError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("control bus closed")]
    BusClosed,

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error(transparent)]
    InvalidRoute(#[from] SchemaError),

    #[error(transparent)]
    Bus(#[from] kestrel_bus::BusError),

    #[error("no route registered for provider {provider:?} canonical type {canonical_type}")]
    RouteNotFound {
        provider: ProviderId,
        canonical_type: CanonicalType,
    },

    #[error("adapter rejected the request: {0}")]
    AdapterRejected(String),

    #[error("unknown order {client_order_id}")]
    UnknownOrder { client_order_id: String },
}
