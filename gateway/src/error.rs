//! Aggregates the error types of every component this binary wires together, so `main` has a
//! single `Result` to propagate up to its `Box<dyn Error>` return type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Schema(#[from] kestrel_schema::SchemaError),

    #[error(transparent)]
    Pool(#[from] kestrel_pool::PoolError),

    #[error(transparent)]
    Book(#[from] kestrel_book::BookError),

    #[error(transparent)]
    Bus(#[from] kestrel_bus::BusError),

    #[error(transparent)]
    Control(#[from] kestrel_control::ControlError),

    #[error(transparent)]
    Adapter(#[from] kestrel_adapter::AdapterError),
}
