//! Standardised logging initialisers: human-readable or JSON, both driven by `RUST_LOG` via
//! `EnvFilter`, defaulting to `INFO` when unset.
//!
//! ### Standard logging (human-readable)
//! ```rust,ignore
//! use kestrel_gateway::logging::init_logging;
//!
//! fn main() {
//!     init_logging();
//!     tracing::info!("gateway started");
//! }
//! ```
//!
//! ### JSON logging (aggregators / observability)
//! ```rust,ignore
//! use kestrel_gateway::logging::init_json_logging;
//!
//! fn main() {
//!     init_json_logging();
//!     tracing::info!("gateway started");
//! }
//! ```
//!
//! ### Environment configuration
//! ```bash
//! export RUST_LOG=debug
//! export RUST_LOG=kestrel_adapter=debug,kestrel_control=info
//! ```

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn env_filter() -> tracing_subscriber::filter::EnvFilter {
    tracing_subscriber::filter::EnvFilter::builder()
        .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        .from_env_lossy()
}

pub fn init_logging() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer())
        .init()
}

pub fn init_json_logging() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
        .init()
}
