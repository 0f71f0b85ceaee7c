#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # 📐 Schema - Canonical Event Model
//!
//! Pure, dependency-free (of the rest of the workspace) validators and types that every other
//! Kestrel crate builds on: the canonical [`Event`], its [`Payload`] variants, [`Symbol`] and
//! [`CanonicalType`] validation, and the [`Route`] shape consumed by the dispatch table.
//!
//! Nothing in this crate touches a socket, a clock source beyond [`chrono::Utc`], or a mutex —
//! it is the single place every other component turns to for "is this instrument/route well
//! formed" and "what does an event id look like".

/// Provider identifiers for venues the gateway can connect to.
pub mod provider;

/// Canonical instrument [`Symbol`] parsing and validation.
pub mod instrument;

/// Canonical route type validation and the [`Route`] record consumed by the dispatch table.
pub mod route;

/// Buy/Sell side shared by trades and execution reports.
pub mod side;

/// Currency code normalisation.
pub mod currency;

/// The canonical [`Event`] envelope and its [`Payload`] variants.
pub mod event;

/// All [`Error`](std::error::Error)s produced by this crate.
pub mod error;

pub use error::SchemaError;
pub use event::{Event, EventType, Payload, PriceLevel};
pub use instrument::Symbol;
pub use provider::ProviderId;
pub use route::{CanonicalType, FilterRule, Route};
pub use side::Side;
