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

//! # 🚌 Bus - Publisher, Data Bus, Dispatch Table
//!
//! Three closely related pieces of plumbing between the provider adapter and the gateway's
//! subscribers: [`Publisher`] stamps canonical events, [`DataBus`] fans them out, and
//! [`DispatchTable`] holds the route map and the routing-version counter the control plane
//! bumps on every successful mutation.

mod databus;
mod dispatch;
mod error;
mod publisher;

pub use databus::{DataBus, Subscriber, SubscriberId, DEFAULT_SUBSCRIBER_CAPACITY};
pub use dispatch::DispatchTable;
pub use error::BusError;
pub use publisher::Publisher;
pub use kestrel_schema::Route;
