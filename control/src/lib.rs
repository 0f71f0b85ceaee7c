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

//! # 🎛️ Control - Control Bus, Controller, Subscription Manager, Trading-State Store
//!
//! The command side of the gateway: [`bus::ControlBus`] is the mailbox consumers submit
//! commands through, [`controller::Controller`] is what drains it, [`subscription::SubscriptionManager`]
//! reconciles desired routing against the dispatch table, and [`trading_state::TradingStateStore`]
//! is the per-consumer trading kill switch `SubmitOrder` checks before ever reaching the adapter.

mod bus;
mod command;
mod controller;
mod error;
mod subscription;
mod trading_state;

pub use bus::{ControlBus, PendingCommand, DEFAULT_BUS_CAPACITY};
pub use command::{ControlAck, ControlCommand, ControlMessage, SubmitOrderCommand};
pub use controller::Controller;
pub use error::ControlError;
pub use subscription::{AdapterHandle, SubscriptionManager};
pub use trading_state::TradingStateStore;
