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

//! # 🧵 Stream - Per-Stream Ordering Buffer
//!
//! Presents canonical events for a single `(provider, symbol, type)` stream in strict ascending
//! `seq_provider` order, with a bounded lateness tolerance and an optional maximum buffer size.
//! [`OrderingManager`] owns one [`StreamBuffer`] per stream and tears it down once drained.

mod buffer;
mod manager;

pub use buffer::StreamBuffer;
pub use manager::{OrderingManager, DEFAULT_LATENESS_TOLERANCE};
