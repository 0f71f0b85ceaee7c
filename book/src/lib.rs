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

//! # 📖 Book - Order-Book Assembler
//!
//! Maintains a single venue's order book from a REST snapshot plus a stream of sequenced depth
//! diffs, enforcing the gap/resync rule and the venue checksum. One [`OrderBook`] per
//! `(provider, symbol)`; the caller owns that keying.

mod assembler;
mod checksum;
mod error;
mod normalise;

pub use assembler::{BookSnapshot, DiffInput, OrderBook, RawLevel, SnapshotInput};
pub use checksum::compute_checksum;
pub use error::BookError;
pub use normalise::normalise_decimal;
