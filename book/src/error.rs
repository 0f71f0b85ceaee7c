use thiserror::Error;

/// Errors raised by the order-book assembler.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum BookError {
    /// A computed CRC32/IEEE checksum did not match the venue-supplied one.
    #[error("checksum mismatch: expected {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// A diff's `first_update_id` left a gap after `last_seq`.
    #[error("order book out of sync")]
    OutOfSync,

    /// A price or quantity string on an incoming level could not be parsed as a decimal.
    #[error("invalid price level (price={price:?}, quantity={quantity:?})")]
    InvalidLevel { price: String, quantity: String },
}

impl BookError {
    /// `true` for the two error kinds the spec treats identically: both force the owning stream
    /// to close its connection and reseed from a fresh REST snapshot.
    pub fn triggers_resync(&self) -> bool {
        matches!(self, Self::ChecksumMismatch { .. } | Self::OutOfSync)
    }
}
