//! Errors surfaced by the venue transport: malformed wire data, a venue that is temporarily
//! unreachable, and the order-book resync conditions re-exported from `kestrel-book`.

use kestrel_book::BookError;
use kestrel_control::ControlError;

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("invalid {what}: {reason}")]
    Invalid { what: String, reason: String },

    #[error("venue unavailable: {0}")]
    Unavailable(String),

    #[error("book out of sync for {symbol}")]
    OutOfSync { symbol: String },

    #[error("checksum mismatch for {symbol}")]
    ChecksumMismatch { symbol: String },

    #[error("network transport error: {0}")]
    Network(String),

    #[error("rest request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("websocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("failed to decode venue payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Book(#[from] BookError),

    #[error("no client_order_id {client_order_id} known to this adapter")]
    UnknownOrder { client_order_id: String },
}

impl AdapterError {
    pub fn invalid(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            what: what.into(),
            reason: reason.into(),
        }
    }

    pub fn from_book(symbol: &str, err: BookError) -> Self {
        match err {
            BookError::OutOfSync => Self::OutOfSync { symbol: symbol.to_string() },
            BookError::ChecksumMismatch { .. } => Self::ChecksumMismatch { symbol: symbol.to_string() },
            other => Self::Book(other),
        }
    }
}

/// The seam between `kestrel-adapter`'s own error type and the control plane's. An
/// [`AdapterError::UnknownOrder`] maps to `ControlError::UnknownOrder` so a `QueryOrder` command
/// for an order we never saw fails distinctly from a generic rejection; everything else becomes
/// an `AdapterRejected` with the error's own message.
impl From<AdapterError> for ControlError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::UnknownOrder { client_order_id } => ControlError::UnknownOrder { client_order_id },
            other => ControlError::AdapterRejected(other.to_string()),
        }
    }
}
