//! Typed connection settings for a single venue. Built by the caller (the gateway binary reads
//! these from the environment); this crate never parses `std::env` itself so it stays usable from
//! tests and from embedders with their own configuration story.

use kestrel_schema::ProviderId;
use std::time::Duration;
use url::Url;

/// Default REST base URL for Binance spot.
pub const DEFAULT_REST_BASE_URL: &str = "https://api.binance.com";
/// Default public market-data websocket base.
pub const DEFAULT_WS_PUBLIC_URL: &str = "wss://stream.binance.com:9443";
/// Default private (user-data) websocket base.
pub const DEFAULT_WS_PRIVATE_URL: &str = "wss://stream.binance.com:9443";

/// Interval at which the user-data stream's listen key is refreshed. Binance expires an unused
/// key after 60 minutes; we ping well inside that window.
pub const DEFAULT_LISTEN_KEY_KEEPALIVE: Duration = Duration::from_secs(30 * 60);

/// Minimum spacing between outbound websocket control frames (SUBSCRIBE/UNSUBSCRIBE), per the
/// venue's stated rate limit of roughly 5 such frames per second.
pub const MIN_CONTROL_FRAME_SPACING: Duration = Duration::from_millis(220);

/// Maximum number of topics bundled into a single SUBSCRIBE/UNSUBSCRIBE frame.
pub const MAX_TOPICS_PER_FRAME: usize = 100;

#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub provider: ProviderId,
    pub rest_base_url: Url,
    pub ws_public_url: Url,
    pub ws_private_url: Url,
    pub http_timeout: Duration,
    pub ws_handshake_timeout: Duration,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    /// Depth retained per order book; `0` keeps every level (see `kestrel_book::OrderBook`).
    pub book_depth: usize,
}

impl AdapterConfig {
    /// A config pointed at Binance spot's production endpoints with no credentials. Order
    /// submission and the user-data stream will reject until `api_key`/`api_secret` are set.
    pub fn binance_spot() -> Self {
        Self {
            provider: ProviderId::BinanceSpot,
            rest_base_url: Url::parse(DEFAULT_REST_BASE_URL).expect("static URL"),
            ws_public_url: Url::parse(DEFAULT_WS_PUBLIC_URL).expect("static URL"),
            ws_private_url: Url::parse(DEFAULT_WS_PRIVATE_URL).expect("static URL"),
            http_timeout: Duration::from_secs(10),
            ws_handshake_timeout: Duration::from_secs(10),
            api_key: None,
            api_secret: None,
            book_depth: 0,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some()
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self::binance_spot()
    }
}
