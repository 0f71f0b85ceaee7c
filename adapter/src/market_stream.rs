//! Trade/ticker stream: `Connecting → Streaming → Backoff`. Unlike the depth stream there is no
//! REST seeding or gap detection — every frame is self-contained, so reconnecting just means
//! resubscribing to the same topic set.

use crate::config::AdapterConfig;
use crate::error::AdapterError;
use crate::pipeline::EventPipeline;
use crate::wire::{CombinedEnvelope, MarketFrame};
use crate::ws::WsConnection;
use kestrel_schema::{EventType, Payload, Side, Symbol};
use rand::Rng;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Which canonical types this stream currently carries for a given symbol.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct Topics {
    pub trade: bool,
    pub ticker: bool,
}

impl Topics {
    pub fn is_empty(&self) -> bool {
        !self.trade && !self.ticker
    }

    fn wire_topics(&self, wire_symbol: &str) -> Vec<String> {
        let mut topics = Vec::new();
        let lower = wire_symbol.to_lowercase();
        if self.trade {
            topics.push(format!("{lower}@trade"));
        }
        if self.ticker {
            topics.push(format!("{lower}@ticker"));
        }
        topics
    }
}

pub struct MarketStream {
    config: AdapterConfig,
    pipeline: Arc<EventPipeline>,
    symbol: Symbol,
    wire_symbol: String,
    topics: Topics,
}

impl MarketStream {
    pub fn new(config: AdapterConfig, pipeline: Arc<EventPipeline>, symbol: Symbol, topics: Topics) -> Self {
        let wire_symbol = symbol.as_str().replace('-', "").to_uppercase();
        Self { config, pipeline, symbol, wire_symbol, topics }
    }

    pub async fn run(self) {
        let mut backoff = Duration::from_millis(250);
        loop {
            match self.connect_and_stream().await {
                Ok(()) => backoff = Duration::from_millis(250),
                Err(err) => warn!(symbol = %self.symbol, error = %err, "market stream reconnecting"),
            }
            let jitter = rand::rng().random_range(0..100);
            tokio::time::sleep(backoff + Duration::from_millis(jitter)).await;
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }

    async fn connect_and_stream(&self) -> Result<(), AdapterError> {
        let url = self.config.ws_public_url.join("/stream").expect("static path");
        let mut conn = WsConnection::connect(&url, self.config.ws_handshake_timeout).await?;
        conn.subscribe(&self.topics.wire_topics(&self.wire_symbol)).await?;

        loop {
            let Some(raw) = conn.next_text().await? else {
                return Ok(());
            };
            let Ok(envelope) = serde_json::from_str::<CombinedEnvelope<MarketFrame>>(&raw) else {
                continue;
            };

            match envelope.data {
                MarketFrame::Trade(frame) | MarketFrame::AggTrade(frame) => {
                    let price = Decimal::from_str(&frame.p).unwrap_or_default();
                    let quantity = Decimal::from_str(&frame.q).unwrap_or_default();
                    self.pipeline.emit(
                        self.config.provider,
                        self.symbol.clone(),
                        EventType::Trade,
                        Some(crate::wire::millis_to_datetime(frame.trade_time)),
                        Payload::Trade {
                            trade_id: frame.trade_id.to_string(),
                            side: if frame.m { Side::Sell } else { Side::Buy },
                            price,
                            quantity,
                            timestamp: crate::wire::millis_to_datetime(frame.trade_time),
                        },
                    );
                }
                MarketFrame::Ticker(frame) => {
                    self.pipeline.emit(
                        self.config.provider,
                        self.symbol.clone(),
                        EventType::Ticker,
                        Some(crate::wire::millis_to_datetime(frame.event_time)),
                        Payload::Ticker {
                            last_price: Decimal::from_str(&frame.c).unwrap_or_default(),
                            bid_price: Decimal::from_str(&frame.b).unwrap_or_default(),
                            ask_price: Decimal::from_str(&frame.a).unwrap_or_default(),
                            volume_24h: Decimal::from_str(&frame.v).unwrap_or_default(),
                            timestamp: crate::wire::millis_to_datetime(frame.event_time),
                        },
                    );
                }
                MarketFrame::DepthUpdate(_) => {}
            }
        }
    }
}
