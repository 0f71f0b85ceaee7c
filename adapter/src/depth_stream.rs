//! Depth-stream state machine: `Connecting → Subscribed → Seeded → Streaming`, with `Resync` and
//! `Backoff` excursions on the failure conditions `kestrel-book` flags. One of these runs per
//! `(provider, symbol)` that has `ORDERBOOK.SNAPSHOT`/`ORDERBOOK.UPDATE` routed to it.

use crate::config::AdapterConfig;
use crate::error::AdapterError;
use crate::pipeline::EventPipeline;
use crate::rest::RestClient;
use crate::ws::WsConnection;
use kestrel_book::{BookUpdateType, DiffInput, OrderBook, SnapshotInput};
use kestrel_pool::Pool;
use kestrel_schema::{EventType, Payload, PriceLevel, Symbol};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const MAX_BACKOFF: Duration = Duration::from_secs(30);
const DEPTH_LEVELS_PER_SNAPSHOT_REQUEST: u32 = 1000;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum State {
    Connecting,
    Subscribed,
    Seeded,
    Streaming,
    Resync,
    Backoff,
}

/// Reused staging buffer for the raw text of one frame, bounding the per-message allocation
/// churn on this stream's hot path rather than eliminating it outright.
struct FrameScratch {
    text: String,
}

pub struct DepthStream {
    config: AdapterConfig,
    rest: Arc<RestClient>,
    pipeline: Arc<EventPipeline>,
    symbol: Symbol,
    wire_symbol: String,
    book: OrderBook,
    scratch: Pool<FrameScratch>,
}

impl DepthStream {
    pub fn new(config: AdapterConfig, rest: Arc<RestClient>, pipeline: Arc<EventPipeline>, symbol: Symbol) -> Self {
        let wire_symbol = symbol.as_str().replace('-', "").to_uppercase();
        let depth = config.book_depth;
        Self {
            config,
            rest,
            pipeline,
            symbol,
            wire_symbol,
            book: OrderBook::new(depth),
            scratch: Pool::with_reset(4, || FrameScratch { text: String::new() }, |s| s.text.clear()),
        }
    }

    pub async fn run(mut self) {
        let mut state = State::Connecting;
        let mut backoff = Duration::from_millis(250);

        loop {
            state = match state {
                State::Connecting => match self.connect_and_subscribe().await {
                    Ok(conn) => {
                        backoff = Duration::from_millis(250);
                        match self.seed_and_stream(conn).await {
                            Ok(()) => State::Backoff,
                            Err(AdapterError::OutOfSync { .. }) | Err(AdapterError::ChecksumMismatch { .. }) => State::Resync,
                            Err(err) => {
                                warn!(symbol = %self.symbol, error = %err, "depth stream failed");
                                State::Backoff
                            }
                        }
                    }
                    Err(err) => {
                        warn!(symbol = %self.symbol, error = %err, "failed to connect depth stream");
                        State::Backoff
                    }
                },
                State::Subscribed | State::Seeded | State::Streaming => State::Connecting,
                State::Resync => {
                    self.book = OrderBook::new(self.config.book_depth);
                    State::Connecting
                }
                State::Backoff => {
                    let jitter = rand::rng().random_range(0..100);
                    tokio::time::sleep(backoff + Duration::from_millis(jitter)).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    State::Connecting
                }
            };
        }
    }

    async fn connect_and_subscribe(&self) -> Result<WsConnection, AdapterError> {
        let url = self.config.ws_public_url.join("/stream").expect("static path");
        let mut conn = WsConnection::connect(&url, self.config.ws_handshake_timeout).await?;
        let topic = format!("{}@depth@100ms", self.wire_symbol.to_lowercase());
        conn.subscribe(&[topic]).await?;
        info!(symbol = %self.symbol, "depth stream subscribed");
        Ok(conn)
    }

    /// Drive one connection: consume the control ack, buffer diffs until a REST snapshot seeds
    /// the book, then republish every applied diff as an `ORDERBOOK.UPDATE`.
    async fn seed_and_stream(&mut self, mut conn: WsConnection) -> Result<(), AdapterError> {
        let snapshot = self.rest.depth_snapshot(&self.wire_symbol, DEPTH_LEVELS_PER_SNAPSHOT_REQUEST).await?;
        let book_snapshot = self
            .book
            .apply_snapshot(
                snapshot.last_update_id,
                SnapshotInput {
                    bids: snapshot.bids,
                    asks: snapshot.asks,
                    checksum: None,
                },
            )
            .map_err(|err| AdapterError::from_book(self.symbol.as_str(), err))?;
        info!(symbol = %self.symbol, last_seq = book_snapshot.last_seq, "depth stream seeded");

        self.pipeline.emit(
            self.config.provider,
            self.symbol.clone(),
            EventType::BookSnapshot,
            None,
            Payload::BookSnapshot {
                bids: to_price_levels(&book_snapshot.bids),
                asks: to_price_levels(&book_snapshot.asks),
                checksum: None,
                last_update: self.book.last_update_ts(),
                first_update_id: book_snapshot.last_seq,
                final_update_id: book_snapshot.last_seq,
            },
        );

        loop {
            let mut scratch = self
                .scratch
                .acquire_within(Duration::from_millis(50))
                .map_err(|err| AdapterError::Unavailable(err.to_string()))?;

            let Some(raw) = conn.next_text().await? else {
                return Ok(());
            };
            scratch.text.push_str(&raw);

            let envelope: crate::wire::CombinedEnvelope<crate::wire::MarketFrame> = match serde_json::from_str(&scratch.text) {
                Ok(envelope) => envelope,
                Err(_) => continue, // control acks and unrelated frames don't match this shape
            };

            let crate::wire::MarketFrame::DepthUpdate(frame) = envelope.data else {
                continue;
            };

            let diff = DiffInput {
                first_update_id: frame.first_update_id,
                final_update_id: frame.final_update_id,
                bids: frame.b,
                asks: frame.a,
                checksum: None,
            };

            let (snapshot, applied) = self
                .book
                .apply_diff(diff)
                .map_err(|err| AdapterError::from_book(self.symbol.as_str(), err))?;

            if applied {
                self.pipeline.emit(
                    self.config.provider,
                    self.symbol.clone(),
                    EventType::BookUpdate,
                    None,
                    Payload::BookUpdate {
                        update_type: BookUpdateType::Delta,
                        bids: to_price_levels(&snapshot.bids),
                        asks: to_price_levels(&snapshot.asks),
                        checksum: None,
                    },
                );
            }
        }
    }
}

fn to_price_levels(levels: &[(rust_decimal::Decimal, rust_decimal::Decimal)]) -> Vec<PriceLevel> {
    levels.iter().map(|(p, q)| PriceLevel::new(p.normalize().to_string(), q.normalize().to_string())).collect()
}
