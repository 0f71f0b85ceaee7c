//! Venue connectivity: implements [`kestrel_control::AdapterHandle`] against a Binance-like
//! exchange — public market-data websockets (depth/trade/ticker), a private user-data stream,
//! REST order submission, and instrument-metadata polling. Every parsed payload passes through a
//! shared [`EventPipeline`], so sequencing and fan-out behave identically regardless of which
//! stream produced the event.

mod catalogue;
pub mod config;
mod depth_stream;
pub mod error;
mod market_stream;
mod pipeline;
pub mod rest;
pub mod signing;
mod user_data;
pub mod wire;
mod ws;

pub use catalogue::{InstrumentCatalogue, InstrumentMetadata};
pub use config::AdapterConfig;
pub use error::AdapterError;
pub use pipeline::EventPipeline;
pub use rest::RestClient;

use async_trait::async_trait;
use kestrel_bus::{DataBus, DispatchTable};
use kestrel_control::{AdapterHandle, ControlError, SubmitOrderCommand};
use kestrel_schema::{CanonicalType, EventType, Payload, ProviderId, Route, Symbol};
use kestrel_stream::OrderingManager;
use market_stream::{MarketStream, Topics};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use wire::ExecutionReportFrame;

/// The last known state of every client order id this adapter has seen, populated from both
/// submit-order responses and user-data execution reports. Backs `AdapterHandle::query_order`
/// without round-tripping to the venue for orders already tracked in memory.
#[derive(Debug, Default, Clone)]
pub struct OrderStore {
    inner: Arc<Mutex<HashMap<String, serde_json::Value>>>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, client_order_id: &str, report: &ExecutionReportFrame) {
        if let Ok(value) = serde_json::to_value(report) {
            self.inner.lock().insert(client_order_id.to_string(), value);
        }
    }

    fn record_value(&self, client_order_id: &str, value: serde_json::Value) {
        self.inner.lock().insert(client_order_id.to_string(), value);
    }

    fn get(&self, client_order_id: &str) -> Option<serde_json::Value> {
        self.inner.lock().get(client_order_id).cloned()
    }
}

/// A spawned stream task, aborted on drop so tearing down routing actually stops the socket.
struct TrackedTask {
    handle: JoinHandle<()>,
}

impl Drop for TrackedTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Binance-like venue adapter. One instance per provider; owns every live stream plus the REST
/// client used for seeding, order submission, and instrument metadata.
pub struct BinanceAdapter {
    config: AdapterConfig,
    rest: Arc<RestClient>,
    pipeline: Arc<EventPipeline>,
    orders: OrderStore,
    catalogue: RwLock<Option<InstrumentCatalogue>>,
    depth_tasks: Mutex<HashMap<Symbol, TrackedTask>>,
    market_tasks: Mutex<HashMap<Symbol, (Topics, TrackedTask)>>,
    user_data_task: Mutex<Option<TrackedTask>>,
    _flush_task: TrackedTask,
}

impl std::fmt::Debug for BinanceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceAdapter").field("provider", &self.config.provider).finish()
    }
}

impl BinanceAdapter {
    pub fn new(config: AdapterConfig, dispatch: Arc<DispatchTable>, bus: Arc<DataBus>) -> Result<Self, AdapterError> {
        let rest = Arc::new(RestClient::new(config.clone())?);
        let pipeline = Arc::new(EventPipeline::new(dispatch, bus, OrderingManager::default()));

        let flush_pipeline = Arc::clone(&pipeline);
        let flush_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(25));
            loop {
                ticker.tick().await;
                flush_pipeline.flush(std::time::Instant::now());
            }
        });

        Ok(Self {
            config,
            rest,
            pipeline,
            orders: OrderStore::new(),
            catalogue: RwLock::new(None),
            depth_tasks: Mutex::new(HashMap::new()),
            market_tasks: Mutex::new(HashMap::new()),
            user_data_task: Mutex::new(None),
            _flush_task: TrackedTask { handle: flush_task },
        })
    }

    fn route_symbols(route: &Route) -> Vec<Symbol> {
        route.instrument_filters().filter_map(|raw| Symbol::parse(raw).ok()).collect()
    }

    fn spawn_depth(&self, symbol: Symbol) {
        let mut tasks = self.depth_tasks.lock();
        if tasks.contains_key(&symbol) {
            return;
        }
        let stream = depth_stream::DepthStream::new(self.config.clone(), Arc::clone(&self.rest), Arc::clone(&self.pipeline), symbol.clone());
        let handle = tokio::spawn(stream.run());
        tasks.insert(symbol, TrackedTask { handle });
    }

    /// Add or widen the topic set for `symbol`'s market stream, restarting it if the set changed.
    fn spawn_market(&self, symbol: Symbol, mutate: impl Fn(&mut Topics)) {
        let mut tasks = self.market_tasks.lock();
        let mut topics = tasks.get(&symbol).map(|(t, _)| *t).unwrap_or_default();
        let before = topics;
        mutate(&mut topics);
        if topics == before {
            return;
        }
        tasks.remove(&symbol);

        let stream = MarketStream::new(self.config.clone(), Arc::clone(&self.pipeline), symbol.clone(), topics);
        let handle = tokio::spawn(stream.run());
        tasks.insert(symbol, (topics, TrackedTask { handle }));
    }

    /// Narrow every live market stream's topic set, tearing down streams left with nothing to carry.
    fn clear_market_topic(&self, clear: impl Fn(&mut Topics)) {
        let mut tasks = self.market_tasks.lock();
        let symbols: Vec<Symbol> = tasks.keys().cloned().collect();
        for symbol in symbols {
            let (mut topics, _) = tasks.remove(&symbol).expect("key came from this map");
            clear(&mut topics);
            if topics.is_empty() {
                continue;
            }
            let stream = MarketStream::new(self.config.clone(), Arc::clone(&self.pipeline), symbol.clone(), topics);
            let handle = tokio::spawn(stream.run());
            tasks.insert(symbol, (topics, TrackedTask { handle }));
        }
    }

    fn ensure_user_data_task(&self) {
        let mut slot = self.user_data_task.lock();
        if slot.is_some() {
            return;
        }
        if !self.config.is_authenticated() {
            warn!("EXECUTION.REPORT/BALANCE.UPDATE routed without api credentials configured; user-data stream not started");
            return;
        }
        let stream = user_data::UserDataStream::new(self.config.clone(), Arc::clone(&self.rest), Arc::clone(&self.pipeline), self.orders.clone());
        let handle = tokio::spawn(stream.run());
        *slot = Some(TrackedTask { handle });
    }

    async fn refresh_catalogue_and_publish(&self, symbols: &[Symbol]) -> Result<(), AdapterError> {
        let catalogue = InstrumentCatalogue::refresh(&self.rest).await?;
        for symbol in symbols {
            let wire_symbol = symbol.as_str().replace('-', "").to_uppercase();
            if let Some(metadata) = catalogue.get(&wire_symbol) {
                self.pipeline.emit(
                    self.config.provider,
                    symbol.clone(),
                    EventType::InstrumentUpdate,
                    None,
                    Payload::InstrumentUpdate {
                        status: metadata.status.clone(),
                        tick_size: metadata.tick_size,
                        step_size: metadata.step_size,
                        min_qty: metadata.min_qty,
                        max_qty: metadata.max_qty,
                        min_notional: metadata.min_notional,
                    },
                );
            }
        }
        info!(instruments = catalogue.len(), "instrument catalogue refreshed");
        *self.catalogue.write() = Some(catalogue);
        Ok(())
    }
}

#[async_trait]
impl AdapterHandle for BinanceAdapter {
    async fn subscribe_route(&self, route: &Route) -> Result<(), ControlError> {
        if route.provider != self.config.provider {
            return Ok(());
        }
        let symbols = Self::route_symbols(route);

        match route.canonical_type.as_str() {
            "TRADE" => {
                for symbol in symbols {
                    self.spawn_market(symbol, |t| t.trade = true);
                }
            }
            "TICKER" => {
                for symbol in symbols {
                    self.spawn_market(symbol, |t| t.ticker = true);
                }
            }
            "ORDERBOOK.SNAPSHOT" | "ORDERBOOK.UPDATE" => {
                for symbol in symbols {
                    self.spawn_depth(symbol);
                }
            }
            "EXECUTION.REPORT" | "BALANCE.UPDATE" => self.ensure_user_data_task(),
            "INSTRUMENT.UPDATE" => self
                .refresh_catalogue_and_publish(&symbols)
                .await
                .map_err(ControlError::from)?,
            _ => {}
        }
        Ok(())
    }

    async fn unsubscribe_route(&self, provider: ProviderId, canonical_type: &CanonicalType) -> Result<(), ControlError> {
        if provider != self.config.provider {
            return Ok(());
        }

        match canonical_type.as_str() {
            "TRADE" => self.clear_market_topic(|t| t.trade = false),
            "TICKER" => self.clear_market_topic(|t| t.ticker = false),
            "ORDERBOOK.SNAPSHOT" | "ORDERBOOK.UPDATE" => self.depth_tasks.lock().clear(),
            "EXECUTION.REPORT" | "BALANCE.UPDATE" => {
                self.user_data_task.lock().take();
            }
            _ => {}
        }
        Ok(())
    }

    async fn submit_order(&self, order: &SubmitOrderCommand) -> Result<serde_json::Value, ControlError> {
        if order.provider != self.config.provider {
            return Err(ControlError::AdapterRejected(format!("adapter does not handle provider {}", order.provider)));
        }
        let response = self.rest.submit_order(order).await.map_err(ControlError::from)?;
        let value = serde_json::to_value(&response).map_err(|err| ControlError::AdapterRejected(err.to_string()))?;
        self.orders.record_value(&order.client_order_id, value.clone());
        Ok(value)
    }

    async fn query_order(&self, provider: ProviderId, client_order_id: &str) -> Result<serde_json::Value, ControlError> {
        if provider != self.config.provider {
            return Err(ControlError::UnknownOrder { client_order_id: client_order_id.to_string() });
        }
        if let Some(value) = self.orders.get(client_order_id) {
            return Ok(value);
        }
        Err(ControlError::UnknownOrder { client_order_id: client_order_id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_store_round_trips_a_value() {
        let store = OrderStore::new();
        store.record_value("abc123", serde_json::json!({"status": "NEW"}));
        assert_eq!(store.get("abc123"), Some(serde_json::json!({"status": "NEW"})));
        assert_eq!(store.get("missing"), None);
    }

    #[test]
    fn market_stream_topics_is_empty_by_default() {
        let topics = Topics::default();
        assert!(topics.is_empty());
    }
}
