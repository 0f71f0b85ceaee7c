//! Wires a parsed payload through the publisher (C6), the per-stream ordering buffer (C4), and
//! onto the data bus (C7) — the path every market-data frame this adapter parses takes before a
//! subscriber ever sees it.

use chrono::{DateTime, Utc};
use kestrel_bus::{DataBus, DispatchTable, Publisher};
use kestrel_schema::{Event, EventType, Payload, ProviderId, Symbol};
use kestrel_stream::OrderingManager;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug)]
pub struct EventPipeline {
    dispatch: Arc<DispatchTable>,
    bus: Arc<DataBus>,
    publisher: Publisher,
    ordering: Mutex<OrderingManager>,
}

impl EventPipeline {
    pub fn new(dispatch: Arc<DispatchTable>, bus: Arc<DataBus>, ordering: OrderingManager) -> Self {
        Self {
            dispatch,
            bus,
            publisher: Publisher::new(),
            ordering: Mutex::new(ordering),
        }
    }

    /// Stamp `payload` into an [`Event`] and push it through the ordering buffer, publishing
    /// whatever that buffer judges ready. A lone in-order event is published immediately; a
    /// reordered pair publishes together once its gap closes.
    pub fn emit(
        &self,
        provider: ProviderId,
        symbol: Symbol,
        event_type: EventType,
        ingest_ts: Option<DateTime<Utc>>,
        payload: Payload,
    ) {
        let event = self
            .publisher
            .publish(provider, symbol, event_type, self.dispatch.version(), ingest_ts, payload);

        let (ready, _buffered) = self.ordering.lock().on_event(event);
        for event in ready {
            self.bus.publish(&event);
        }
    }

    /// Release anything aged past its stream's lateness tolerance. Call on a fixed interval from
    /// a supervisor task; a stream with nothing pending is a no-op.
    pub fn flush(&self, now: Instant) {
        let ready = self.ordering.lock().flush_all(now);
        for event in ready {
            self.bus.publish(&event);
        }
    }

    pub fn dispatch(&self) -> &Arc<DispatchTable> {
        &self.dispatch
    }

    pub fn bus(&self) -> &Arc<DataBus> {
        &self.bus
    }
}
