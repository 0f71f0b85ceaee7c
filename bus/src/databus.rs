//! In-memory fan-out of canonical events to subscribers, keyed by [`EventType`].

use kestrel_schema::{Event, EventType};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Default per-subscriber queue depth.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 1024;

/// Identifies a live subscription. Unique for the lifetime of the owning [`DataBus`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SubscriberId(u64);

struct Subscription {
    id: SubscriberId,
    event_type: EventType,
    capacity: usize,
    queue: Mutex<VecDeque<Event>>,
    notify: Notify,
    dropped: AtomicU64,
    closed: AtomicBool,
}

impl Subscription {
    fn try_deliver(&self, event: &Event) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }

        let mut queue = self.queue.lock();
        if queue.len() < self.capacity {
            queue.push_back(event.clone());
            drop(queue);
            self.notify.notify_one();
            return;
        }

        if event.event_type.is_coalescable() {
            if let Some(slot) = queue
                .iter_mut()
                .rev()
                .find(|queued| queued.provider == event.provider && queued.symbol == event.symbol)
            {
                *slot = event.clone();
                drop(queue);
                self.dropped.fetch_add(1, Ordering::Relaxed);
                self.notify.notify_one();
                return;
            }
        }

        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }
}

/// The receiving half of a subscription. Not `Clone` — one `Subscriber` per consumer task.
#[derive(Debug)]
pub struct Subscriber {
    id: SubscriberId,
    event_type: EventType,
    inner: Arc<SubscriptionHandle>,
}

/// Shared handle kept alive by both the bus and the [`Subscriber`], so `unsubscribe` can close
/// the queue out from under a consumer that is mid-`recv`.
struct SubscriptionHandle(Subscription);

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.0.id)
            .field("event_type", &self.0.event_type)
            .field("dropped", &self.0.dropped.load(Ordering::Relaxed))
            .finish()
    }
}

impl Subscriber {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Await the next event for this subscription. Returns `None` once the bus closes it via
    /// [`DataBus::unsubscribe`].
    pub async fn recv(&self) -> Option<Event> {
        loop {
            {
                let mut queue = self.inner.0.queue.lock();
                if let Some(event) = queue.pop_front() {
                    return Some(event);
                }
                if self.inner.0.closed.load(Ordering::Acquire) {
                    return None;
                }
            }
            self.inner.0.notify.notified().await;
        }
    }

    /// Events dropped for this subscriber since it was created.
    pub fn dropped_count(&self) -> u64 {
        self.inner.0.dropped.load(Ordering::Relaxed)
    }
}

/// Fan-out bus. `publish` never blocks: a full subscriber queue drops the event for that
/// subscriber only (coalescing it in place when the type permits), counted but never fatal.
#[derive(Debug, Default)]
pub struct DataBus {
    next_id: AtomicU64,
    by_type: RwLock<HashMap<EventType, Vec<Arc<SubscriptionHandle>>>>,
}

impl DataBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, event_type: EventType) -> Subscriber {
        self.subscribe_with_capacity(event_type, DEFAULT_SUBSCRIBER_CAPACITY)
    }

    pub fn subscribe_with_capacity(&self, event_type: EventType, capacity: usize) -> Subscriber {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let handle = Arc::new(SubscriptionHandle(Subscription {
            id,
            event_type,
            capacity,
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }));

        self.by_type
            .write()
            .entry(event_type)
            .or_default()
            .push(Arc::clone(&handle));

        Subscriber {
            id,
            event_type,
            inner: handle,
        }
    }

    pub fn unsubscribe(&self, subscriber: &Subscriber) {
        let mut by_type = self.by_type.write();
        if let Some(subs) = by_type.get_mut(&subscriber.event_type) {
            subs.retain(|handle| handle.0.id != subscriber.id);
        }
        subscriber.inner.0.close();
    }

    /// Clone `event` to every subscriber of its `event_type`. Copy-on-write: the subscriber
    /// list for the type is cloned (cheap `Arc` bumps) under a brief read lock, then iterated
    /// without holding it.
    pub fn publish(&self, event: &Event) {
        let targets = {
            let by_type = self.by_type.read();
            by_type.get(&event.event_type).cloned().unwrap_or_default()
        };
        for handle in &targets {
            handle.0.try_deliver(event);
        }
    }

    /// Total (subscriber, type, dropped-count) triples, for telemetry export.
    pub fn drop_counts(&self) -> Vec<(SubscriberId, EventType, u64)> {
        self.by_type
            .read()
            .values()
            .flatten()
            .map(|handle| (handle.0.id, handle.0.event_type, handle.0.dropped.load(Ordering::Relaxed)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kestrel_schema::{Payload, ProviderId, Symbol};
    use rust_decimal::Decimal;

    fn trade_event(symbol: &str, seq: u64) -> Event {
        let symbol = Symbol::parse(symbol).unwrap();
        let now = Utc::now();
        Event {
            event_id: kestrel_schema::event::build_event_id(ProviderId::Mock, &symbol, EventType::Trade, seq),
            routing_version: 1,
            provider: ProviderId::Mock,
            symbol,
            event_type: EventType::Trade,
            seq_provider: seq,
            ingest_ts: now,
            emit_ts: now,
            payload: Payload::Trade {
                trade_id: seq.to_string(),
                side: kestrel_schema::Side::Buy,
                price: Decimal::ONE,
                quantity: Decimal::ONE,
                timestamp: now,
            },
        }
    }

    fn ticker_event(symbol: &str, seq: u64) -> Event {
        let symbol = Symbol::parse(symbol).unwrap();
        let now = Utc::now();
        Event {
            event_id: kestrel_schema::event::build_event_id(ProviderId::Mock, &symbol, EventType::Ticker, seq),
            routing_version: 1,
            provider: ProviderId::Mock,
            symbol,
            event_type: EventType::Ticker,
            seq_provider: seq,
            ingest_ts: now,
            emit_ts: now,
            payload: Payload::Ticker {
                last_price: Decimal::ONE,
                bid_price: Decimal::ONE,
                ask_price: Decimal::ONE,
                volume_24h: Decimal::ONE,
                timestamp: now,
            },
        }
    }

    #[tokio::test]
    async fn a_subscriber_receives_published_events_of_its_type() {
        let bus = DataBus::new();
        let subscriber = bus.subscribe(EventType::Trade);

        bus.publish(&trade_event("BTC-USDT", 1));

        let received = subscriber.recv().await.unwrap();
        assert_eq!(received.seq_provider, 1);
    }

    #[tokio::test]
    async fn unrelated_types_are_not_delivered() {
        let bus = DataBus::new();
        let subscriber = bus.subscribe(EventType::Trade);

        bus.publish(&ticker_event("BTC-USDT", 1));

        assert_eq!(subscriber.dropped_count(), 0);
        // Nothing queued: draining with a timeout would hang, so just check the queue directly
        // via a second, immediate publish of the subscribed type landing first.
        bus.publish(&trade_event("BTC-USDT", 2));
        let received = subscriber.recv().await.unwrap();
        assert_eq!(received.seq_provider, 2);
    }

    #[tokio::test]
    async fn a_full_queue_drops_non_coalescable_events() {
        let bus = DataBus::new();
        let subscriber = bus.subscribe_with_capacity(EventType::Trade, 1);

        bus.publish(&trade_event("BTC-USDT", 1));
        bus.publish(&trade_event("BTC-USDT", 2));

        assert_eq!(subscriber.dropped_count(), 1);
        let received = subscriber.recv().await.unwrap();
        assert_eq!(received.seq_provider, 1);
    }

    #[tokio::test]
    async fn a_full_queue_coalesces_ticker_updates_for_the_same_symbol() {
        let bus = DataBus::new();
        let subscriber = bus.subscribe_with_capacity(EventType::Ticker, 1);

        bus.publish(&ticker_event("BTC-USDT", 1));
        bus.publish(&ticker_event("BTC-USDT", 2));

        let received = subscriber.recv().await.unwrap();
        assert_eq!(received.seq_provider, 2, "the newer ticker replaces the undelivered one");
    }

    #[tokio::test]
    async fn unsubscribe_closes_the_queue() {
        let bus = DataBus::new();
        let subscriber = bus.subscribe(EventType::Trade);
        bus.unsubscribe(&subscriber);

        assert!(subscriber.recv().await.is_none());
    }
}
