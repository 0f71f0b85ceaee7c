//! Stamps canonical events with an `event_id`, a per-`(type, symbol)` monotonic sequence, and
//! ingest/emit timestamps.

use chrono::{DateTime, Utc};
use kestrel_schema::event::build_event_id;
use kestrel_schema::{Event, EventType, Payload, ProviderId, Symbol};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Assigns `seq_provider` and timestamps to freshly parsed payloads before they reach the data
/// bus. One [`Publisher`] is shared across every stream of a provider adapter.
#[derive(Debug, Default)]
pub struct Publisher {
    sequences: Mutex<HashMap<(ProviderId, Symbol, EventType), u64>>,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp a payload into a fully-formed [`Event`]. `ingest_ts` defaults to now when `None`
    /// (the "zero" sentinel in the source protocol becomes an `Option` here).
    pub fn publish(
        &self,
        provider: ProviderId,
        symbol: Symbol,
        event_type: EventType,
        routing_version: i64,
        ingest_ts: Option<DateTime<Utc>>,
        payload: Payload,
    ) -> Event {
        let seq = self.next_seq(provider, &symbol, event_type);
        let emit_ts = Utc::now();
        let ingest_ts = ingest_ts.unwrap_or(emit_ts);
        let event_id = build_event_id(provider, &symbol, event_type, seq);

        Event {
            event_id,
            routing_version,
            provider,
            symbol,
            event_type,
            seq_provider: seq,
            ingest_ts,
            emit_ts,
            payload,
        }
    }

    fn next_seq(&self, provider: ProviderId, symbol: &Symbol, event_type: EventType) -> u64 {
        let mut sequences = self.sequences.lock();
        let entry = sequences
            .entry((provider, symbol.clone(), event_type))
            .or_insert(0);
        *entry += 1;
        *entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic_per_type_and_symbol() {
        let publisher = Publisher::new();
        let symbol = Symbol::parse("BTC-USDT").unwrap();

        let first = publisher.publish(
            ProviderId::Mock,
            symbol.clone(),
            EventType::Trade,
            1,
            None,
            Payload::Ticker {
                last_price: Default::default(),
                bid_price: Default::default(),
                ask_price: Default::default(),
                volume_24h: Default::default(),
                timestamp: Utc::now(),
            },
        );
        let second = publisher.publish(
            ProviderId::Mock,
            symbol,
            EventType::Trade,
            1,
            None,
            Payload::Ticker {
                last_price: Default::default(),
                bid_price: Default::default(),
                ask_price: Default::default(),
                volume_24h: Default::default(),
                timestamp: Utc::now(),
            },
        );

        assert_eq!(first.seq_provider, 1);
        assert_eq!(second.seq_provider, 2);
        assert!(first.ingest_ts <= first.emit_ts);
        assert_eq!(first.event_id, "MOCK:BTC-USDT:TRADE:1");
    }

    #[test]
    fn sequences_are_independent_per_symbol() {
        let publisher = Publisher::new();
        let btc = Symbol::parse("BTC-USDT").unwrap();
        let eth = Symbol::parse("ETH-USDT").unwrap();

        let btc_event = publisher.publish(ProviderId::Mock, btc, EventType::Trade, 1, None, trade_payload());
        let eth_event = publisher.publish(ProviderId::Mock, eth, EventType::Trade, 1, None, trade_payload());

        assert_eq!(btc_event.seq_provider, 1);
        assert_eq!(eth_event.seq_provider, 1);
    }

    fn trade_payload() -> Payload {
        Payload::Trade {
            trade_id: "t1".to_string(),
            side: kestrel_schema::Side::Buy,
            price: Default::default(),
            quantity: Default::default(),
            timestamp: Utc::now(),
        }
    }
}
