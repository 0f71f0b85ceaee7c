//! The canonical [`Event`] envelope and its [`Payload`] variants.

use crate::error::SchemaError;
use crate::provider::ProviderId;
use crate::route::CanonicalType;
use crate::side::Side;
use crate::instrument::Symbol;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The canonical event type. Every variant has a fixed, compile-time coalescable-ness (see
/// [`EventType::is_coalescable`]) — consumers must treat this table as authoritative rather than
/// re-deriving it from payload shape.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum EventType {
    Trade,
    Ticker,
    BookSnapshot,
    BookUpdate,
    ExecReport,
    BalanceUpdate,
    KlineSummary,
    InstrumentUpdate,
    ControlAck,
    ControlResult,
}

impl EventType {
    /// The dotted canonical-type string used in `event_id`s and dispatch-table keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trade => "TRADE",
            Self::Ticker => "TICKER",
            Self::BookSnapshot => "ORDERBOOK.SNAPSHOT",
            Self::BookUpdate => "ORDERBOOK.UPDATE",
            Self::ExecReport => "EXECUTION.REPORT",
            Self::BalanceUpdate => "BALANCE.UPDATE",
            Self::KlineSummary => "KLINE.SUMMARY",
            Self::InstrumentUpdate => "INSTRUMENT.UPDATE",
            Self::ControlAck => "CONTROL.ACK",
            Self::ControlResult => "CONTROL.RESULT",
        }
    }

    /// Only [`Ticker`](Self::Ticker) and [`KlineSummary`](Self::KlineSummary) may have an
    /// undelivered predecessor replaced in a subscriber's queue under backpressure; every other
    /// type is strictly delivered.
    pub fn is_coalescable(&self) -> bool {
        matches!(self, Self::Ticker | Self::KlineSummary)
    }

    pub fn as_canonical_type(&self) -> CanonicalType {
        CanonicalType::parse(self.as_str()).expect("EventType::as_str is always a valid CanonicalType")
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TRADE" => Ok(Self::Trade),
            "TICKER" => Ok(Self::Ticker),
            "ORDERBOOK.SNAPSHOT" => Ok(Self::BookSnapshot),
            "ORDERBOOK.UPDATE" => Ok(Self::BookUpdate),
            "EXECUTION.REPORT" => Ok(Self::ExecReport),
            "BALANCE.UPDATE" => Ok(Self::BalanceUpdate),
            "KLINE.SUMMARY" => Ok(Self::KlineSummary),
            "INSTRUMENT.UPDATE" => Ok(Self::InstrumentUpdate),
            "CONTROL.ACK" => Ok(Self::ControlAck),
            "CONTROL.RESULT" => Ok(Self::ControlResult),
            other => Err(SchemaError::InvalidCanonicalType {
                kind: other.to_string(),
                reason: "not a recognised EventType".to_string(),
            }),
        }
    }
}

/// A single price/quantity pair in an order-book payload, always carried as decimal strings —
/// never binary floats — so the book assembler can reparse with arbitrary precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: String,
    pub quantity: String,
}

impl PriceLevel {
    pub fn new(price: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            price: price.into(),
            quantity: quantity.into(),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum BookUpdateType {
    Delta,
    Snapshot,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum ExecState {
    Ack,
    Partial,
    Filled,
    Cancelled,
    Rejected,
    Expired,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
}

/// Every shape a canonical [`Event`] can carry. Exactly one variant corresponds to each
/// [`EventType`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Payload {
    BookSnapshot {
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
        checksum: Option<u32>,
        last_update: DateTime<Utc>,
        first_update_id: u64,
        final_update_id: u64,
    },
    BookUpdate {
        update_type: BookUpdateType,
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
        checksum: Option<u32>,
    },
    Trade {
        trade_id: String,
        side: Side,
        price: Decimal,
        quantity: Decimal,
        timestamp: DateTime<Utc>,
    },
    Ticker {
        last_price: Decimal,
        bid_price: Decimal,
        ask_price: Decimal,
        volume_24h: Decimal,
        timestamp: DateTime<Utc>,
    },
    ExecReport {
        client_order_id: String,
        exchange_order_id: String,
        state: ExecState,
        side: Side,
        order_type: OrderType,
        price: Option<Decimal>,
        quantity: Decimal,
        filled_quantity: Decimal,
        remaining_qty: Decimal,
        avg_fill_price: Option<Decimal>,
        commission_amount: Decimal,
        commission_asset: String,
        timestamp: DateTime<Utc>,
        reject_reason: Option<String>,
    },
    BalanceUpdate {
        currency: String,
        total: Decimal,
        available: Decimal,
        timestamp: DateTime<Utc>,
    },
    KlineSummary {
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
        open_time: DateTime<Utc>,
        close_time: DateTime<Utc>,
    },
    InstrumentUpdate {
        status: String,
        tick_size: Option<Decimal>,
        step_size: Option<Decimal>,
        min_qty: Option<Decimal>,
        max_qty: Option<Decimal>,
        min_notional: Option<Decimal>,
    },
    ControlAck {
        message_id: String,
        success: bool,
        routing_version: i64,
        error_message: Option<String>,
    },
    ControlResult {
        message_id: String,
        result: serde_json::Value,
    },
}

/// `provider:symbol:type:seq` — globally unique per provider/symbol/type/seq.
pub fn build_event_id(provider: ProviderId, symbol: &Symbol, kind: EventType, seq: u64) -> String {
    format!("{provider}:{symbol}:{kind}:{seq}")
}

/// Parse an `event_id` back into its constituent parts. Round-trips with [`build_event_id`].
pub fn parse_event_id(id: &str) -> Result<(ProviderId, Symbol, EventType, u64), SchemaError> {
    let mut parts = id.splitn(4, ':');
    let (Some(provider), Some(symbol), Some(kind), Some(seq)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(SchemaError::InvalidCanonicalType {
            kind: id.to_string(),
            reason: "event_id must have 4 colon-separated parts".to_string(),
        });
    };

    let provider = provider.parse::<ProviderId>().map_err(|_| SchemaError::InvalidCanonicalType {
        kind: id.to_string(),
        reason: format!("unknown provider {provider:?}"),
    })?;
    let symbol = Symbol::parse(symbol)?;
    let kind = kind.parse::<EventType>()?;
    let seq = seq.parse::<u64>().map_err(|_| SchemaError::InvalidCanonicalType {
        kind: id.to_string(),
        reason: "seq must be a u64".to_string(),
    })?;

    Ok((provider, symbol, kind, seq))
}

/// The canonical event envelope. Immutable once emitted by the publisher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub routing_version: i64,
    pub provider: ProviderId,
    pub symbol: Symbol,
    pub event_type: EventType,
    pub seq_provider: u64,
    pub ingest_ts: DateTime<Utc>,
    pub emit_ts: DateTime<Utc>,
    pub payload: Payload,
}

impl Event {
    /// Validate the `event_id`/`ingest_ts ≤ emit_ts` invariants. The publisher is the only
    /// component that constructs an `Event` directly; every other component receives one that
    /// has already passed this check.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let expected = build_event_id(self.provider, &self.symbol, self.event_type, self.seq_provider);
        if expected != self.event_id {
            return Err(SchemaError::InvalidCanonicalType {
                kind: self.event_id.clone(),
                reason: format!("event_id does not match provider/symbol/type/seq (expected {expected})"),
            });
        }
        if self.ingest_ts > self.emit_ts {
            return Err(SchemaError::InvalidCanonicalType {
                kind: self.event_id.clone(),
                reason: "ingest_ts must be <= emit_ts".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_id_round_trips() {
        let symbol = Symbol::parse("BTC-USDT").unwrap();
        let id = build_event_id(ProviderId::BinanceSpot, &symbol, EventType::Trade, 42);
        assert_eq!(id, "BINANCE_SPOT:BTC-USDT:TRADE:42");

        let (provider, parsed_symbol, kind, seq) = parse_event_id(&id).unwrap();
        assert_eq!(provider, ProviderId::BinanceSpot);
        assert_eq!(parsed_symbol, symbol);
        assert_eq!(kind, EventType::Trade);
        assert_eq!(seq, 42);
    }

    #[test]
    fn only_ticker_and_kline_are_coalescable() {
        assert!(EventType::Ticker.is_coalescable());
        assert!(EventType::KlineSummary.is_coalescable());
        assert!(!EventType::Trade.is_coalescable());
        assert!(!EventType::BookSnapshot.is_coalescable());
        assert!(!EventType::ExecReport.is_coalescable());
    }

    #[test]
    fn validate_catches_ts_inversion() {
        let symbol = Symbol::parse("BTC-USDT").unwrap();
        let now = Utc::now();
        let event = Event {
            event_id: build_event_id(ProviderId::Mock, &symbol, EventType::Trade, 1),
            routing_version: 1,
            provider: ProviderId::Mock,
            symbol,
            event_type: EventType::Trade,
            seq_provider: 1,
            ingest_ts: now,
            emit_ts: now - chrono::Duration::milliseconds(5),
            payload: Payload::Trade {
                trade_id: "t1".to_string(),
                side: Side::Buy,
                price: Decimal::ONE,
                quantity: Decimal::ONE,
                timestamp: now,
            },
        };
        assert!(event.validate().is_err());
    }
}
