//! The command set the control bus accepts and the acknowledgement it returns for each.

use chrono::{DateTime, Utc};
use kestrel_schema::event::OrderType;
use kestrel_schema::{CanonicalType, FilterRule, ProviderId, Side, Symbol};
use rust_decimal::Decimal;
use serde_json::Value;

/// One command submitted to the [`crate::controller::Controller`] through the
/// [`crate::bus::ControlBus`].
#[derive(Debug, Clone)]
pub enum ControlCommand {
    /// Start or widen routing for a canonical type. Merges `filters` into any existing route
    /// for the same `(provider, type)` rather than replacing it outright.
    Subscribe {
        provider: ProviderId,
        canonical_type: CanonicalType,
        filters: Vec<FilterRule>,
    },
    /// Stop routing a canonical type entirely.
    Unsubscribe {
        provider: ProviderId,
        canonical_type: CanonicalType,
    },
    SubmitOrder(SubmitOrderCommand),
    QueryOrder {
        provider: ProviderId,
        client_order_id: String,
    },
    /// Enable or disable trading for one logical consumer. Market-data routing is unaffected.
    SetTradingMode { consumer_id: String, enabled: bool },
}

#[derive(Debug, Clone)]
pub struct SubmitOrderCommand {
    pub provider: ProviderId,
    pub symbol: Symbol,
    pub client_order_id: String,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Option<Decimal>,
    pub quantity: Decimal,
}

/// A command plus the identity of the consumer that issued it, as delivered to a
/// [`crate::controller::Controller`] off the bus.
#[derive(Debug, Clone)]
pub struct ControlMessage {
    pub consumer_id: String,
    pub command: ControlCommand,
}

impl ControlMessage {
    pub fn new(consumer_id: impl Into<String>, command: ControlCommand) -> Self {
        Self {
            consumer_id: consumer_id.into(),
            command,
        }
    }
}

/// The reply handed back through the bus's reply channel, and also published onto the data bus
/// as a `CONTROL.ACK` (plus a `CONTROL.RESULT` when `result` is set).
#[derive(Debug, Clone)]
pub struct ControlAck {
    pub message_id: String,
    pub success: bool,
    pub routing_version: i64,
    pub error_message: Option<String>,
    pub result: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl ControlAck {
    pub fn ok(message_id: impl Into<String>, routing_version: i64) -> Self {
        Self {
            message_id: message_id.into(),
            success: true,
            routing_version,
            error_message: None,
            result: None,
            timestamp: Utc::now(),
        }
    }

    pub fn ok_with_result(message_id: impl Into<String>, routing_version: i64, result: Value) -> Self {
        Self {
            result: Some(result),
            ..Self::ok(message_id, routing_version)
        }
    }

    pub fn failed(message_id: impl Into<String>, routing_version: i64, error: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            success: false,
            routing_version,
            error_message: Some(error.into()),
            result: None,
            timestamp: Utc::now(),
        }
    }
}
