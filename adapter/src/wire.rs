//! JSON shapes of the venue's public and private websocket frames, and its REST responses.
//! Kept close to the wire: callers translate these into canonical [`kestrel_schema`] types.

use chrono::{DateTime, TimeZone, Utc};
use kestrel_book::RawLevel;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Binance timestamps are normally a bare integer (milliseconds since epoch), but some REST
/// error paths and third-party proxies quote it as a string; accept either.
pub fn flexible_timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flexible {
        Int(i64),
        Str(String),
    }

    match Flexible::deserialize(deserializer)? {
        Flexible::Int(ms) => Ok(ms),
        Flexible::Str(s) => s.parse().map_err(de::Error::custom),
    }
}

pub fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
}

/// A combined-stream envelope: every frame read off `/stream?streams=...` is wrapped this way.
#[derive(Debug, Deserialize)]
pub struct CombinedEnvelope<T> {
    pub stream: String,
    pub data: T,
}

/// The ack the venue sends back for a `SUBSCRIBE`/`UNSUBSCRIBE` control frame.
#[derive(Debug, Deserialize)]
pub struct ControlAckFrame {
    pub id: u64,
    pub result: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct ControlRequestFrame<'a> {
    pub method: &'a str,
    pub params: Vec<String>,
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "e")]
pub enum MarketFrame {
    #[serde(rename = "depthUpdate")]
    DepthUpdate(DepthUpdateFrame),
    #[serde(rename = "trade")]
    Trade(TradeFrame),
    #[serde(rename = "aggTrade")]
    AggTrade(TradeFrame),
    #[serde(rename = "24hrTicker")]
    Ticker(TickerFrame),
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepthUpdateFrame {
    #[serde(rename = "E", deserialize_with = "flexible_timestamp")]
    pub event_time: i64,
    pub s: String,
    #[serde(rename = "U")]
    pub first_update_id: u64,
    #[serde(rename = "u")]
    pub final_update_id: u64,
    pub b: Vec<RawLevel>,
    pub a: Vec<RawLevel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradeFrame {
    #[serde(rename = "E", deserialize_with = "flexible_timestamp")]
    pub event_time: i64,
    pub s: String,
    #[serde(rename = "t")]
    pub trade_id: u64,
    pub p: String,
    pub q: String,
    #[serde(rename = "T", deserialize_with = "flexible_timestamp")]
    pub trade_time: i64,
    /// `true` when the buyer was the maker — the trade's aggressor therefore sold.
    pub m: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TickerFrame {
    #[serde(rename = "E", deserialize_with = "flexible_timestamp")]
    pub event_time: i64,
    pub s: String,
    /// Last traded price.
    pub c: String,
    /// Best bid price.
    pub b: String,
    /// Best ask price.
    pub a: String,
    /// Base-asset volume over the trailing 24h.
    pub v: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "e")]
pub enum UserDataFrame {
    #[serde(rename = "executionReport")]
    ExecutionReport(ExecutionReportFrame),
    #[serde(rename = "outboundAccountPosition")]
    AccountPosition(AccountPositionFrame),
    #[serde(rename = "balanceUpdate")]
    BalanceUpdate(BalanceUpdateFrame),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReportFrame {
    #[serde(rename = "E", deserialize_with = "flexible_timestamp")]
    pub event_time: i64,
    pub s: String,
    pub c: String,
    #[serde(rename = "S")]
    pub side: String,
    pub o: String,
    pub q: String,
    pub p: String,
    /// Current order status: NEW / PARTIALLY_FILLED / FILLED / CANCELED / REJECTED / EXPIRED.
    #[serde(rename = "X")]
    pub order_status: String,
    #[serde(rename = "i")]
    pub order_id: i64,
    /// Last executed quantity.
    pub l: String,
    /// Cumulative filled quantity.
    pub z: String,
    /// Last executed price.
    #[serde(rename = "L")]
    pub last_price: String,
    /// Commission charged on the last fill.
    pub n: String,
    #[serde(rename = "N")]
    pub commission_asset: Option<String>,
    #[serde(rename = "T", deserialize_with = "flexible_timestamp")]
    pub transaction_time: i64,
    #[serde(default, rename = "r")]
    pub reject_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountPositionFrame {
    #[serde(rename = "E", deserialize_with = "flexible_timestamp")]
    pub event_time: i64,
    #[serde(rename = "B")]
    pub balances: Vec<BalanceEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceEntry {
    #[serde(rename = "a")]
    pub asset: String,
    #[serde(rename = "f")]
    pub free: String,
    #[serde(rename = "l")]
    pub locked: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceUpdateFrame {
    #[serde(rename = "E", deserialize_with = "flexible_timestamp")]
    pub event_time: i64,
    #[serde(rename = "a")]
    pub asset: String,
    #[serde(rename = "d")]
    pub delta: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeInfoResponse {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    pub status: String,
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
    #[serde(rename = "PRICE_FILTER")]
    PriceFilter { #[serde(rename = "tickSize")] tick_size: String },
    #[serde(rename = "LOT_SIZE")]
    LotSize {
        #[serde(rename = "stepSize")]
        step_size: String,
        #[serde(rename = "minQty")]
        min_qty: String,
        #[serde(rename = "maxQty")]
        max_qty: String,
    },
    #[serde(rename = "MIN_NOTIONAL")]
    MinNotional { #[serde(rename = "minNotional")] min_notional: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepthSnapshotResponse {
    #[serde(rename = "lastUpdateId")]
    pub last_update_id: u64,
    pub bids: Vec<RawLevel>,
    pub asks: Vec<RawLevel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListenKeyResponse {
    #[serde(rename = "listenKey")]
    pub listen_key: String,
}

/// `GET /account` for a spot venue: `{balances:[{asset, free, locked}]}`. Futures venues return
/// a differently-shaped array (`walletBalance`/`crossWalletBalance`/`availableBalance`) this
/// adapter does not target.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountResponse {
    #[serde(default)]
    pub balances: Vec<AccountBalanceEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountBalanceEntry {
    pub asset: String,
    pub free: String,
    pub locked: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub symbol: String,
    #[serde(rename = "orderId")]
    pub order_id: i64,
    #[serde(rename = "clientOrderId")]
    pub client_order_id: String,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(rename = "origQty", default)]
    pub orig_qty: Option<String>,
    #[serde(rename = "executedQty", default)]
    pub executed_qty: Option<String>,
    pub status: String,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(rename = "type", default)]
    pub order_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Wrapper {
        #[serde(deserialize_with = "flexible_timestamp")]
        ts: i64,
    }

    #[test]
    fn flexible_timestamp_accepts_an_integer() {
        let wrapper: Wrapper = serde_json::from_str(r#"{"ts":1700000000000}"#).unwrap();
        assert_eq!(wrapper.ts, 1_700_000_000_000);
    }

    #[test]
    fn flexible_timestamp_accepts_a_quoted_integer() {
        let wrapper: Wrapper = serde_json::from_str(r#"{"ts":"1700000000000"}"#).unwrap();
        assert_eq!(wrapper.ts, 1_700_000_000_000);
    }

    #[test]
    fn flexible_timestamp_rejects_a_non_numeric_string() {
        let result: Result<Wrapper, _> = serde_json::from_str(r#"{"ts":"not-a-number"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn depth_update_frame_parses_from_a_combined_stream_envelope() {
        let raw = r#"{
            "stream": "btcusdt@depth@100ms",
            "data": {
                "e": "depthUpdate",
                "E": 1700000000000,
                "s": "BTCUSDT",
                "U": 101,
                "u": 105,
                "b": [["50000.00", "1.5"]],
                "a": [["50100.00", "2.0"]]
            }
        }"#;
        let envelope: CombinedEnvelope<MarketFrame> = serde_json::from_str(raw).unwrap();
        match envelope.data {
            MarketFrame::DepthUpdate(frame) => {
                assert_eq!(frame.first_update_id, 101);
                assert_eq!(frame.final_update_id, 105);
                assert_eq!(frame.b, vec![("50000.00".to_string(), "1.5".to_string())]);
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn ticker_frame_parses_with_a_string_quoted_event_time() {
        let raw = r#"{
            "e": "24hrTicker",
            "E": "1700000000000",
            "s": "BTCUSDT",
            "c": "50050.00",
            "b": "50040.00",
            "a": "50060.00",
            "v": "1234.5"
        }"#;
        let frame: MarketFrame = serde_json::from_str(raw).unwrap();
        match frame {
            MarketFrame::Ticker(ticker) => {
                assert_eq!(ticker.event_time, 1_700_000_000_000);
                assert_eq!(ticker.c, "50050.00");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn account_response_parses_the_rest_balance_shape() {
        let raw = r#"{"balances":[{"asset":"USDT","free":"100.0","locked":"5.0"}]}"#;
        let account: AccountResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(account.balances.len(), 1);
        assert_eq!(account.balances[0].asset, "USDT");
    }

    #[test]
    fn user_data_frame_discriminates_on_the_event_type_tag() {
        let raw = r#"{"e":"balanceUpdate","E":1700000000000,"a":"BTC","d":"0.5"}"#;
        let frame: UserDataFrame = serde_json::from_str(raw).unwrap();
        assert!(matches!(frame, UserDataFrame::BalanceUpdate(_)));
    }
}
