//! The private user-data stream: a REST-issued listen key, periodic keepalive, and a websocket
//! that carries execution reports and balance updates. Simpler than the depth stream — no
//! sequencing guarantees are made for account events beyond venue delivery order.

use crate::config::{AdapterConfig, DEFAULT_LISTEN_KEY_KEEPALIVE};
use crate::error::AdapterError;
use crate::pipeline::EventPipeline;
use crate::rest::RestClient;
use crate::wire::{ExecutionReportFrame, UserDataFrame};
use crate::OrderStore;
use kestrel_schema::event::{ExecState, OrderType};
use kestrel_schema::{EventType, Payload, Side, Symbol};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tracing::{info, warn};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

pub struct UserDataStream {
    config: AdapterConfig,
    rest: Arc<RestClient>,
    pipeline: Arc<EventPipeline>,
    orders: OrderStore,
}

impl UserDataStream {
    pub fn new(config: AdapterConfig, rest: Arc<RestClient>, pipeline: Arc<EventPipeline>, orders: OrderStore) -> Self {
        Self { config, rest, pipeline, orders }
    }

    pub async fn run(self) {
        let mut backoff = Duration::from_millis(500);
        loop {
            match self.connect_and_stream().await {
                Ok(()) => backoff = Duration::from_millis(500),
                Err(err) => warn!(error = %err, "user-data stream reconnecting"),
            }
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }

    async fn connect_and_stream(&self) -> Result<(), AdapterError> {
        let listen_key = self.rest.create_listen_key().await?;
        self.publish_balance_snapshot().await;
        let url = self.config.ws_private_url.join(&format!("/ws/{listen_key}")).expect("valid path segment");
        info!("user-data stream connected");

        let keepalive = self.keepalive_loop(listen_key.clone());
        let read = self.read_loop(url);
        tokio::pin!(keepalive, read);

        tokio::select! {
            result = &mut read => result,
            _ = &mut keepalive => Ok(()),
        }
    }

    /// Publish a `BALANCE.UPDATE` for every asset on the account, obtained via the REST account
    /// endpoint. Called once per reconnect, before the websocket carries any incremental delta.
    async fn publish_balance_snapshot(&self) {
        let account = match self.rest.account().await {
            Ok(account) => account,
            Err(err) => {
                warn!(error = %err, "failed to fetch account snapshot before streaming");
                return;
            }
        };
        let now = chrono::Utc::now();
        for balance in account.balances {
            let free = Decimal::from_str(&balance.free).unwrap_or_default();
            let locked = Decimal::from_str(&balance.locked).unwrap_or_default();
            self.pipeline.emit(
                self.config.provider,
                control_symbol(),
                EventType::BalanceUpdate,
                Some(now),
                Payload::BalanceUpdate {
                    currency: balance.asset,
                    total: free + locked,
                    available: free,
                    timestamp: now,
                },
            );
        }
    }

    async fn keepalive_loop(&self, listen_key: String) {
        loop {
            tokio::time::sleep(DEFAULT_LISTEN_KEY_KEEPALIVE).await;
            if let Err(err) = self.rest.keepalive_listen_key(&listen_key).await {
                warn!(error = %err, "listen key keepalive failed");
            }
        }
    }

    async fn read_loop(&self, url: url::Url) -> Result<(), AdapterError> {
        let (mut stream, _response) = connect_async(url.as_str()).await.map_err(AdapterError::Transport)?;
        use futures_util::StreamExt;

        while let Some(message) = stream.next().await {
            let message = message.map_err(AdapterError::Transport)?;
            let tokio_tungstenite::tungstenite::Message::Text(text) = message else {
                continue;
            };
            let Ok(frame) = serde_json::from_str::<UserDataFrame>(&text) else {
                continue;
            };

            match frame {
                UserDataFrame::ExecutionReport(report) => self.handle_execution_report(report),
                UserDataFrame::AccountPosition(position) => {
                    for balance in position.balances {
                        let total = Decimal::from_str(&balance.free).unwrap_or_default()
                            + Decimal::from_str(&balance.locked).unwrap_or_default();
                        self.pipeline.emit(
                            self.config.provider,
                            control_symbol(),
                            EventType::BalanceUpdate,
                            Some(crate::wire::millis_to_datetime(position.event_time)),
                            Payload::BalanceUpdate {
                                currency: balance.asset,
                                total,
                                available: Decimal::from_str(&balance.free).unwrap_or_default(),
                                timestamp: crate::wire::millis_to_datetime(position.event_time),
                            },
                        );
                    }
                }
                UserDataFrame::BalanceUpdate(update) => {
                    let delta = Decimal::from_str(&update.delta).unwrap_or_default();
                    self.pipeline.emit(
                        self.config.provider,
                        control_symbol(),
                        EventType::BalanceUpdate,
                        Some(crate::wire::millis_to_datetime(update.event_time)),
                        Payload::BalanceUpdate {
                            currency: update.asset,
                            total: delta,
                            available: delta,
                            timestamp: crate::wire::millis_to_datetime(update.event_time),
                        },
                    );
                }
            }
        }
        Ok(())
    }

    fn handle_execution_report(&self, report: ExecutionReportFrame) {
        let symbol = hyphenate(&report.s)
            .and_then(|s| Symbol::parse(&s).ok())
            .unwrap_or_else(control_symbol);
        let quantity = Decimal::from_str(&report.q).unwrap_or_default();
        let filled = Decimal::from_str(&report.z).unwrap_or_default();
        let price = Decimal::from_str(&report.p).ok().filter(|p| !p.is_zero());

        let payload = Payload::ExecReport {
            client_order_id: report.c.clone(),
            exchange_order_id: report.order_id.to_string(),
            state: exec_state(&report.order_status),
            side: side_from_wire(&report.side),
            order_type: if report.o == "MARKET" { OrderType::Market } else { OrderType::Limit },
            price,
            quantity,
            filled_quantity: filled,
            remaining_qty: (quantity - filled).max(Decimal::ZERO),
            avg_fill_price: Decimal::from_str(&report.last_price).ok().filter(|p| !p.is_zero()),
            commission_amount: Decimal::from_str(&report.n).unwrap_or_default(),
            commission_asset: report.commission_asset.clone().unwrap_or_default(),
            timestamp: crate::wire::millis_to_datetime(report.transaction_time),
            reject_reason: report.reject_reason.clone().filter(|r| r != "NONE"),
        };

        self.orders.record(&report.c, &report);
        self.pipeline.emit(
            self.config.provider,
            symbol,
            EventType::ExecReport,
            Some(crate::wire::millis_to_datetime(report.transaction_time)),
            payload,
        );
    }
}

fn control_symbol() -> Symbol {
    Symbol::parse("CONTROL-CONTROL").expect("static symbol")
}

/// Binance wire symbols carry no separator (e.g. "BTCUSDT"). Recover `BASE-QUOTE` by matching
/// the longest known quote-asset suffix; callers fall back to the synthetic control symbol when
/// none match — the exchange order id and client order id remain the source of truth either way.
const KNOWN_QUOTE_ASSETS: &[&str] = &["USDT", "USDC", "BUSD", "FDUSD", "BTC", "ETH", "BNB", "TRY", "EUR"];

fn hyphenate(wire_symbol: &str) -> Option<String> {
    KNOWN_QUOTE_ASSETS
        .iter()
        .filter(|quote| wire_symbol.len() > quote.len() && wire_symbol.ends_with(*quote))
        .max_by_key(|quote| quote.len())
        .map(|quote| format!("{}-{quote}", &wire_symbol[..wire_symbol.len() - quote.len()]))
}

fn exec_state(order_status: &str) -> ExecState {
    match order_status {
        "NEW" => ExecState::Ack,
        "PARTIALLY_FILLED" => ExecState::Partial,
        "FILLED" => ExecState::Filled,
        "CANCELED" | "PENDING_CANCEL" => ExecState::Cancelled,
        "REJECTED" => ExecState::Rejected,
        "EXPIRED" => ExecState::Expired,
        _ => ExecState::Ack,
    }
}

fn side_from_wire(side: &str) -> Side {
    if side.eq_ignore_ascii_case("SELL") {
        Side::Sell
    } else {
        Side::Buy
    }
}
