//! Processes commands pulled off the [`ControlBus`], delegating routing changes to the
//! [`SubscriptionManager`] and order commands to the [`AdapterHandle`], and publishing a
//! `CONTROL.ACK` (plus a `CONTROL.RESULT` when there is a payload) for every command handled.

use crate::bus::ControlBus;
use crate::command::{ControlAck, ControlCommand, ControlMessage};
use crate::subscription::{AdapterHandle, SubscriptionManager};
use crate::trading_state::TradingStateStore;
use kestrel_bus::{DataBus, DispatchTable, Publisher};
use kestrel_schema::{CanonicalType, Payload, ProviderId, Symbol};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Synthetic symbol stamped onto control-plane events, which are not scoped to one instrument.
fn control_symbol() -> Symbol {
    Symbol::parse("CONTROL-CONTROL").expect("CONTROL-CONTROL is a valid canonical symbol")
}

pub struct Controller {
    dispatch: Arc<DispatchTable>,
    data_bus: Arc<DataBus>,
    publisher: Arc<Publisher>,
    subscriptions: SubscriptionManager,
    trading_state: TradingStateStore,
    adapter: Arc<dyn AdapterHandle>,
    next_message_id: AtomicU64,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller").finish_non_exhaustive()
    }
}

impl Controller {
    pub fn new(
        dispatch: Arc<DispatchTable>,
        data_bus: Arc<DataBus>,
        publisher: Arc<Publisher>,
        adapter: Arc<dyn AdapterHandle>,
    ) -> Self {
        Self {
            subscriptions: SubscriptionManager::new(Arc::clone(&dispatch)),
            dispatch,
            data_bus,
            publisher,
            trading_state: TradingStateStore::new(),
            adapter,
            next_message_id: AtomicU64::new(1),
        }
    }

    /// Expose the trading-state store so a REST/gRPC front end can query it without going
    /// through the bus.
    pub fn trading_state(&self) -> &TradingStateStore {
        &self.trading_state
    }

    fn next_message_id(&self) -> String {
        format!("ctrl-{}", self.next_message_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Pull commands off `bus` until it closes. Safe to spawn more than once against the same
    /// bus: each command is delivered to exactly one caller of `recv`.
    pub async fn run(&self, bus: &ControlBus) {
        while let Some(pending) = bus.recv().await {
            let message = pending.message.clone();
            let ack = self.handle(message).await;
            self.publish_ack(&ack);
            pending.respond(ack);
        }
    }

    /// Process a single message, producing the acknowledgement both returned to the submitter
    /// and published onto the data bus.
    pub async fn handle(&self, message: ControlMessage) -> ControlAck {
        let message_id = self.next_message_id();
        let consumer_id = message.consumer_id.clone();

        match message.command {
            ControlCommand::Subscribe {
                provider,
                canonical_type,
                filters,
            } => self.handle_subscribe(message_id, provider, canonical_type, filters).await,
            ControlCommand::Unsubscribe {
                provider,
                canonical_type,
            } => self.handle_unsubscribe(message_id, provider, canonical_type).await,
            ControlCommand::SubmitOrder(order) => self.handle_submit_order(message_id, consumer_id, order).await,
            ControlCommand::QueryOrder {
                provider,
                client_order_id,
            } => self.handle_query_order(message_id, provider, client_order_id).await,
            ControlCommand::SetTradingMode { consumer_id, enabled } => {
                self.trading_state.set_enabled(&consumer_id, enabled);
                let version = self.dispatch.bump_for_control_mutation();
                info!(consumer_id, enabled, version, "trading mode updated");
                ControlAck::ok(message_id, version)
            }
        }
    }

    async fn handle_subscribe(
        &self,
        message_id: String,
        provider: ProviderId,
        canonical_type: CanonicalType,
        filters: Vec<kestrel_schema::FilterRule>,
    ) -> ControlAck {
        match self
            .subscriptions
            .activate(provider, canonical_type, filters, self.adapter.as_ref())
            .await
        {
            Ok(version) => ControlAck::ok(message_id, version),
            Err(err) => {
                warn!(error = %err, "subscribe failed");
                ControlAck::failed(message_id, self.dispatch.version(), err.to_string())
            }
        }
    }

    async fn handle_unsubscribe(
        &self,
        message_id: String,
        provider: ProviderId,
        canonical_type: CanonicalType,
    ) -> ControlAck {
        match self
            .subscriptions
            .deactivate(provider, &canonical_type, self.adapter.as_ref())
            .await
        {
            Ok(version) => ControlAck::ok(message_id, version),
            Err(err) => {
                warn!(error = %err, "unsubscribe failed");
                ControlAck::failed(message_id, self.dispatch.version(), err.to_string())
            }
        }
    }

    async fn handle_submit_order(
        &self,
        message_id: String,
        consumer_id: String,
        order: crate::command::SubmitOrderCommand,
    ) -> ControlAck {
        if !self.trading_state.enabled(&consumer_id) {
            return ControlAck::failed(
                message_id,
                self.dispatch.version(),
                format!("trading disabled for consumer {consumer_id}"),
            );
        }
        if order.quantity <= rust_decimal::Decimal::ZERO {
            return ControlAck::failed(message_id, self.dispatch.version(), "quantity must be positive");
        }
        if matches!(order.order_type, kestrel_schema::event::OrderType::Limit) && order.price.is_none() {
            return ControlAck::failed(message_id, self.dispatch.version(), "limit orders require a price");
        }

        match self.adapter.submit_order(&order).await {
            Ok(result) => ControlAck::ok_with_result(message_id, self.dispatch.version(), result),
            Err(err) => {
                warn!(error = %err, "submit_order failed");
                ControlAck::failed(message_id, self.dispatch.version(), err.to_string())
            }
        }
    }

    async fn handle_query_order(&self, message_id: String, provider: ProviderId, client_order_id: String) -> ControlAck {
        match self.adapter.query_order(provider, &client_order_id).await {
            Ok(result) => ControlAck::ok_with_result(message_id, self.dispatch.version(), result),
            Err(err) => {
                warn!(error = %err, "query_order failed");
                ControlAck::failed(message_id, self.dispatch.version(), err.to_string())
            }
        }
    }

    fn publish_ack(&self, ack: &ControlAck) {
        let symbol = control_symbol();
        let ack_event = self.publisher.publish(
            ProviderId::Mock,
            symbol.clone(),
            kestrel_schema::EventType::ControlAck,
            ack.routing_version,
            None,
            Payload::ControlAck {
                message_id: ack.message_id.clone(),
                success: ack.success,
                routing_version: ack.routing_version,
                error_message: ack.error_message.clone(),
            },
        );
        self.data_bus.publish(&ack_event);

        if let Some(result) = ack.result.clone() {
            let result_event = self.publisher.publish(
                ProviderId::Mock,
                symbol,
                kestrel_schema::EventType::ControlResult,
                ack.routing_version,
                None,
                Payload::ControlResult {
                    message_id: ack.message_id.clone(),
                    result,
                },
            );
            self.data_bus.publish(&result_event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::SubmitOrderCommand;
    use crate::error::ControlError;
    use async_trait::async_trait;
    use kestrel_schema::event::OrderType;
    use kestrel_schema::{FilterRule, Route, Side};
    use rust_decimal_macros::dec;
    use serde_json::json;

    struct StubAdapter;

    #[async_trait]
    impl AdapterHandle for StubAdapter {
        async fn subscribe_route(&self, _route: &Route) -> Result<(), ControlError> {
            Ok(())
        }

        async fn unsubscribe_route(&self, _provider: ProviderId, _canonical_type: &CanonicalType) -> Result<(), ControlError> {
            Ok(())
        }

        async fn submit_order(&self, order: &SubmitOrderCommand) -> Result<serde_json::Value, ControlError> {
            Ok(json!({ "client_order_id": order.client_order_id, "state": "ACK" }))
        }

        async fn query_order(&self, _provider: ProviderId, client_order_id: &str) -> Result<serde_json::Value, ControlError> {
            Ok(json!({ "client_order_id": client_order_id, "state": "FILLED" }))
        }
    }

    fn controller() -> (Controller, Arc<DataBus>) {
        let dispatch = Arc::new(DispatchTable::new());
        let data_bus = Arc::new(DataBus::new());
        let publisher = Arc::new(Publisher::new());
        let controller = Controller::new(dispatch, Arc::clone(&data_bus), publisher, Arc::new(StubAdapter));
        (controller, data_bus)
    }

    // Mirrors the subscribe/ack end-to-end scenario: a Subscribe through an otherwise empty
    // control bus, with one data-bus consumer, acks success with routing_version 1; a second
    // Subscribe for the same type with new filters bumps to version 2 and merges the filters.
    #[tokio::test]
    async fn subscribe_then_widen_bumps_routing_version_and_merges_filters() {
        let (controller, data_bus) = controller();
        let ack_subscriber = data_bus.subscribe(kestrel_schema::EventType::ControlAck);

        let first = controller
            .handle(ControlMessage::new(
                "consumer-a",
                ControlCommand::Subscribe {
                    provider: ProviderId::Mock,
                    canonical_type: CanonicalType::parse("TRADE").unwrap(),
                    filters: vec![FilterRule::new("symbol", "in", vec!["BTC-USDT".to_string()]).unwrap()],
                },
            ))
            .await;
        assert!(first.success);
        assert_eq!(first.routing_version, 1);

        let first_ack_event = ack_subscriber.recv().await.unwrap();
        match first_ack_event.payload {
            Payload::ControlAck { success, routing_version, .. } => {
                assert!(success);
                assert_eq!(routing_version, 1);
            }
            other => panic!("unexpected payload: {other:?}"),
        }

        let second = controller
            .handle(ControlMessage::new(
                "consumer-a",
                ControlCommand::Subscribe {
                    provider: ProviderId::Mock,
                    canonical_type: CanonicalType::parse("TRADE").unwrap(),
                    filters: vec![FilterRule::new("symbol", "in", vec!["BTC-USDT".to_string(), "ETH-USDT".to_string()]).unwrap()],
                },
            ))
            .await;
        assert!(second.success);
        assert_eq!(second.routing_version, 2);
    }

    #[tokio::test]
    async fn submit_order_is_rejected_when_trading_is_disabled_for_the_consumer() {
        let (controller, _data_bus) = controller();
        controller.trading_state().set_enabled("consumer-a", false);

        let ack = controller
            .handle(ControlMessage::new(
                "consumer-a",
                ControlCommand::SubmitOrder(SubmitOrderCommand {
                    provider: ProviderId::Mock,
                    symbol: Symbol::parse("BTC-USDT").unwrap(),
                    client_order_id: "co-1".to_string(),
                    side: Side::Buy,
                    order_type: OrderType::Limit,
                    price: Some(dec!(100)),
                    quantity: dec!(1),
                }),
            ))
            .await;

        assert!(!ack.success);
        assert!(ack.error_message.unwrap().contains("trading disabled"));
    }

    #[tokio::test]
    async fn submit_order_is_rejected_when_limit_order_has_no_price() {
        let (controller, _data_bus) = controller();

        let ack = controller
            .handle(ControlMessage::new(
                "consumer-a",
                ControlCommand::SubmitOrder(SubmitOrderCommand {
                    provider: ProviderId::Mock,
                    symbol: Symbol::parse("BTC-USDT").unwrap(),
                    client_order_id: "co-1".to_string(),
                    side: Side::Buy,
                    order_type: OrderType::Limit,
                    price: None,
                    quantity: dec!(1),
                }),
            ))
            .await;

        assert!(!ack.success);
        assert!(ack.error_message.unwrap().contains("price"));
    }

    #[tokio::test]
    async fn submit_order_is_rejected_when_quantity_is_not_positive() {
        let (controller, _data_bus) = controller();

        let ack = controller
            .handle(ControlMessage::new(
                "consumer-a",
                ControlCommand::SubmitOrder(SubmitOrderCommand {
                    provider: ProviderId::Mock,
                    symbol: Symbol::parse("BTC-USDT").unwrap(),
                    client_order_id: "co-1".to_string(),
                    side: Side::Buy,
                    order_type: OrderType::Market,
                    price: None,
                    quantity: dec!(0),
                }),
            ))
            .await;

        assert!(!ack.success);
        assert!(ack.error_message.unwrap().contains("quantity"));
    }

    #[tokio::test]
    async fn submit_order_publishes_a_control_result() {
        let (controller, data_bus) = controller();
        let result_subscriber = data_bus.subscribe(kestrel_schema::EventType::ControlResult);

        let ack = controller
            .handle(ControlMessage::new(
                "consumer-a",
                ControlCommand::SubmitOrder(SubmitOrderCommand {
                    provider: ProviderId::Mock,
                    symbol: Symbol::parse("BTC-USDT").unwrap(),
                    client_order_id: "co-1".to_string(),
                    side: Side::Buy,
                    order_type: OrderType::Limit,
                    price: Some(dec!(100)),
                    quantity: dec!(1),
                }),
            ))
            .await;

        assert!(ack.success);
        let result_event = result_subscriber.recv().await.unwrap();
        assert!(matches!(result_event.payload, Payload::ControlResult { .. }));
    }

    #[tokio::test]
    async fn set_trading_mode_bumps_the_shared_control_version() {
        let (controller, _data_bus) = controller();

        let ack = controller
            .handle(ControlMessage::new(
                "consumer-a",
                ControlCommand::SetTradingMode {
                    consumer_id: "consumer-a".to_string(),
                    enabled: false,
                },
            ))
            .await;

        assert!(ack.success);
        assert_eq!(ack.routing_version, 1);
        assert!(!controller.trading_state().enabled("consumer-a"));
    }

    #[tokio::test]
    async fn query_order_returns_the_adapter_result() {
        let (controller, _data_bus) = controller();
        let ack = controller
            .handle(ControlMessage::new(
                "consumer-a",
                ControlCommand::QueryOrder {
                    provider: ProviderId::Mock,
                    client_order_id: "co-1".to_string(),
                },
            ))
            .await;

        assert!(ack.success);
        assert!(ack.result.is_some());
    }
}
