//! # 🛰️ Gateway - Process Wiring
//!
//! Assembles the market-data and control-plane crates into one running process: a
//! [`kestrel_bus::DispatchTable`] and [`kestrel_bus::DataBus`] shared by every provider adapter, a
//! [`kestrel_control::ControlBus`] consumers submit commands through, a [`kestrel_control::Controller`]
//! draining it, and a [`kestrel_adapter::BinanceAdapter`] behind the [`kestrel_control::AdapterHandle`]
//! seam. `main` only has to call [`build`] and then drive [`Gateway::run`] to a [`shutdown::Shutdown`]
//! signal.

pub mod config;
pub mod error;
pub mod logging;
pub mod shutdown;

use config::GatewayConfig;
use error::GatewayError;
use kestrel_adapter::BinanceAdapter;
use kestrel_bus::{DataBus, DispatchTable, Publisher};
use kestrel_control::{ControlBus, Controller, DEFAULT_BUS_CAPACITY};
use kestrel_schema::ProviderId;
use shutdown::Shutdown;
use std::sync::Arc;
use tracing::info;

/// Everything a running gateway process owns. Constructed once by [`build`]; [`Gateway::run`]
/// drains the control bus until a shutdown signal arrives.
pub struct Gateway {
    pub dispatch: Arc<DispatchTable>,
    pub data_bus: Arc<DataBus>,
    pub publisher: Arc<Publisher>,
    pub control_bus: Arc<ControlBus>,
    pub controller: Arc<Controller>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway").finish_non_exhaustive()
    }
}

/// Wire up a Binance spot adapter plus the shared bus/control-plane plumbing described by
/// `config`. Does not spawn anything — callers decide whether `Controller::run` runs on the
/// calling task or a spawned one, which is what makes this testable without a runtime of its own.
pub fn build(config: &GatewayConfig) -> Result<Gateway, GatewayError> {
    let dispatch = Arc::new(DispatchTable::new());
    let data_bus = Arc::new(DataBus::new());
    let publisher = Arc::new(Publisher::new());
    let control_bus = Arc::new(ControlBus::new(DEFAULT_BUS_CAPACITY));

    let adapter_config = config.to_adapter_config(ProviderId::BinanceSpot);
    let adapter = Arc::new(BinanceAdapter::new(adapter_config, Arc::clone(&dispatch), Arc::clone(&data_bus))?);

    let controller = Arc::new(Controller::new(
        Arc::clone(&dispatch),
        Arc::clone(&data_bus),
        Arc::clone(&publisher),
        adapter,
    ));

    info!(environment = %config.environment, "gateway wired");

    Ok(Gateway {
        dispatch,
        data_bus,
        publisher,
        control_bus,
        controller,
    })
}

impl Gateway {
    /// Drain the control bus until either it closes or `shutdown` resolves, whichever comes
    /// first. `shutdown` is typically `tokio::signal::ctrl_c()` mapped to `()`.
    pub async fn run(&self, shutdown: impl std::future::Future<Output = ()>) {
        tokio::select! {
            _ = self.controller.run(&self.control_bus) => {
                info!("control bus closed; gateway stopping");
            }
            _ = shutdown => {
                info!("shutdown signal received; gateway stopping");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> GatewayConfig {
        GatewayConfig {
            environment: config::Environment::Development,
            rest_base_url: "https://api.binance.com".parse().unwrap(),
            ws_public_url: "wss://stream.binance.com:9443".parse().unwrap(),
            ws_private_url: "wss://stream.binance.com:9443".parse().unwrap(),
            http_timeout: std::time::Duration::from_secs(1),
            ws_handshake_timeout: std::time::Duration::from_secs(1),
            api_key: None,
            api_secret: None,
            json_logging: false,
        }
    }

    #[test]
    fn build_wires_every_component_without_touching_the_network() {
        let gateway = build(&test_config()).expect("build should not dial out");
        assert_eq!(gateway.dispatch.version(), 0);
    }

    #[tokio::test]
    async fn run_stops_as_soon_as_the_shutdown_future_resolves() {
        let gateway = build(&test_config()).unwrap();
        gateway.run(async {}).await;
    }

    #[allow(dead_code)]
    fn assert_shutdown_marker_is_default_constructible() {
        let _ = Shutdown;
    }
}
