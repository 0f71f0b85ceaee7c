use kestrel_gateway::config::GatewayConfig;
use kestrel_gateway::{build, logging};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = GatewayConfig::from_env()?;

    if config.json_logging {
        logging::init_json_logging();
    } else {
        logging::init_logging();
    }

    info!(environment = %config.environment, "starting kestrel-gateway");

    let gateway = build(&config)?;
    gateway
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    Ok(())
}
