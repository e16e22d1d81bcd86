use anyhow::Context;
use log::{error, info};
use risk_core::ProviderConfig;
use risk_rpc_core::{cancel_on_signal, App, AppConfig, NacosRegistry};
use risk_service::init_logging;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cfg = ProviderConfig::load().context("load provider config")?;

    let registry = NacosRegistry::new(cfg.registry.clone()).context("create registry client")?;

    let shutdown = CancellationToken::new();
    cancel_on_signal(shutdown.clone());

    let app = App::new(AppConfig::from(&cfg), registry.clone());
    info!(
        "Starting {} on {} (advertise {}, weight {})",
        app.config.service_name, app.config.listen_addr, app.config.advertise_host, app.config.weight
    );

    let result = app.run(shutdown).await;
    registry.stop_beats();

    if let Err(e) = &result {
        error!("Provider exited: {}", e);
    } else {
        info!("Provider stopped");
    }
    result.map_err(Into::into)
}
