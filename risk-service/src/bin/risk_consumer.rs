use anyhow::Context;
use log::info;
use risk_core::ConsumerConfig;
use risk_rpc_core::{
    cancel_on_signal, DiscoveryPoller, GrpcTransport, InvocationClient, NacosRegistry, PollerConfig,
};
use risk_service::init_logging;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cfg = ConsumerConfig::load().context("load consumer config")?;

    let registry = NacosRegistry::new(cfg.registry.clone()).context("create registry client")?;
    let client = InvocationClient::new(
        GrpcTransport::new(),
        cfg.connect_timeout(),
        cfg.call_timeout(),
    );
    let poller = DiscoveryPoller::new(registry, client, PollerConfig::from(&cfg));

    let shutdown = CancellationToken::new();
    cancel_on_signal(shutdown.clone());

    let cycles = poller.run(shutdown).await;
    info!("Consumer stopped after {} cycles", cycles);
    Ok(())
}
