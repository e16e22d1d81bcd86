use super::registration::{RegistrationController, RegistrationRequest};
use crate::discover::{RegistryClient, ServiceInstance};
use crate::risk::{RiskHandler, RiskServiceServer};
use log::{error, info};
use risk_core::{ProviderConfig, RiskErr};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;

/// 提供方应用配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub service_name: String,
    /// 本地监听地址
    pub listen_addr: String,
    /// 注册到注册中心的主机
    pub advertise_host: String,
    pub weight: f64,
    pub retry_budget: u32,
    pub retry_delay: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from(&ProviderConfig::default())
    }
}

impl From<&ProviderConfig> for AppConfig {
    fn from(cfg: &ProviderConfig) -> Self {
        Self {
            service_name: cfg.service_name.clone(),
            listen_addr: cfg.listen_addr(),
            advertise_host: cfg.resolve_advertise_host(),
            weight: cfg.weight,
            retry_budget: cfg.retry_budget,
            retry_delay: cfg.retry_delay(),
        }
    }
}

/// 风控服务提供方
///
/// 生命周期：监听端口 → 带重试注册 → 提供 gRPC 服务 → 收到关闭信号后注销。
/// 端口监听失败或注册重试耗尽都会直接返回错误，不会在未注册的情况下对外服务。
pub struct App<R>
where
    R: RegistryClient,
{
    pub config: AppConfig,
    registry: R,
}

impl<R> App<R>
where
    R: RegistryClient,
{
    pub fn new(config: AppConfig, registry: R) -> Self {
        Self { config, registry }
    }

    pub fn builder(name: impl Into<String>) -> AppBuilder<R> {
        AppBuilder::new(name)
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// 绑定监听端口
    pub async fn bind(&self) -> Result<TcpListener, RiskErr> {
        let listener = TcpListener::bind(&self.config.listen_addr)
            .await
            .map_err(|source| RiskErr::Listen {
                addr: self.config.listen_addr.clone(),
                source,
            })?;
        info!("Listening on {}", self.config.listen_addr);
        Ok(listener)
    }

    /// 运行直到 `shutdown` 被触发
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), RiskErr> {
        let listener = self.bind().await?;
        self.run_with_listener(listener, shutdown).await
    }

    /// 使用已绑定的监听器运行，注册的端口取监听器的实际端口
    pub async fn run_with_listener(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), RiskErr> {
        let local_addr = listener.local_addr()?;
        let instance = ServiceInstance::new(
            self.config.service_name.clone(),
            self.config.advertise_host.clone(),
            local_addr.port(),
        )
        .with_weight(self.config.weight);

        let request = RegistrationRequest::new(
            instance.clone(),
            self.config.retry_budget,
            self.config.retry_delay,
        );
        let mut controller = RegistrationController::new(request);
        tokio::select! {
            result = controller.run(&self.registry) => { result?; }
            _ = shutdown.cancelled() => {
                info!("Shutdown requested before registration completed");
                return Ok(());
            }
        }

        info!("Serving {} on {} as {}", self.config.service_name, local_addr, instance);
        let served = Server::builder()
            .add_service(RiskServiceServer::new(RiskHandler::new()))
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown.cancelled())
            .await;

        info!("Shutting down gracefully...");
        if let Err(e) = self.registry.deregister(&instance).await {
            error!("Failed to deregister {}: {}", instance, e);
        } else {
            info!("Deregistered {}", instance);
        }

        served.map_err(|e| RiskErr::Other(anyhow::anyhow!("grpc server: {}", e)))
    }
}

/// App Builder
pub struct AppBuilder<R>
where
    R: RegistryClient,
{
    config: AppConfig,
    registry: Option<R>,
}

impl<R> AppBuilder<R>
where
    R: RegistryClient,
{
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: AppConfig {
                service_name: name.into(),
                ..Default::default()
            },
            registry: None,
        }
    }

    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    pub fn advertise_host(mut self, host: impl Into<String>) -> Self {
        self.config.advertise_host = host.into();
        self
    }

    pub fn weight(mut self, weight: f64) -> Self {
        self.config.weight = weight;
        self
    }

    /// 设置注册重试次数与间隔
    pub fn retry(mut self, budget: u32, delay: Duration) -> Self {
        self.config.retry_budget = budget;
        self.config.retry_delay = delay;
        self
    }

    pub fn registry(mut self, registry: R) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> Result<App<R>, RiskErr> {
        let registry = self
            .registry
            .ok_or_else(|| RiskErr::config("no registry provided"))?;
        if self.config.service_name.is_empty() {
            return Err(RiskErr::config("service name must not be empty"));
        }
        Ok(App::new(self.config, registry))
    }
}
