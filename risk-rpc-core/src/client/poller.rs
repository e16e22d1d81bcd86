use super::{InvocationClient, Transport};
use crate::discover::{RegistryClient, ServiceInstance};
use crate::risk::{RiskRequest, RiskResponse};
use log::{info, warn};
use risk_core::{ConsumerConfig, RiskErr};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub service_name: String,
    /// 注册中心不可达或没有健康实例时的等待时间
    pub not_found_interval: Duration,
    /// 每次调用（无论成功失败）之后的等待时间
    pub poll_interval: Duration,
    pub probe_address: String,
}

impl From<&ConsumerConfig> for PollerConfig {
    fn from(cfg: &ConsumerConfig) -> Self {
        Self {
            service_name: cfg.service_name.clone(),
            not_found_interval: cfg.not_found_interval(),
            poll_interval: cfg.poll_interval(),
            probe_address: cfg.probe_address.clone(),
        }
    }
}

/// 一次成功的调用
#[derive(Debug, Clone)]
pub struct Invocation {
    pub instance: ServiceInstance,
    pub response: RiskResponse,
}

/// 发现 + 调用的控制循环
///
/// 每一轮都重新向注册中心查询，不在轮次之间缓存实例。
pub struct DiscoveryPoller<R, T> {
    registry: R,
    client: InvocationClient<T>,
    config: PollerConfig,
}

impl<R, T> DiscoveryPoller<R, T>
where
    R: RegistryClient,
    T: Transport,
{
    pub fn new(registry: R, client: InvocationClient<T>, config: PollerConfig) -> Self {
        Self {
            registry,
            client,
            config,
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn client(&self) -> &InvocationClient<T> {
        &self.client
    }

    /// 执行一轮：查询健康实例，找到则调用一次
    pub async fn poll_once(&self) -> Result<Invocation, RiskErr> {
        let service_name = &self.config.service_name;

        let instance = match self.registry.find_healthy(service_name).await {
            Ok(Some(instance)) => instance,
            Ok(None) => {
                warn!("No healthy instance of {} yet, retrying", service_name);
                return Err(RiskErr::no_healthy_instance(service_name.as_str()));
            }
            Err(e) => {
                warn!("Discovery of {} failed: {}", service_name, e);
                return Err(e.into());
            }
        };

        let request = RiskRequest::new(self.config.probe_address.as_str());
        let authority = instance.authority();
        match self.client.invoke(&authority, request).await {
            Ok(response) => {
                info!(
                    "Called {} at {}: address={} is_safe={}",
                    service_name, authority, self.config.probe_address, response.is_safe
                );
                Ok(Invocation { instance, response })
            }
            Err(e) => {
                warn!("Call to {} at {} failed: {}", service_name, authority, e);
                Err(e.into())
            }
        }
    }

    /// 本轮结果对应的等待时间
    pub fn delay_for(&self, outcome: &Result<Invocation, RiskErr>) -> Duration {
        match outcome {
            Err(RiskErr::RegistryUnavailable(_)) | Err(RiskErr::NoHealthyInstance(_)) => {
                self.config.not_found_interval
            }
            _ => self.config.poll_interval,
        }
    }

    /// 循环执行直到 `cancel` 被触发，返回完成的轮数
    pub async fn run(&self, cancel: CancellationToken) -> u64 {
        info!(
            "Discovery poller started: service={} not_found_interval={:?} poll_interval={:?}",
            self.config.service_name, self.config.not_found_interval, self.config.poll_interval
        );

        let mut cycles = 0u64;
        loop {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => break,
                outcome = self.poll_once() => outcome,
            };
            cycles += 1;

            let delay = self.delay_for(&outcome);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!("Discovery poller stopped after {} cycles", cycles);
        cycles
    }
}
