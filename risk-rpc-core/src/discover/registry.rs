use async_trait::async_trait;
use risk_core::RiskErr;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// 注册中心不可达（网络错误、超时、5xx）
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    /// 注册中心可达但拒绝了请求（鉴权失败、参数错误）
    #[error("registry rejected request: {0}")]
    Rejected(String),

    #[error("decode error: {0}")]
    DecodeError(String),
}

impl From<RegistryError> for RiskErr {
    fn from(err: RegistryError) -> Self {
        RiskErr::RegistryUnavailable(err.to_string())
    }
}

/// 服务实例，身份由 (service_name, address, port) 决定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub service_name: String,
    pub address: String,
    pub port: u16,
    pub weight: f64,
    pub healthy: bool,
}

impl ServiceInstance {
    pub fn new(service_name: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            service_name: service_name.into(),
            address: address.into(),
            port,
            weight: 1.0,
            healthy: true,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_healthy(mut self, healthy: bool) -> Self {
        self.healthy = healthy;
        self
    }

    /// `host:port`
    pub fn authority(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn same_identity(&self, other: &ServiceInstance) -> bool {
        self.service_name == other.service_name
            && self.address == other.address
            && self.port == other.port
    }
}

impl PartialEq for ServiceInstance {
    fn eq(&self, other: &Self) -> bool {
        self.same_identity(other)
    }
}

impl fmt::Display for ServiceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.service_name, self.address, self.port)
    }
}

/// 注册中心客户端
#[async_trait]
pub trait RegistryClient: Send + Sync + 'static {
    /// 注册实例；`Ok(true)` 表示注册中心明确确认
    async fn register(&self, instance: &ServiceInstance) -> Result<bool, RegistryError>;

    /// 注销实例
    async fn deregister(&self, instance: &ServiceInstance) -> Result<(), RegistryError>;

    /// 选出一个健康实例；`Ok(None)` 表示当前没有健康实例
    async fn find_healthy(&self, service_name: &str)
        -> Result<Option<ServiceInstance>, RegistryError>;
}

#[async_trait]
impl<T> RegistryClient for Arc<T>
where
    T: RegistryClient + ?Sized,
{
    async fn register(&self, instance: &ServiceInstance) -> Result<bool, RegistryError> {
        (**self).register(instance).await
    }

    async fn deregister(&self, instance: &ServiceInstance) -> Result<(), RegistryError> {
        (**self).deregister(instance).await
    }

    async fn find_healthy(
        &self,
        service_name: &str,
    ) -> Result<Option<ServiceInstance>, RegistryError> {
        (**self).find_healthy(service_name).await
    }
}
