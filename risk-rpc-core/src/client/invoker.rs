use crate::risk::{RiskRequest, RiskResponse, RiskServiceClient};
use async_trait::async_trait;
use risk_core::RiskErr;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tonic::transport::{Channel, Endpoint};

#[derive(Debug, Error)]
pub enum InvokeError {
    /// 建连失败，调用没有发出
    #[error("connection error: {0}")]
    Connection(String),

    /// 调用已发出，但远端返回错误或超时
    #[error("call error: {0}")]
    Call(String),
}

impl From<InvokeError> for RiskErr {
    fn from(err: InvokeError) -> Self {
        match err {
            InvokeError::Connection(msg) => RiskErr::ConnectionError(msg),
            InvokeError::Call(msg) => RiskErr::CallError(msg),
        }
    }
}

/// RPC 传输层：建连 + 单次调用，连接在被 drop 时释放
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    type Connection: Send;

    /// 建立到 `host:port` 的新连接
    async fn dial(&self, authority: &str) -> Result<Self::Connection, InvokeError>;

    /// 在连接上发出一次 `CheckAddress`
    async fn call(
        &self,
        conn: &mut Self::Connection,
        request: RiskRequest,
    ) -> Result<RiskResponse, InvokeError>;
}

/// 基于 tonic 的 gRPC 传输
#[derive(Debug, Clone, Default)]
pub struct GrpcTransport;

impl GrpcTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for GrpcTransport {
    type Connection = RiskServiceClient<Channel>;

    async fn dial(&self, authority: &str) -> Result<Self::Connection, InvokeError> {
        let endpoint = Endpoint::from_shared(format!("http://{}", authority))
            .map_err(|e| InvokeError::Connection(format!("invalid address {}: {}", authority, e)))?
            .tcp_nodelay(true);

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| InvokeError::Connection(format!("{}: {}", authority, e)))?;

        Ok(RiskServiceClient::new(channel))
    }

    async fn call(
        &self,
        conn: &mut Self::Connection,
        request: RiskRequest,
    ) -> Result<RiskResponse, InvokeError> {
        conn.check_address(request)
            .await
            .map(|resp| resp.into_inner())
            .map_err(|status| InvokeError::Call(format!("{:?}: {}", status.code(), status.message())))
    }
}

/// 调用客户端：每次调用新建连接、发出一次调用、释放连接
#[derive(Debug, Clone)]
pub struct InvocationClient<T> {
    transport: T,
    connect_timeout: Duration,
    call_timeout: Duration,
}

impl<T> InvocationClient<T>
where
    T: Transport,
{
    pub fn new(transport: T, connect_timeout: Duration, call_timeout: Duration) -> Self {
        Self {
            transport,
            connect_timeout,
            call_timeout,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn invoke(
        &self,
        authority: &str,
        request: RiskRequest,
    ) -> Result<RiskResponse, InvokeError> {
        let mut conn = match timeout(self.connect_timeout, self.transport.dial(authority)).await {
            Ok(conn) => conn?,
            Err(_) => {
                return Err(InvokeError::Connection(format!(
                    "dial {} timed out after {:?}",
                    authority, self.connect_timeout
                )))
            }
        };

        let result = match timeout(self.call_timeout, self.transport.call(&mut conn, request)).await
        {
            Ok(result) => result,
            Err(_) => Err(InvokeError::Call(format!(
                "call to {} timed out after {:?}",
                authority, self.call_timeout
            ))),
        };

        drop(conn);
        result
    }
}
