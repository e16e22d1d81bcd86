//! 风控校验 RPC 契约：`risk.RiskService/CheckAddress`

mod evaluator;
#[cfg(feature = "server")]
mod handler;

pub use evaluator::{evaluate, UNSAFE_SENTINEL};
#[cfg(feature = "server")]
pub use handler::RiskHandler;

include!(concat!(env!("OUT_DIR"), "/risk.RiskService.rs"));

pub use risk_service_client::RiskServiceClient;
pub use risk_service_server::{RiskService, RiskServiceServer};

/// 校验请求
#[derive(Clone, PartialEq, prost::Message)]
pub struct RiskRequest {
    #[prost(string, tag = "1")]
    pub address: String,
}

/// 校验结果
#[derive(Clone, PartialEq, prost::Message)]
pub struct RiskResponse {
    #[prost(bool, tag = "1")]
    pub is_safe: bool,
}

impl RiskRequest {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}
