use super::{evaluate, RiskRequest, RiskResponse, RiskService};
use tonic::{Request, Response, Status};

/// `CheckAddress` 的服务端实现，逐个请求委托给 [`evaluate`]
#[derive(Debug, Default, Clone)]
pub struct RiskHandler;

impl RiskHandler {
    pub fn new() -> Self {
        Self
    }
}

#[tonic::async_trait]
impl RiskService for RiskHandler {
    async fn check_address(
        &self,
        request: Request<RiskRequest>,
    ) -> Result<Response<RiskResponse>, Status> {
        let remote = request
            .remote_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "-".to_string());
        let request = request.into_inner();
        let response = evaluate(&request);
        log::info!(
            "CheckAddress: address={} is_safe={} remote={}",
            request.address,
            response.is_safe,
            remote
        );
        Ok(Response::new(response))
    }
}
