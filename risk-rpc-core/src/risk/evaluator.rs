use super::{RiskRequest, RiskResponse};

/// 被判定为不安全的地址
pub const UNSAFE_SENTINEL: &str = "0x0";

/// 风控规则：纯函数，无共享状态，可被并发调用
pub fn evaluate(request: &RiskRequest) -> RiskResponse {
    RiskResponse {
        is_safe: request.address != UNSAFE_SENTINEL,
    }
}
