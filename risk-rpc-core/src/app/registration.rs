use crate::discover::{RegistryClient, ServiceInstance};
use log::{error, info, warn};
use risk_core::RiskErr;
use std::time::Duration;

/// 注册请求：启动时构建一次，之后不再修改
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    instance: ServiceInstance,
    retry_budget: u32,
    retry_delay: Duration,
}

impl RegistrationRequest {
    pub fn new(instance: ServiceInstance, retry_budget: u32, retry_delay: Duration) -> Self {
        Self {
            instance,
            retry_budget,
            retry_delay,
        }
    }

    pub fn instance(&self) -> &ServiceInstance {
        &self.instance
    }

    pub fn retry_budget(&self) -> u32 {
        self.retry_budget
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}

/// 注册状态机：`Idle → Attempting(i) → Registered(i) | Failed(n)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Idle,
    Attempting(u32),
    Registered(u32),
    Failed(u32),
}

impl RegistrationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RegistrationState::Registered(_) | RegistrationState::Failed(_))
    }
}

/// 带重试的注册控制器
///
/// 每次尝试之间固定等待 `retry_delay`，最多尝试 `retry_budget` 次。
/// 注册中心既没有报错、又明确确认时才算成功。
/// 进入终态后不再访问注册中心，也不会自动重新注册。
#[derive(Debug)]
pub struct RegistrationController {
    request: RegistrationRequest,
    state: RegistrationState,
}

impl RegistrationController {
    pub fn new(request: RegistrationRequest) -> Self {
        Self {
            request,
            state: RegistrationState::Idle,
        }
    }

    pub fn state(&self) -> RegistrationState {
        self.state
    }

    pub fn request(&self) -> &RegistrationRequest {
        &self.request
    }

    /// 执行注册，成功时返回成功的尝试序号
    pub async fn run<R>(&mut self, registry: &R) -> Result<u32, RiskErr>
    where
        R: RegistryClient + ?Sized,
    {
        match self.state {
            RegistrationState::Registered(attempt) => return Ok(attempt),
            RegistrationState::Failed(attempts) => {
                return Err(RiskErr::RegistrationExhausted { attempts })
            }
            _ => {}
        }

        let instance = &self.request.instance;
        let budget = self.request.retry_budget;

        for attempt in 1..=budget {
            self.state = RegistrationState::Attempting(attempt);

            match registry.register(instance).await {
                Ok(true) => {
                    info!(
                        "Register attempt {}/{}: registered instance={} outcome=ok",
                        attempt, budget, instance
                    );
                    self.state = RegistrationState::Registered(attempt);
                    return Ok(attempt);
                }
                Ok(false) => warn!(
                    "Register attempt {}/{}: instance={} outcome=not_acknowledged",
                    attempt, budget, instance
                ),
                Err(e) => warn!(
                    "Register attempt {}/{}: instance={} outcome=error err={}",
                    attempt, budget, instance, e
                ),
            }

            if attempt < budget {
                info!(
                    "Registry not ready, retrying in {:?} (next attempt {}/{})",
                    self.request.retry_delay,
                    attempt + 1,
                    budget
                );
                tokio::time::sleep(self.request.retry_delay).await;
            }
        }

        error!(
            "Registration of {} exhausted after {} attempts",
            instance, budget
        );
        self.state = RegistrationState::Failed(budget);
        Err(RiskErr::RegistrationExhausted { attempts: budget })
    }
}

/// 按请求注册实例，重试耗尽时返回 [`RiskErr::RegistrationExhausted`]
pub async fn register_with_retry<R>(registry: &R, request: RegistrationRequest) -> Result<u32, RiskErr>
where
    R: RegistryClient + ?Sized,
{
    RegistrationController::new(request).run(registry).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover::{InMemoryRegistry, RegistryError};
    use tokio::time::Instant;

    fn request(budget: u32, delay: Duration) -> RegistrationRequest {
        RegistrationRequest::new(
            ServiceInstance::new("risk-service", "risk-b-0", 8081).with_weight(10.0),
            budget,
            delay,
        )
    }

    fn assert_elapsed(started: Instant, expected: Duration) {
        let elapsed = started.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(10),
            "elapsed {:?}, expected {:?}",
            elapsed,
            expected
        );
    }

    fn failing_registry(failures: usize) -> InMemoryRegistry {
        let registry = InMemoryRegistry::new();
        for i in 0..failures {
            if i % 2 == 0 {
                registry.push_register_outcome(Err(RegistryError::Unavailable("refused".to_string())));
            } else {
                registry.push_register_outcome(Ok(false));
            }
        }
        registry
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_after_exactly_budget_attempts() {
        for budget in [1u32, 2, 5, 12] {
            let delay = Duration::from_secs(5);
            let registry = failing_registry(budget as usize + 5);
            let mut controller = RegistrationController::new(request(budget, delay));

            let started = Instant::now();
            let err = controller.run(&registry).await.unwrap_err();

            assert!(matches!(err, RiskErr::RegistrationExhausted { attempts } if attempts == budget));
            assert_eq!(registry.register_calls(), budget as usize);
            // N 次尝试之间只有 N-1 次等待
            assert_elapsed(started, delay * (budget - 1));
            assert_eq!(controller.state(), RegistrationState::Failed(budget));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_exhausts_without_waiting() {
        let registry = failing_registry(10);
        let started = Instant::now();
        let err = register_with_retry(&registry, request(3, Duration::ZERO)).await.unwrap_err();
        assert!(matches!(err, RiskErr::RegistrationExhausted { attempts: 3 }));
        assert_eq!(registry.register_calls(), 3);
        assert_elapsed(started, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_at_first_success() {
        let delay = Duration::from_secs(5);
        let registry = failing_registry(3);
        let mut controller = RegistrationController::new(request(12, delay));

        let started = Instant::now();
        let attempt = controller.run(&registry).await.unwrap();

        assert_eq!(attempt, 4);
        assert_eq!(registry.register_calls(), 4);
        assert_elapsed(started, delay * 3);
        assert_eq!(controller.state(), RegistrationState::Registered(4));
        assert_eq!(registry.instances().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_last_attempt() {
        let registry = failing_registry(11);
        let attempt = register_with_retry(&registry, request(12, Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(attempt, 12);
        assert_eq!(registry.register_calls(), 12);
    }

    #[tokio::test]
    async fn test_no_ack_is_failure() {
        let registry = InMemoryRegistry::new();
        registry.push_register_outcome(Ok(false));
        let err = register_with_retry(&registry, request(1, Duration::ZERO)).await.unwrap_err();
        assert!(matches!(err, RiskErr::RegistrationExhausted { attempts: 1 }));
        assert!(registry.instances().is_empty());
    }

    #[tokio::test]
    async fn test_terminal_state_does_not_touch_registry_again() {
        let registry = InMemoryRegistry::new();
        let mut controller = RegistrationController::new(request(3, Duration::ZERO));
        assert_eq!(controller.state(), RegistrationState::Idle);

        assert_eq!(controller.run(&registry).await.unwrap(), 1);
        assert_eq!(controller.run(&registry).await.unwrap(), 1);
        assert_eq!(registry.register_calls(), 1);
        assert!(controller.state().is_terminal());
    }

    #[tokio::test]
    async fn test_zero_budget_fails_immediately() {
        let registry = InMemoryRegistry::new();
        let err = register_with_retry(&registry, request(0, Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, RiskErr::RegistrationExhausted { attempts: 0 }));
        assert_eq!(registry.register_calls(), 0);
    }
}
