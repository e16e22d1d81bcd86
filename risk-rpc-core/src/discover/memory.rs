use super::{LoadBalanceStrategy, LoadBalancer, RegistryClient, RegistryError, ServiceInstance};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// 进程内注册中心，用于测试和本地联调
///
/// 可以模拟注册中心宕机（[`set_available`](Self::set_available)）、
/// 实例健康状态抖动（[`set_healthy`](Self::set_healthy)），
/// 以及预设的注册结果（[`push_register_outcome`](Self::push_register_outcome)）。
/// 查询结果固定取第一个健康实例，注册中心状态不变时解析结果不变。
#[derive(Debug)]
pub struct InMemoryRegistry {
    instances: Mutex<Vec<ServiceInstance>>,
    register_script: Mutex<VecDeque<Result<bool, RegistryError>>>,
    available: AtomicBool,
    load_balancer: LoadBalancer,
    register_calls: AtomicUsize,
    find_calls: AtomicUsize,
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self {
            instances: Mutex::new(Vec::new()),
            register_script: Mutex::new(VecDeque::new()),
            available: AtomicBool::new(true),
            load_balancer: LoadBalancer::new(LoadBalanceStrategy::First),
            register_calls: AtomicUsize::new(0),
            find_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_instances(instances: impl IntoIterator<Item = ServiceInstance>) -> Self {
        let registry = Self::new();
        registry.lock_instances().extend(instances);
        registry
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// 直接写入实例（绕过注册流程）
    pub fn insert(&self, instance: ServiceInstance) {
        let mut instances = self.lock_instances();
        instances.retain(|i| !i.same_identity(&instance));
        instances.push(instance);
    }

    /// 直接移除实例，返回实例是否存在
    pub fn remove(&self, instance: &ServiceInstance) -> bool {
        let mut instances = self.lock_instances();
        let before = instances.len();
        instances.retain(|i| !i.same_identity(instance));
        instances.len() != before
    }

    /// 修改实例健康状态，返回实例是否存在
    pub fn set_healthy(&self, instance: &ServiceInstance, healthy: bool) -> bool {
        let mut instances = self.lock_instances();
        match instances.iter_mut().find(|i| i.same_identity(instance)) {
            Some(found) => {
                found.healthy = healthy;
                true
            }
            None => false,
        }
    }

    /// 预设下一次 `register` 的结果，按入队顺序消费；队列为空时按可用性正常处理
    pub fn push_register_outcome(&self, outcome: Result<bool, RegistryError>) {
        self.lock_script().push_back(outcome);
    }

    pub fn instances(&self) -> Vec<ServiceInstance> {
        self.lock_instances().clone()
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), RegistryError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RegistryError::Unavailable("in-memory registry is down".to_string()))
        }
    }

    fn lock_instances(&self) -> std::sync::MutexGuard<'_, Vec<ServiceInstance>> {
        self.instances.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<bool, RegistryError>>> {
        self.register_script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl RegistryClient for InMemoryRegistry {
    async fn register(&self, instance: &ServiceInstance) -> Result<bool, RegistryError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(outcome) = self.lock_script().pop_front() {
            if !matches!(outcome, Ok(true)) {
                return outcome;
            }
        } else {
            self.check_available()?;
        }

        let mut instances = self.lock_instances();
        match instances.iter_mut().find(|i| i.same_identity(instance)) {
            Some(existing) => *existing = instance.clone(),
            None => instances.push(instance.clone()),
        }
        Ok(true)
    }

    async fn deregister(&self, instance: &ServiceInstance) -> Result<(), RegistryError> {
        self.check_available()?;
        self.lock_instances().retain(|i| !i.same_identity(instance));
        Ok(())
    }

    async fn find_healthy(
        &self,
        service_name: &str,
    ) -> Result<Option<ServiceInstance>, RegistryError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let healthy: Vec<ServiceInstance> = self
            .lock_instances()
            .iter()
            .filter(|i| i.service_name == service_name && i.healthy)
            .cloned()
            .collect();
        Ok(self.load_balancer.select(&healthy))
    }
}
