use super::ServiceInstance;
use rand::seq::IndexedRandom;
use rand::Rng;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadBalanceStrategy {
    /// 按权重随机（Nacos 客户端的默认选择方式）
    #[default]
    WeightedRandom,
    /// 始终取第一个，结果可复现
    First,
}

/// 从健康实例列表中选出一个
#[derive(Clone, Debug, Default)]
pub struct LoadBalancer {
    strategy: LoadBalanceStrategy,
}

impl LoadBalancer {
    pub fn new(strategy: LoadBalanceStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> LoadBalanceStrategy {
        self.strategy
    }

    pub fn select(&self, instances: &[ServiceInstance]) -> Option<ServiceInstance> {
        if instances.is_empty() {
            return None;
        }

        match self.strategy {
            LoadBalanceStrategy::First => instances.first().cloned(),
            LoadBalanceStrategy::WeightedRandom => {
                let total_weight: f64 = instances
                    .iter()
                    .map(|i| i.weight)
                    .filter(|w| w.is_finite() && *w > 0.0)
                    .sum();
                let mut rng = rand::rng();
                if total_weight <= 0.0 {
                    return instances.choose(&mut rng).cloned();
                }

                let chosen_weight = rng.random_range(0.0..total_weight);
                let mut accumulated_weight = 0.0;

                // 累加权重,权重大的实例占据更大的随机空间
                for instance in instances {
                    if !instance.weight.is_finite() || instance.weight <= 0.0 {
                        continue;
                    }
                    accumulated_weight += instance.weight;
                    if chosen_weight < accumulated_weight {
                        return Some(instance.clone());
                    }
                }

                // 浮点误差兜底
                instances
                    .iter()
                    .rev()
                    .find(|i| i.weight.is_finite() && i.weight > 0.0)
                    .cloned()
            }
        }
    }
}
