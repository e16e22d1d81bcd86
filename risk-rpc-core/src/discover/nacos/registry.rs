use super::{
    grouped_service_name, BeatInfo, BeatResponse, InstanceList, LoginResponse,
    BEAT_RESOURCE_NOT_FOUND, INSTANCE_BEAT_PATH, INSTANCE_LIST_PATH, INSTANCE_PATH, LOGIN_PATH,
    REGISTER_ACK,
};
use crate::discover::{LoadBalanceStrategy, LoadBalancer, RegistryClient, RegistryError, ServiceInstance};
use async_trait::async_trait;
use risk_core::{RegistryConfig, RiskErr};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

/// 注册中心返回的 token 有效期上限
const MAX_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

fn token_ttl(secs: u64) -> Duration {
    Duration::from_secs(secs.max(1)).min(MAX_TOKEN_TTL)
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// 基于 Nacos Open API (HTTP v1) 的注册中心客户端
#[derive(Clone)]
pub struct NacosRegistry {
    client: reqwest::Client,
    config: RegistryConfig,
    load_balancer: LoadBalancer,
    token: Arc<Mutex<Option<CachedToken>>>,
    beats: Arc<std::sync::Mutex<HashMap<String, JoinHandle<()>>>>,
}

impl NacosRegistry {
    /// 只构建 HTTP 客户端，不访问注册中心；注册中心是否可用由调用方重试处理
    pub fn new(config: RegistryConfig) -> Result<Self, RiskErr> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| RiskErr::config(format!("build registry http client: {}", e)))?;

        log::info!(
            "Nacos registry client: endpoints={:?} namespace={} group={} log_dir={} cache_dir={}",
            config.endpoints,
            config.namespace,
            config.group,
            config.log_dir,
            config.cache_dir
        );

        Ok(Self {
            client,
            config,
            load_balancer: LoadBalancer::new(LoadBalanceStrategy::WeightedRandom),
            token: Arc::new(Mutex::new(None)),
            beats: Arc::new(std::sync::Mutex::new(HashMap::new())),
        })
    }

    pub fn with_strategy(mut self, strategy: LoadBalanceStrategy) -> Self {
        self.load_balancer = LoadBalancer::new(strategy);
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// 停止所有心跳任务
    pub fn stop_beats(&self) {
        for (_, task) in self.lock_beats().drain() {
            task.abort();
        }
    }

    fn lock_beats(&self) -> std::sync::MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
        self.beats.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn base_params(&self, service_name: &str) -> Vec<(&'static str, String)> {
        vec![
            ("serviceName", service_name.to_string()),
            ("groupName", self.config.group.clone()),
            ("namespaceId", self.config.namespace.clone()),
        ]
    }

    fn instance_params(&self, instance: &ServiceInstance) -> Vec<(&'static str, String)> {
        let mut params = self.base_params(&instance.service_name);
        params.push(("ip", instance.address.clone()));
        params.push(("port", instance.port.to_string()));
        params
    }

    async fn access_token(&self, endpoint: &str) -> Result<Option<String>, RegistryError> {
        let (username, password) = match (&self.config.username, &self.config.password) {
            (Some(u), Some(p)) if !u.is_empty() => (u, p),
            _ => return Ok(None),
        };

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(Some(token.token.clone()));
            }
        }

        let url = format!("{}{}", endpoint, LOGIN_PATH);
        let resp = self
            .client
            .post(&url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .map_err(|e| RegistryError::Unavailable(format!("{}: {}", url, e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(if status.is_server_error() {
                RegistryError::Unavailable(format!("login {}: {} {}", url, status, body))
            } else {
                RegistryError::Rejected(format!("login {}: {} {}", url, status, body))
            });
        }

        let login: LoginResponse = resp
            .json()
            .await
            .map_err(|e| RegistryError::DecodeError(format!("login response: {}", e)))?;

        // 提前 10% 刷新
        let ttl = token_ttl(login.token_ttl);
        let expires_at = Instant::now() + (ttl - ttl / 10);
        *cached = Some(CachedToken {
            token: login.access_token.clone(),
            expires_at,
        });
        log::debug!("Nacos login succeeded at {} (ttl {}s)", endpoint, ttl.as_secs());
        Ok(Some(login.access_token))
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    /// 依次尝试每个 endpoint，返回第一个可达 endpoint 的响应体
    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        params: &[(&'static str, String)],
    ) -> Result<String, RegistryError> {
        let mut last_err = None;

        for endpoint in self.config.endpoints.iter().map(|e| e.trim().trim_end_matches('/')) {
            if endpoint.is_empty() {
                continue;
            }

            let token = match self.access_token(endpoint).await {
                Ok(token) => token,
                Err(RegistryError::Unavailable(e)) => {
                    log::debug!("Registry endpoint {} unreachable: {}", endpoint, e);
                    last_err = Some(RegistryError::Unavailable(e));
                    continue;
                }
                Err(e) => return Err(e),
            };

            let url = format!("{}{}", endpoint, path);
            let mut request = self.client.request(method.clone(), &url).query(params);
            if let Some(token) = token {
                request = request.query(&[("accessToken", token)]);
            }

            let resp = match request.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    log::debug!("Registry endpoint {} unreachable: {}", endpoint, e);
                    last_err = Some(RegistryError::Unavailable(format!("{}: {}", url, e)));
                    continue;
                }
            };

            let status = resp.status();
            let body = resp
                .text()
                .await
                .map_err(|e| RegistryError::DecodeError(format!("{}: {}", url, e)))?;

            if status.is_success() {
                return Ok(body);
            }
            if status.is_server_error() {
                last_err = Some(RegistryError::Unavailable(format!("{} {}: {}", method, url, status)));
                continue;
            }
            if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
                self.invalidate_token().await;
            }
            return Err(RegistryError::Rejected(format!("{} {}: {} {}", method, url, status, body)));
        }

        Err(last_err.unwrap_or_else(|| {
            RegistryError::Unavailable("no registry endpoint configured".to_string())
        }))
    }

    async fn beat(&self, instance: &ServiceInstance) -> Result<(), RegistryError> {
        let beat = BeatInfo {
            service_name: grouped_service_name(&self.config.group, &instance.service_name),
            ip: instance.address.clone(),
            port: instance.port,
            weight: instance.weight,
            cluster: "DEFAULT".to_string(),
            scheduled: true,
            metadata: HashMap::new(),
        };
        let beat = serde_json::to_string(&beat)
            .map_err(|e| RegistryError::DecodeError(format!("encode beat: {}", e)))?;

        let mut params = self.instance_params(instance);
        params.push(("beat", beat));

        let body = self.request(reqwest::Method::PUT, INSTANCE_BEAT_PATH, &params).await?;
        if let Ok(resp) = serde_json::from_str::<BeatResponse>(&body) {
            if resp.code == BEAT_RESOURCE_NOT_FOUND {
                log::warn!("Registry no longer knows instance {}", instance);
            }
        }
        Ok(())
    }

    /// 临时实例需要定期心跳，否则会被注册中心摘除
    fn start_beat(&self, instance: &ServiceInstance) {
        let period = self.config.beat_interval();
        if period.is_zero() {
            log::warn!("Beat interval is zero, instance {} will not be kept alive", instance);
            return;
        }

        let this = self.clone();
        let target = instance.clone();
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                if let Err(e) = this.beat(&target).await {
                    log::error!("Failed to send beat for {}: {}", target, e);
                }
            }
        });

        if let Some(old) = self.lock_beats().insert(instance.to_string(), task) {
            old.abort();
        }
    }

    fn stop_beat(&self, instance: &ServiceInstance) {
        if let Some(task) = self.lock_beats().remove(&instance.to_string()) {
            task.abort();
        }
    }
}

#[async_trait]
impl RegistryClient for NacosRegistry {
    async fn register(&self, instance: &ServiceInstance) -> Result<bool, RegistryError> {
        let mut params = self.instance_params(instance);
        params.push(("weight", instance.weight.to_string()));
        params.push(("healthy", instance.healthy.to_string()));
        params.push(("enabled", "true".to_string()));
        params.push(("ephemeral", "true".to_string()));

        let body = self.request(reqwest::Method::POST, INSTANCE_PATH, &params).await?;
        let acknowledged = body.trim() == REGISTER_ACK;
        if acknowledged {
            self.start_beat(instance);
        } else {
            log::warn!("Registry answered register of {} with `{}`", instance, body.trim());
        }
        Ok(acknowledged)
    }

    async fn deregister(&self, instance: &ServiceInstance) -> Result<(), RegistryError> {
        self.stop_beat(instance);
        let params = self.instance_params(instance);
        self.request(reqwest::Method::DELETE, INSTANCE_PATH, &params).await?;
        Ok(())
    }

    async fn find_healthy(
        &self,
        service_name: &str,
    ) -> Result<Option<ServiceInstance>, RegistryError> {
        let mut params = self.base_params(service_name);
        params.push(("healthyOnly", "true".to_string()));

        let body = self.request(reqwest::Method::GET, INSTANCE_LIST_PATH, &params).await?;
        let list: InstanceList = serde_json::from_str(&body)
            .map_err(|e| RegistryError::DecodeError(format!("instance list: {}", e)))?;

        let healthy: Vec<ServiceInstance> = list
            .hosts
            .into_iter()
            .filter(|h| h.healthy && h.enabled && h.weight > 0.0)
            .map(|h| ServiceInstance {
                service_name: service_name.to_string(),
                address: h.ip,
                port: h.port,
                weight: h.weight,
                healthy: h.healthy,
            })
            .collect();

        Ok(self.load_balancer.select(&healthy))
    }
}
