use crate::error::{Result, RiskErr};
use figment::providers::{Env, Format, Json, Serialized};
use figment::Figment;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::time::Duration;

/// 配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "RISK_CONFIG";

/// 环境变量前缀，嵌套字段用 `__` 分隔，例如 `RISK_REGISTRY__ENDPOINTS`
pub const ENV_PREFIX: &str = "RISK_";

const LOOPBACK_HOST: &str = "127.0.0.1";

pub const DEFAULT_SERVICE_NAME: &str = "risk-service";

/// 注册中心（Nacos）客户端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// 注册中心地址列表，例如 `http://nacos:8848`；也接受逗号分隔的字符串
    #[serde(deserialize_with = "one_or_many")]
    pub endpoints: Vec<String>,
    pub namespace: String,
    pub group: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_ms: u64,
    /// 临时实例心跳间隔
    pub beat_interval_ms: u64,
    pub log_dir: String,
    pub cache_dir: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["http://nacos:8848".to_string()],
            namespace: "public".to_string(),
            group: "DEFAULT_GROUP".to_string(),
            username: Some("nacos".to_string()),
            password: Some("nacos".to_string()),
            timeout_ms: 5000,
            beat_interval_ms: 5000,
            log_dir: "/tmp/nacos/log".to_string(),
            cache_dir: "/tmp/nacos/cache".to_string(),
        }
    }
}

impl RegistryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn beat_interval(&self) -> Duration {
        Duration::from_millis(self.beat_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoints.iter().all(|e| e.trim().is_empty()) {
            return Err(RiskErr::config("registry endpoints must not be empty"));
        }
        if self.namespace.is_empty() {
            return Err(RiskErr::config("registry namespace must not be empty"));
        }
        Ok(())
    }
}

/// 服务提供方配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub registry: RegistryConfig,
    pub service_name: String,
    pub listen_host: String,
    pub port: u16,
    /// 注册到注册中心的地址，缺省时使用主机名
    pub advertise_host: Option<String>,
    pub weight: f64,
    pub retry_budget: u32,
    pub retry_delay_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            listen_host: "0.0.0.0".to_string(),
            port: 8081,
            advertise_host: None,
            weight: 10.0,
            retry_budget: 12,
            retry_delay_ms: 5000,
        }
    }
}

impl ProviderConfig {
    /// 默认值 → `RISK_CONFIG` 指向的 JSON 文件（可选）→ `RISK_*` 环境变量
    pub fn load() -> Result<Self> {
        let config: Self = load_layered(config_path_from_env().as_deref())?;
        config.validate()?;
        Ok(config)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.port)
    }

    /// 对外宣告的主机：配置值 > 本机主机名 > 回环地址
    pub fn resolve_advertise_host(&self) -> String {
        self.advertise_host
            .clone()
            .filter(|h| !h.is_empty())
            .or_else(machine_hostname)
            .unwrap_or_else(|| {
                log::warn!("Cannot resolve hostname, advertising {}", LOOPBACK_HOST);
                LOOPBACK_HOST.to_string()
            })
    }

    pub fn validate(&self) -> Result<()> {
        self.registry.validate()?;
        if self.service_name.is_empty() {
            return Err(RiskErr::config("service_name must not be empty"));
        }
        if self.port == 0 {
            return Err(RiskErr::config("port must not be 0"));
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(RiskErr::config(format!("invalid weight {}", self.weight)));
        }
        Ok(())
    }
}

/// 服务消费方配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    pub registry: RegistryConfig,
    pub service_name: String,
    /// 未发现健康实例（或注册中心不可达）时的重试间隔
    pub not_found_interval_ms: u64,
    /// 正常调用节奏
    pub poll_interval_ms: u64,
    pub connect_timeout_ms: u64,
    pub call_timeout_ms: u64,
    /// 每次调用发送的待校验地址
    pub probe_address: String,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            not_found_interval_ms: 3000,
            poll_interval_ms: 5000,
            connect_timeout_ms: 5000,
            call_timeout_ms: 10_000,
            probe_address: "0x123456".to_string(),
        }
    }
}

impl ConsumerConfig {
    pub fn load() -> Result<Self> {
        let config: Self = load_layered(config_path_from_env().as_deref())?;
        config.validate()?;
        Ok(config)
    }

    pub fn not_found_interval(&self) -> Duration {
        Duration::from_millis(self.not_found_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        self.registry.validate()?;
        if self.service_name.is_empty() {
            return Err(RiskErr::config("service_name must not be empty"));
        }
        if self.connect_timeout_ms == 0 {
            return Err(RiskErr::config("connect_timeout_ms must be positive"));
        }
        if self.call_timeout_ms == 0 {
            return Err(RiskErr::config("call_timeout_ms must be positive"));
        }
        Ok(())
    }
}

/// 分层加载配置：`T::default()` → JSON 文件 → `RISK_*` 环境变量
///
/// 指定了文件但文件不存在时返回错误；未指定文件时只用默认值和环境变量。
pub fn load_layered<T>(path: Option<&Path>) -> Result<T>
where
    T: Serialize + for<'de> Deserialize<'de> + Default,
{
    let mut figment = Figment::from(Serialized::defaults(T::default()));
    if let Some(path) = path {
        if !path.is_file() {
            return Err(RiskErr::config(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        log::info!("Loading config from {}", path.display());
        figment = figment.merge(Json::file_exact(path));
    }

    figment
        .merge(Env::prefixed(ENV_PREFIX).split("__").ignore(&["config"]))
        .extract()
        .map_err(|e| RiskErr::config(e.to_string()))
}

fn config_path_from_env() -> Option<std::path::PathBuf> {
    std::env::var_os(CONFIG_PATH_ENV)
        .filter(|p| !p.is_empty())
        .map(Into::into)
}

fn machine_hostname() -> Option<String> {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.is_empty())
}

/// 列表字段既可以是数组，也可以是逗号分隔的字符串（便于环境变量覆盖）
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    let items = match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(joined) => joined.split(',').map(str::to_string).collect(),
        OneOrMany::Many(items) => items,
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}
