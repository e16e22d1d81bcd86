use thiserror::Error;

pub type Result<T> = std::result::Result<T, RiskErr>;

#[derive(Debug, Error)]
pub enum RiskErr {
    /// 注册中心不可达（瞬时错误，按固定间隔重试）
    #[error("registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// 注册中心可达，但没有健康实例
    #[error("no healthy instance of service `{0}`")]
    NoHealthyInstance(String),

    /// 传输层建连失败
    #[error("connection error: {0}")]
    ConnectionError(String),

    /// 远程调用失败或超时
    #[error("call error: {0}")]
    CallError(String),

    /// 注册重试次数耗尽，提供方进程必须退出
    #[error("registration exhausted after {attempts} attempts")]
    RegistrationExhausted { attempts: u32 },

    #[error("invalid config: {0}")]
    Config(String),

    #[error("listen on `{addr}` failed: {source}")]
    Listen {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RiskErr {
    pub fn registry_unavailable(msg: impl Into<String>) -> Self {
        RiskErr::RegistryUnavailable(msg.into())
    }

    pub fn no_healthy_instance(service_name: impl Into<String>) -> Self {
        RiskErr::NoHealthyInstance(service_name.into())
    }

    pub fn connection_error(msg: impl Into<String>) -> Self {
        RiskErr::ConnectionError(msg.into())
    }

    pub fn call_error(msg: impl Into<String>) -> Self {
        RiskErr::CallError(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        RiskErr::Config(msg.into())
    }

    /// 是否为致命错误（只有注册耗尽、启动失败会终止进程）
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RiskErr::RegistrationExhausted { .. } | RiskErr::Listen { .. } | RiskErr::Config(_)
        )
    }
}
