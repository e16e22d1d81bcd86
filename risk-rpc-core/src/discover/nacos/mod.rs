mod registry;
mod tests;

pub use registry::NacosRegistry;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub(crate) const LOGIN_PATH: &str = "/nacos/v1/auth/login";
pub(crate) const INSTANCE_PATH: &str = "/nacos/v1/ns/instance";
pub(crate) const INSTANCE_LIST_PATH: &str = "/nacos/v1/ns/instance/list";
pub(crate) const INSTANCE_BEAT_PATH: &str = "/nacos/v1/ns/instance/beat";

/// 注册成功时 Nacos 返回的响应体
pub(crate) const REGISTER_ACK: &str = "ok";

/// beat 响应码：实例已不存在
pub(crate) const BEAT_RESOURCE_NOT_FOUND: i32 = 20404;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    #[serde(default)]
    token_ttl: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceList {
    #[serde(default)]
    hosts: Vec<NacosHost>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NacosHost {
    ip: String,
    port: u16,
    #[serde(default)]
    weight: f64,
    #[serde(default)]
    healthy: bool,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct BeatInfo {
    service_name: String,
    ip: String,
    port: u16,
    weight: f64,
    cluster: String,
    scheduled: bool,
    metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BeatResponse {
    #[serde(default)]
    code: i32,
}

/// Nacos 内部的服务全名 `group@@service`
fn grouped_service_name(group: &str, service_name: &str) -> String {
    format!("{}@@{}", group, service_name)
}
