//! Wire structures of the Container Station v3 REST API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Every successful response wraps its payload in `{"data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PortBinding {
    pub host: i32,
    pub container: i32,
    pub protocol: String,
    #[serde(rename = "hostIp")]
    pub host_ip: String,
    #[serde(rename = "containerIp")]
    pub container_ip: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VolumeMount {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub container: String,
    pub source: String,
    pub destination: String,
    pub permission: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Device {
    pub name: String,
    pub permission: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RestartPolicy {
    pub name: String,
    pub maximum_retry_count: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CpuPin {
    #[serde(rename = "cpuIDs")]
    pub cpu_ids: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkAttachment {
    pub id: String,
    pub name: String,
    pub display_name: String,
    #[serde(rename = "ipAddress")]
    pub ip_address: String,
    pub mac_address: String,
    pub gateway: String,
    pub network_type: String,
    #[serde(rename = "isStaticIP")]
    pub is_static_ip: bool,
}

/// Body of `POST /containers`.
///
/// `operation` is `"recreate"` when an existing container is rebuilt from a
/// new definition; it is omitted for plain creates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContainerSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub image: String,
    pub auto_remove: bool,
    pub tty: bool,
    pub open_stdin: bool,
    pub network: String,
    pub network_type: String,
    pub hostname: String,
    pub runtime: String,
    pub privileged: bool,
    pub env: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub devices: Vec<Device>,
    pub volumes: Vec<VolumeMount>,
    pub port_bindings: Vec<PortBinding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<RestartPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_pin: Option<CpuPin>,
    pub cmd: Vec<String>,
    pub entrypoint: Vec<String>,
    pub dns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
}

/// A container as returned by create and inspect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub image: String,
    pub status: String,
    pub auto_remove: bool,
    pub tty: bool,
    pub open_stdin: bool,
    pub network: String,
    pub network_type: String,
    pub hostname: String,
    pub runtime: String,
    pub privileged: bool,
    pub env: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub devices: Vec<Device>,
    pub volumes: Vec<VolumeMount>,
    pub port_bindings: Vec<PortBinding>,
    pub restart_policy: Option<RestartPolicy>,
    pub cpu_pin: Option<CpuPin>,
    pub cmd: Vec<String>,
    pub entrypoint: Vec<String>,
    pub dns: Vec<String>,
    pub networks: Vec<NetworkAttachment>,
    pub created: String,
    pub started_at: String,
}

/// One row of `GET /containers`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub image: String,
    #[serde(rename = "imageID")]
    pub image_id: String,
    pub status: String,
    pub project: String,
    pub runtime: String,
    pub mem_limit: i64,
    pub cpu_limit: i64,
    pub cpupin: i64,
    pub uuid: String,
    pub used_by_internal_service: String,
    pub privileged: bool,
    pub cpu: f64,
    pub memory: f64,
    pub tx: i64,
    pub rx: i64,
    pub read: i64,
    pub write: i64,
    pub created: String,
    pub started_at: String,
    pub cmd: Vec<String>,
    pub port_bindings: Vec<PortBinding>,
    pub networks: Vec<NetworkAttachment>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultUrl {
    pub service: String,
    pub port: i32,
}

/// Body of `POST /apps`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppRequest {
    pub name: String,
    pub yml: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_limit: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mem_limit: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mem_reservation: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_url: Option<DefaultUrl>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppContainer {
    pub id: String,
    pub name: String,
}

/// An application as returned by create and inspect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppInfo {
    pub name: String,
    pub yml: String,
    pub status: String,
    pub cpu_limit: i32,
    pub mem_limit: i32,
    pub mem_reservation: i32,
    pub default_url: Option<DefaultUrl>,
    pub containers: Vec<AppContainer>,
}

/// Body of `POST /volumes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVolumeSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub driver: String,
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub driver: String,
    pub labels: BTreeMap<String, String>,
    pub mountpoint: String,
    pub created: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: String,
}
