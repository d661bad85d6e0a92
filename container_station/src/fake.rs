//! In-memory Container Station used by tests.
//!
//! Objects live in maps behind a mutex; every call is recorded so tests can
//! assert on the exact sequence of remote operations.

use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;

use crate::{
    error::ApiError,
    types::{
        AppContainer,
        AppInfo,
        ContainerInfo,
        ContainerSummary,
        NetworkAttachment,
        NewAppRequest,
        NewContainerSpec,
        NewVolumeSpec,
        VolumeInfo,
    },
    ContainerStationApi,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListContainers,
    CreateContainer { name: String, operation: Option<String> },
    InspectContainer { id: String },
    StartContainer { id: String },
    StopContainer { id: String },
    DeleteContainer { id: String, remove_anon_volumes: bool },
    CreateApplication { name: String },
    InspectApplication { name: String },
    StartApplication { name: String },
    StopApplication { name: String },
    DeleteApplication { name: String, remove_anon_volumes: bool },
    CreateVolume { name: String },
    InspectVolume { id: String },
    DeleteVolume { id: String },
}

#[derive(Debug, Default)]
struct Inner {
    next_id: usize,
    containers: BTreeMap<String, ContainerInfo>,
    apps: BTreeMap<String, AppInfo>,
    volumes: BTreeMap<String, VolumeInfo>,
    calls: Vec<Call>,
    failures: BTreeMap<&'static str, ApiError>,
}

#[derive(Debug)]
pub struct FakeContainerStation {
    created_status: String,
    inner: Mutex<Inner>,
}

impl Default for FakeContainerStation {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeContainerStation {
    /// New containers and applications report `created` until started.
    pub fn new() -> Self {
        Self::with_created_status("created")
    }

    /// Status reported by freshly created containers and applications.
    pub fn with_created_status(status: &str) -> Self {
        Self {
            created_status: status.to_string(),
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking test thread must not hide the recorded calls.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes the next call of `operation` (e.g. `"start_container"`) fail.
    pub fn fail_next(&self, operation: &'static str, error: ApiError) {
        self.lock().failures.insert(operation, error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| matches(call)).count()
    }

    pub fn container(&self, id: &str) -> Option<ContainerInfo> {
        self.lock().containers.get(id).cloned()
    }

    pub fn application(&self, name: &str) -> Option<AppInfo> {
        self.lock().apps.get(name).cloned()
    }

    pub fn volume(&self, id: &str) -> Option<VolumeInfo> {
        self.lock().volumes.get(id).cloned()
    }

    /// Changes a container behind the provider's back, as an operator would.
    pub fn set_container_status(&self, id: &str, status: &str) {
        if let Some(container) = self.lock().containers.get_mut(id) {
            container.status = status.to_string();
        }
    }

    pub fn remove_container(&self, id: &str) {
        self.lock().containers.remove(id);
    }

    pub fn remove_application(&self, name: &str) {
        self.lock().apps.remove(name);
    }

    pub fn container_not_found(id: &str) -> ApiError {
        not_found(&format!("Error response from daemon: No such container: {id}"))
    }

    pub fn application_not_found(name: &str) -> ApiError {
        not_found(&format!("cannot find compose {name}"))
    }

    pub fn volume_not_found(id: &str) -> ApiError {
        not_found(&format!("Error response from daemon: No such volume: {id}"))
    }

    fn begin(&self, operation: &'static str, call: Call) -> Result<MutexGuard<'_, Inner>, ApiError> {
        let mut inner = self.lock();
        inner.calls.push(call);
        if let Some(error) = inner.failures.remove(operation) {
            return Err(error);
        }
        Ok(inner)
    }
}

fn not_found(message: &str) -> ApiError {
    ApiError::from_status(
        404,
        serde_json::json!({"code": 1009, "message": message}).to_string(),
    )
}

fn container_from_spec(id: String, status: &str, spec: &NewContainerSpec) -> ContainerInfo {
    ContainerInfo {
        id: id.clone(),
        kind: spec.kind.clone(),
        name: spec.name.clone(),
        image: spec.image.clone(),
        status: status.to_string(),
        auto_remove: spec.auto_remove,
        tty: spec.tty,
        open_stdin: spec.open_stdin,
        network: spec.network.clone(),
        network_type: spec.network_type.clone(),
        hostname: spec.hostname.clone(),
        runtime: spec.runtime.clone(),
        privileged: spec.privileged,
        env: spec.env.clone(),
        labels: spec.labels.clone(),
        devices: spec.devices.clone(),
        volumes: spec.volumes.clone(),
        port_bindings: spec.port_bindings.clone(),
        restart_policy: spec.restart_policy.clone(),
        cpu_pin: spec.cpu_pin.clone(),
        cmd: spec.cmd.clone(),
        entrypoint: spec.entrypoint.clone(),
        dns: spec.dns.clone(),
        networks: vec![NetworkAttachment {
            id: format!("net-{id}"),
            name: spec.network.clone(),
            display_name: spec.network.clone(),
            ip_address: "10.0.3.2".to_string(),
            mac_address: "02:42:0a:00:03:02".to_string(),
            gateway: "10.0.3.1".to_string(),
            network_type: spec.network_type.clone(),
            is_static_ip: false,
        }],
        created: "2024-01-01T00:00:00Z".to_string(),
        started_at: String::new(),
    }
}

/// Service names of a compose document, in document order.
fn compose_services(yml: &str) -> Result<Vec<String>, ApiError> {
    let doc: serde_yaml::Value = serde_yaml::from_str(yml).map_err(|e| {
        ApiError::from_status(
            400,
            serde_json::json!({"code": 1000, "message": e.to_string()}).to_string(),
        )
    })?;
    Ok(doc
        .get("services")
        .and_then(|s| s.as_mapping())
        .map(|services| {
            services
                .keys()
                .filter_map(|k| k.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default())
}

#[async_trait]
impl ContainerStationApi for FakeContainerStation {
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, ApiError> {
        let inner = self.begin("list_containers", Call::ListContainers)?;
        Ok(inner
            .containers
            .values()
            .map(|c| ContainerSummary {
                id: c.id.clone(),
                name: c.name.clone(),
                kind: c.kind.clone(),
                image: c.image.clone(),
                status: c.status.clone(),
                runtime: c.runtime.clone(),
                privileged: c.privileged,
                created: c.created.clone(),
                started_at: c.started_at.clone(),
                cmd: c.cmd.clone(),
                port_bindings: c.port_bindings.clone(),
                networks: c.networks.clone(),
                ..Default::default()
            })
            .collect())
    }

    async fn create_container(&self, spec: &NewContainerSpec) -> Result<ContainerInfo, ApiError> {
        let mut inner = self.begin(
            "create_container",
            Call::CreateContainer {
                name: spec.name.clone(),
                operation: spec.operation.clone(),
            },
        )?;
        if spec.operation.as_deref() == Some("recreate") {
            let existing = inner
                .containers
                .values()
                .find(|c| c.name == spec.name)
                .map(|c| c.id.clone())
                .ok_or_else(|| FakeContainerStation::container_not_found(&spec.name))?;
            let info = container_from_spec(existing.clone(), &self.created_status, spec);
            inner.containers.insert(existing, info.clone());
            return Ok(info);
        }
        inner.next_id += 1;
        let id = format!("{:012x}", inner.next_id);
        let info = container_from_spec(id.clone(), &self.created_status, spec);
        inner.containers.insert(id, info.clone());
        Ok(info)
    }

    async fn inspect_container(&self, id: &str, _kind: &str) -> Result<ContainerInfo, ApiError> {
        let inner = self.begin("inspect_container", Call::InspectContainer { id: id.to_string() })?;
        inner
            .containers
            .get(id)
            .cloned()
            .ok_or_else(|| FakeContainerStation::container_not_found(id))
    }

    async fn start_container(&self, id: &str, _kind: &str) -> Result<(), ApiError> {
        let mut inner = self.begin("start_container", Call::StartContainer { id: id.to_string() })?;
        let container = inner
            .containers
            .get_mut(id)
            .ok_or_else(|| FakeContainerStation::container_not_found(id))?;
        container.status = "running".to_string();
        container.started_at = "2024-01-01T00:00:01Z".to_string();
        Ok(())
    }

    async fn stop_container(&self, id: &str, _kind: &str) -> Result<(), ApiError> {
        let mut inner = self.begin("stop_container", Call::StopContainer { id: id.to_string() })?;
        let container = inner
            .containers
            .get_mut(id)
            .ok_or_else(|| FakeContainerStation::container_not_found(id))?;
        container.status = "stopped".to_string();
        Ok(())
    }

    async fn delete_container(
        &self,
        id: &str,
        _kind: &str,
        remove_anon_volumes: bool,
    ) -> Result<(), ApiError> {
        let mut inner = self.begin(
            "delete_container",
            Call::DeleteContainer {
                id: id.to_string(),
                remove_anon_volumes,
            },
        )?;
        inner
            .containers
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| FakeContainerStation::container_not_found(id))
    }

    async fn create_application(&self, request: &NewAppRequest) -> Result<AppInfo, ApiError> {
        let mut inner = self.begin(
            "create_application",
            Call::CreateApplication {
                name: request.name.clone(),
            },
        )?;
        let services = compose_services(&request.yml)?;
        let containers = services
            .iter()
            .map(|service| {
                inner.next_id += 1;
                AppContainer {
                    id: format!("{:012x}", inner.next_id),
                    name: format!("{}-{}-1", request.name, service),
                }
            })
            .collect();
        let info = AppInfo {
            name: request.name.clone(),
            yml: request.yml.clone(),
            status: self.created_status.clone(),
            cpu_limit: request.cpu_limit.unwrap_or(0),
            mem_limit: request.mem_limit.unwrap_or(0),
            mem_reservation: request.mem_reservation.unwrap_or(0),
            default_url: request.default_url.clone(),
            containers,
        };
        inner.apps.insert(request.name.clone(), info.clone());
        Ok(info)
    }

    async fn inspect_application(&self, name: &str) -> Result<AppInfo, ApiError> {
        let inner = self.begin(
            "inspect_application",
            Call::InspectApplication {
                name: name.to_string(),
            },
        )?;
        inner
            .apps
            .get(name)
            .cloned()
            .ok_or_else(|| FakeContainerStation::application_not_found(name))
    }

    async fn start_application(&self, name: &str) -> Result<(), ApiError> {
        let mut inner = self.begin(
            "start_application",
            Call::StartApplication {
                name: name.to_string(),
            },
        )?;
        let app = inner
            .apps
            .get_mut(name)
            .ok_or_else(|| FakeContainerStation::application_not_found(name))?;
        app.status = "running".to_string();
        Ok(())
    }

    async fn stop_application(&self, name: &str) -> Result<(), ApiError> {
        let mut inner = self.begin(
            "stop_application",
            Call::StopApplication {
                name: name.to_string(),
            },
        )?;
        let app = inner
            .apps
            .get_mut(name)
            .ok_or_else(|| FakeContainerStation::application_not_found(name))?;
        app.status = "stopped".to_string();
        Ok(())
    }

    async fn delete_application(&self, name: &str, remove_anon_volumes: bool) -> Result<(), ApiError> {
        let mut inner = self.begin(
            "delete_application",
            Call::DeleteApplication {
                name: name.to_string(),
                remove_anon_volumes,
            },
        )?;
        inner
            .apps
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| FakeContainerStation::application_not_found(name))
    }

    async fn create_volume(&self, spec: &NewVolumeSpec) -> Result<VolumeInfo, ApiError> {
        let mut inner = self.begin(
            "create_volume",
            Call::CreateVolume {
                name: spec.name.clone(),
            },
        )?;
        inner.next_id += 1;
        let id = format!("{:012x}", inner.next_id);
        let info = VolumeInfo {
            id: id.clone(),
            kind: spec.kind.clone(),
            name: spec.name.clone(),
            driver: if spec.driver.is_empty() {
                "local".to_string()
            } else {
                spec.driver.clone()
            },
            labels: spec.labels.clone(),
            mountpoint: format!("/share/Container/volumes/{}/_data", spec.name),
            created: "2024-01-01T00:00:00Z".to_string(),
        };
        inner.volumes.insert(id, info.clone());
        Ok(info)
    }

    async fn inspect_volume(&self, id: &str, _kind: &str) -> Result<VolumeInfo, ApiError> {
        let inner = self.begin("inspect_volume", Call::InspectVolume { id: id.to_string() })?;
        inner
            .volumes
            .get(id)
            .cloned()
            .ok_or_else(|| FakeContainerStation::volume_not_found(id))
    }

    async fn delete_volume(&self, id: &str, _kind: &str) -> Result<(), ApiError> {
        let mut inner = self.begin("delete_volume", Call::DeleteVolume { id: id.to_string() })?;
        inner
            .volumes
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| FakeContainerStation::volume_not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_start() -> anyhow::Result<()> {
        let fake = FakeContainerStation::new();
        let spec = NewContainerSpec {
            kind: "docker".to_string(),
            name: "web".to_string(),
            image: "nginx:latest".to_string(),
            ..Default::default()
        };
        let info = fake.create_container(&spec).await?;
        assert_eq!(info.status, "created");

        fake.start_container(&info.id, "docker").await?;
        assert_eq!(fake.container(&info.id).unwrap().status, "running");
        assert_eq!(
            fake.calls(),
            vec![
                Call::CreateContainer {
                    name: "web".to_string(),
                    operation: None,
                },
                Call::StartContainer { id: info.id.clone() },
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_injected_failure_applies_once() -> anyhow::Result<()> {
        let fake = FakeContainerStation::new();
        fake.fail_next("list_containers", ApiError::from_status(500, "boom"));
        assert!(fake.list_containers().await.is_err());
        assert!(fake.list_containers().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_application_containers_follow_services() -> anyhow::Result<()> {
        let fake = FakeContainerStation::new();
        let request = NewAppRequest {
            name: "stack".to_string(),
            yml: "version: '3'\nservices:\n  db:\n    image: postgres\n  web:\n    image: nginx\n"
                .to_string(),
            ..Default::default()
        };
        let info = fake.create_application(&request).await?;
        assert_eq!(info.containers.len(), 2);
        assert_eq!(info.containers[0].name, "stack-db-1");

        let err = fake.inspect_application("missing").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        Ok(())
    }
}
