//! Client for the QNAP Container Station REST API.
//!
//! [`ContainerStationApi`] is the seam the provider talks through. The
//! production implementation is [`HttpClient`]; tests use
//! [`fake::FakeContainerStation`] behind the `testing` feature.

pub mod error;
pub mod http;
mod session;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod fake;

use async_trait::async_trait;

pub use error::ApiError;
pub use http::{Credentials, HttpClient};
pub use types::*;

/// Operations the provider needs from Container Station.
///
/// Containers are addressed by id and container type (for example
/// `docker`), applications by name. Every call is a single request/response
/// exchange from the caller's point of view; implementations must be safe to
/// share across concurrently running resource operations.
#[async_trait]
pub trait ContainerStationApi: Send + Sync {
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, ApiError>;

    /// Creates a container, or rebuilds an existing one when
    /// `spec.operation` is `"recreate"`.
    async fn create_container(&self, spec: &NewContainerSpec) -> Result<ContainerInfo, ApiError>;

    async fn inspect_container(&self, id: &str, kind: &str) -> Result<ContainerInfo, ApiError>;

    async fn start_container(&self, id: &str, kind: &str) -> Result<(), ApiError>;

    async fn stop_container(&self, id: &str, kind: &str) -> Result<(), ApiError>;

    /// Deletes a container. `remove_anon_volumes` also removes the anonymous
    /// volumes it created.
    async fn delete_container(
        &self,
        id: &str,
        kind: &str,
        remove_anon_volumes: bool,
    ) -> Result<(), ApiError>;

    async fn create_application(&self, request: &NewAppRequest) -> Result<AppInfo, ApiError>;

    async fn inspect_application(&self, name: &str) -> Result<AppInfo, ApiError>;

    async fn start_application(&self, name: &str) -> Result<(), ApiError>;

    async fn stop_application(&self, name: &str) -> Result<(), ApiError>;

    async fn delete_application(&self, name: &str, remove_anon_volumes: bool) -> Result<(), ApiError>;

    async fn create_volume(&self, spec: &NewVolumeSpec) -> Result<VolumeInfo, ApiError>;

    async fn inspect_volume(&self, id: &str, kind: &str) -> Result<VolumeInfo, ApiError>;

    async fn delete_volume(&self, id: &str, kind: &str) -> Result<(), ApiError>;
}
