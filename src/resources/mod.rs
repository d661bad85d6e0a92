pub mod application;
pub mod container;
pub mod volume;

use async_trait::async_trait;
use data_model::{Diagnostics, Schema};

use crate::{
    lifecycle::{Controller, CreateResponse, DeleteResponse, ReadResponse, ResourceKind, UpdateResponse},
    provider::ProviderData,
};
use application::ApplicationKind;
use container::ContainerKind;
use volume::VolumeKind;

/// What the host calls on a managed resource.
#[async_trait]
pub trait Resource: Send + Sync {
    type Model: Send + Sync;

    fn type_name(&self, provider_type_name: &str) -> String;

    fn schema(&self) -> &Schema;

    /// Hands over the shared client. Until then every operation fails with
    /// an "Unconfigured QNAP client" diagnostic.
    fn configure(&mut self, data: ProviderData);

    fn validate_config(&self, config: &Self::Model) -> Diagnostics;

    async fn create(&self, plan: &Self::Model) -> CreateResponse<Self::Model>;

    async fn read(&self, prior: &Self::Model) -> ReadResponse<Self::Model>;

    async fn update(&self, prior: &Self::Model, plan: &Self::Model) -> UpdateResponse<Self::Model>;

    async fn delete(&self, state: &Self::Model) -> DeleteResponse;
}

#[async_trait]
impl<K: ResourceKind> Resource for Controller<K> {
    type Model = K::Model;

    fn type_name(&self, provider_type_name: &str) -> String {
        Controller::type_name(self, provider_type_name)
    }

    fn schema(&self) -> &Schema {
        Controller::schema(self)
    }

    fn configure(&mut self, data: ProviderData) {
        Controller::configure(self, data)
    }

    fn validate_config(&self, config: &K::Model) -> Diagnostics {
        Controller::validate_config(self, config)
    }

    async fn create(&self, plan: &K::Model) -> CreateResponse<K::Model> {
        Controller::create(self, plan).await
    }

    async fn read(&self, prior: &K::Model) -> ReadResponse<K::Model> {
        Controller::read(self, prior).await
    }

    async fn update(&self, prior: &K::Model, plan: &K::Model) -> UpdateResponse<K::Model> {
        Controller::update(self, prior, plan).await
    }

    async fn delete(&self, state: &K::Model) -> DeleteResponse {
        Controller::delete(self, state).await
    }
}

/// The resources the provider registers, one variant per resource type.
pub enum RegisteredResource {
    Container(Controller<ContainerKind>),
    Application(Controller<ApplicationKind>),
    Volume(Controller<VolumeKind>),
}

impl RegisteredResource {
    pub fn all() -> Vec<RegisteredResource> {
        vec![
            RegisteredResource::Container(Controller::new(ContainerKind)),
            RegisteredResource::Application(Controller::new(ApplicationKind)),
            RegisteredResource::Volume(Controller::new(VolumeKind)),
        ]
    }

    pub fn type_name(&self, provider_type_name: &str) -> String {
        match self {
            RegisteredResource::Container(c) => Resource::type_name(c, provider_type_name),
            RegisteredResource::Application(c) => Resource::type_name(c, provider_type_name),
            RegisteredResource::Volume(c) => Resource::type_name(c, provider_type_name),
        }
    }

    pub fn schema(&self) -> &Schema {
        match self {
            RegisteredResource::Container(c) => Resource::schema(c),
            RegisteredResource::Application(c) => Resource::schema(c),
            RegisteredResource::Volume(c) => Resource::schema(c),
        }
    }

    pub fn configure(&mut self, data: ProviderData) {
        match self {
            RegisteredResource::Container(c) => Resource::configure(c, data),
            RegisteredResource::Application(c) => Resource::configure(c, data),
            RegisteredResource::Volume(c) => Resource::configure(c, data),
        }
    }
}
