//! Terraform provider for QNAP Container Station.
//!
//! The host side of the plugin protocol drives [`QnapProvider`] and the
//! resources and data sources it registers. Everything that talks to the NAS
//! goes through [`container_station::ContainerStationApi`].

pub mod compose;
pub mod config;
pub mod data_sources;
pub mod lifecycle;
pub mod mapper;
pub mod not_found;
pub mod provider;
pub mod resources;
pub mod tracing;

#[cfg(test)]
mod testing;

pub use data_sources::ContainersDataSource;
pub use lifecycle::{ChangeDecision, Controller, ReadOutcome, ResourceKind};
pub use provider::{ProviderConfigModel, ProviderData, QnapProvider};
pub use resources::{RegisteredResource, Resource};
