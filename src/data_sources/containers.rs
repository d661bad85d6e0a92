//! `qnap_containers`: every container known to Container Station.

use data_model::{Attribute, ContainersDataSourceModel, Diagnostics, Schema};
use tracing::debug;

use crate::{mapper::containers::summaries, provider::ProviderData, resources::container::networks_attribute};

#[derive(Debug)]
pub struct DataSourceReadResponse {
    pub state: Option<ContainersDataSourceModel>,
    pub diagnostics: Diagnostics,
}

pub fn containers_schema() -> Schema {
    let port_binding = Attribute::list_nested([
        ("host", Attribute::int32().computed()),
        ("container", Attribute::int32().computed()),
        ("protocol", Attribute::string().computed()),
        ("hostip", Attribute::string().computed()),
        ("containerip", Attribute::string().computed()),
    ])
    .computed();

    let container = Attribute::list_nested([
        ("id", Attribute::string().computed()),
        ("name", Attribute::string().computed()),
        ("type", Attribute::string().computed()),
        ("image", Attribute::string().computed()),
        ("imageid", Attribute::string().computed()),
        ("status", Attribute::string().computed()),
        ("project", Attribute::string().computed()),
        ("runtime", Attribute::string().computed()),
        ("memorylimit", Attribute::int64().computed()),
        ("cpulimit", Attribute::int64().computed()),
        ("cpupin", Attribute::int64().computed()),
        ("uuid", Attribute::string().computed()),
        ("usedbyinternalservice", Attribute::string().computed()),
        ("privileged", Attribute::bool().computed()),
        ("cpu", Attribute::float32().computed()),
        ("memory", Attribute::float32().computed()),
        ("tx", Attribute::int64().computed()),
        ("rx", Attribute::int64().computed()),
        ("read", Attribute::int64().computed()),
        ("write", Attribute::int64().computed()),
        ("created", Attribute::string().computed()),
        ("startedat", Attribute::string().computed()),
        ("cmd", Attribute::string().computed()),
        ("portbindings", port_binding),
        ("networks", networks_attribute()),
    ])
    .computed()
    .description("The containers on the host.");

    Schema::new("Lists the containers on QNAP Container Station.").attribute("containers", container)
}

#[derive(Default)]
pub struct ContainersDataSource {
    data: Option<ProviderData>,
}

impl ContainersDataSource {
    pub const TYPE_SUFFIX: &'static str = "_containers";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_name(&self, provider_type_name: &str) -> String {
        format!("{provider_type_name}{}", Self::TYPE_SUFFIX)
    }

    pub fn schema(&self) -> Schema {
        containers_schema()
    }

    pub fn configure(&mut self, data: ProviderData) {
        self.data = Some(data);
    }

    pub async fn read(&self) -> DataSourceReadResponse {
        let mut diagnostics = Diagnostics::new();
        let Some(data) = &self.data else {
            diagnostics.add_error(
                "Unconfigured QNAP client",
                "Expected a configured QNAP client. Please report this issue to the provider developers.",
            );
            return DataSourceReadResponse {
                state: None,
                diagnostics,
            };
        };

        let state = match data.api.list_containers().await {
            Ok(containers) => {
                debug!(count = containers.len(), "listed containers");
                Some(ContainersDataSourceModel {
                    containers: summaries(&containers),
                })
            }
            Err(err) => {
                diagnostics.add_error("Unable to Read QNAP Containers", err.to_string());
                None
            }
        };
        DataSourceReadResponse { state, diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use container_station::{fake::FakeContainerStation, ApiError, ContainerStationApi, NewContainerSpec};

    use super::*;
    use crate::not_found::NotFoundRules;

    #[tokio::test]
    async fn test_read_lists_containers() -> anyhow::Result<()> {
        let fake = Arc::new(FakeContainerStation::new());
        fake.create_container(&NewContainerSpec {
            kind: "docker".to_string(),
            name: "web".to_string(),
            image: "nginx:latest".to_string(),
            network: "eth0".to_string(),
            cmd: vec!["nginx".to_string(), "-g".to_string(), "daemon off;".to_string()],
            ..Default::default()
        })
        .await?;

        let mut source = ContainersDataSource::new();
        source.configure(ProviderData::new(fake.clone(), NotFoundRules::default()));
        let response = source.read().await;
        assert!(response.diagnostics.is_empty());
        let state = response.state.unwrap();
        assert_eq!(state.containers.len(), 1);
        assert_eq!(state.containers[0].name, "web");
        assert_eq!(state.containers[0].cmd, "nginx -g daemon off;");
        assert_eq!(state.containers[0].networks.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_read_error() -> anyhow::Result<()> {
        let fake = Arc::new(FakeContainerStation::new());
        fake.fail_next("list_containers", ApiError::from_status(500, "boom"));
        let mut source = ContainersDataSource::new();
        source.configure(ProviderData::new(fake, NotFoundRules::default()));

        let response = source.read().await;
        assert!(response.state.is_none());
        let error = response.diagnostics.errors().next().unwrap();
        assert_eq!(error.summary, "Unable to Read QNAP Containers");
        assert_eq!(error.detail, "status: 500, body: boom");
        Ok(())
    }

    #[test]
    fn test_type_name() {
        assert_eq!(ContainersDataSource::new().type_name("qnap"), "qnap_containers");
    }
}
