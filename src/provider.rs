//! Provider root: resolves connection settings, builds the shared client
//! and lists what the provider serves.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use container_station::{ContainerStationApi, Credentials, HttpClient};
use data_model::{Attr, Attribute, AttributePath, Diagnostics, Schema};
use tracing::{debug, info};

use crate::{
    config::{ExplicitSettings, ProviderConfig},
    data_sources::ContainersDataSource,
    not_found::NotFoundRules,
    resources::RegisteredResource,
    tracing::setup_tracing,
};

pub const PROVIDER_TYPE_NAME: &str = "qnap";

/// The provider block as configured by the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderConfigModel {
    pub host: Attr<String>,
    pub username: Attr<String>,
    pub password: Attr<String>,
}

/// Everything a resource or data source needs after `configure`.
#[derive(Clone)]
pub struct ProviderData {
    pub api: Arc<dyn ContainerStationApi>,
    pub not_found: Arc<NotFoundRules>,
}

impl ProviderData {
    pub fn new(api: Arc<dyn ContainerStationApi>, not_found: NotFoundRules) -> Self {
        Self {
            api,
            not_found: Arc::new(not_found),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMetadata {
    pub type_name: &'static str,
    pub version: String,
}

#[derive(Debug, Clone)]
pub struct QnapProvider {
    version: String,
    config_path: Option<PathBuf>,
}

struct Setting<'a> {
    attribute: &'static str,
    label: &'static str,
    value: &'a Attr<String>,
}

impl Setting<'_> {
    fn env_var(&self) -> String {
        format!("QNAP_{}", self.attribute.to_uppercase())
    }
}

impl QnapProvider {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            config_path: None,
        }
    }

    /// Additional YAML settings (timeouts, logging, not-found rules) read
    /// during `configure`.
    pub fn with_config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            type_name: PROVIDER_TYPE_NAME,
            version: self.version.clone(),
        }
    }

    pub fn schema(&self) -> Schema {
        Schema::new("Interact with QNAP Container Station.")
            .attribute(
                "host",
                Attribute::string()
                    .optional()
                    .description("URI for the QNAP Container Station API. May also be provided via QNAP_HOST environment variable."),
            )
            .attribute(
                "username",
                Attribute::string()
                    .optional()
                    .description("Username for the QNAP Container Station API. May also be provided via QNAP_USERNAME environment variable."),
            )
            .attribute(
                "password",
                Attribute::string()
                    .optional()
                    .sensitive()
                    .description("Password for the QNAP Container Station API. May also be provided via QNAP_PASSWORD environment variable."),
            )
    }

    /// Resolves settings and builds the client shared by every resource and
    /// data source. Fails before any network traffic when a value is unknown
    /// or missing.
    pub fn configure(&self, config: &ProviderConfigModel) -> Result<ProviderData, Diagnostics> {
        let mut diags = Diagnostics::new();
        let settings = [
            Setting {
                attribute: "host",
                label: "Host",
                value: &config.host,
            },
            Setting {
                attribute: "username",
                label: "Username",
                value: &config.username,
            },
            Setting {
                attribute: "password",
                label: "Password",
                value: &config.password,
            },
        ];

        for setting in settings.iter().filter(|s| s.value.is_unknown()) {
            diags.add_attribute_error(
                AttributePath::root(setting.attribute),
                format!("Unknown qnap API {}", setting.label),
                format!(
                    "The provider cannot create the qnap API client as there is an unknown configuration value for the qnap API {}. \
                     Either target apply the source of the value first, set the value statically in the configuration, or use the {} environment variable.",
                    setting.attribute,
                    setting.env_var()
                ),
            );
        }
        if diags.has_error() {
            return Err(diags);
        }

        let explicit = ExplicitSettings {
            host: config.host.value().cloned(),
            username: config.username.value().cloned(),
            password: config.password.value().cloned(),
        };
        let resolved = match ProviderConfig::resolve(self.config_path.as_deref(), &explicit) {
            Ok(resolved) => resolved,
            Err(err) => {
                diags.add_error("Invalid qnap provider configuration", err.to_string());
                return Err(diags);
            }
        };

        for (setting, value) in settings
            .iter()
            .zip([&resolved.host, &resolved.username, &resolved.password])
        {
            if value.is_empty() {
                diags.add_attribute_error(
                    AttributePath::root(setting.attribute),
                    format!("Missing qnap API {}", setting.label),
                    format!(
                        "The provider cannot create the qnap API client as there is a missing or empty value for the qnap API {}. \
                         Set the {} value in the configuration or use the {} environment variable. \
                         If either is already set, ensure the value is not empty.",
                        setting.attribute,
                        setting.attribute,
                        setting.env_var()
                    ),
                );
            }
        }
        if diags.has_error() {
            return Err(diags);
        }

        if let Err(err) = setup_tracing(&resolved) {
            debug!("tracing setup failed: {err:?}");
        }
        debug!(host = %resolved.host, username = %resolved.username, "creating qnap client");

        let credentials = Credentials {
            username: resolved.username.clone(),
            password: resolved.password.clone(),
        };
        let client = match HttpClient::new(&resolved.host, credentials, resolved.request_timeout()) {
            Ok(client) => client,
            Err(err) => {
                diags.add_error(
                    "Unable to Create qnap API Client",
                    format!(
                        "An unexpected error occurred when creating the qnap API client. \
                         If the error is not clear, please contact the provider developers.\n\n\
                         qnap Client Error: {err}"
                    ),
                );
                return Err(diags);
            }
        };
        info!(base_url = %client.base_url(), "configured qnap client");

        Ok(ProviderData::new(Arc::new(client), resolved.not_found_rules))
    }

    pub fn resources(&self) -> Vec<RegisteredResource> {
        RegisteredResource::all()
    }

    pub fn data_sources(&self) -> Vec<ContainersDataSource> {
        vec![ContainersDataSource::new()]
    }
}

#[cfg(test)]
mod tests {
    use container_station::ApiError;
    use figment::Jail;

    use super::*;
    use crate::not_found::ObjectKind;

    fn summaries(diags: &Diagnostics) -> Vec<String> {
        diags.errors().map(|d| d.summary.clone()).collect()
    }

    #[test]
    fn test_metadata_and_registrations() {
        let provider = QnapProvider::new("0.2.0");
        assert_eq!(provider.metadata().type_name, "qnap");
        assert_eq!(provider.metadata().version, "0.2.0");

        let names: Vec<String> = provider
            .resources()
            .iter()
            .map(|r| r.type_name(PROVIDER_TYPE_NAME))
            .collect();
        assert_eq!(names, vec!["qnap_container", "qnap_app", "qnap_volume"]);
        let sources: Vec<String> = provider
            .data_sources()
            .iter()
            .map(|d| d.type_name(PROVIDER_TYPE_NAME))
            .collect();
        assert_eq!(sources, vec!["qnap_containers"]);

        let schema = provider.schema();
        assert!(schema.attributes["password"].sensitive);
        assert!(!schema.attributes["host"].sensitive);
    }

    #[test]
    fn test_unknown_values_are_rejected() {
        let provider = QnapProvider::new("test");
        let config = ProviderConfigModel {
            host: Attr::Unknown,
            username: "admin".into(),
            password: Attr::Unknown,
        };
        let Err(diags) = provider.configure(&config) else {
            panic!("configure must fail");
        };
        assert_eq!(
            summaries(&diags),
            vec!["Unknown qnap API Host", "Unknown qnap API Password"]
        );
        let detail = &diags.errors().next().unwrap().detail;
        assert!(detail.contains("QNAP_HOST environment variable"));
    }

    #[test]
    fn test_missing_values_are_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("QNAP_USERNAME", "admin");
            let provider = QnapProvider::new("test");
            let config = ProviderConfigModel {
                host: "".into(),
                username: Attr::Null,
                password: "".into(),
            };
            let Err(diags) = provider.configure(&config) else {
                panic!("configure must fail");
            };
            assert_eq!(
                summaries(&diags),
                vec!["Missing qnap API Host", "Missing qnap API Password"]
            );
            let paths: Vec<String> = diags
                .errors()
                .map(|d| d.attribute.as_ref().unwrap().to_string())
                .collect();
            assert_eq!(paths, vec!["host", "password"]);
            Ok(())
        });
    }

    #[test]
    fn test_environment_fallback() {
        Jail::expect_with(|jail| {
            jail.set_env("QNAP_HOST", "nas.local:8080");
            jail.set_env("QNAP_USERNAME", "admin");
            jail.set_env("QNAP_PASSWORD", "secret");
            let provider = QnapProvider::new("test");
            let data = provider.configure(&ProviderConfigModel::default());
            assert!(data.is_ok());
            Ok(())
        });
    }

    #[test]
    fn test_invalid_host() {
        Jail::expect_with(|_jail| {
            let provider = QnapProvider::new("test");
            let config = ProviderConfigModel {
                host: "http://[::1".into(),
                username: "admin".into(),
                password: "secret".into(),
            };
            let Err(diags) = provider.configure(&config) else {
                panic!("configure must fail");
            };
            let error = diags.errors().next().unwrap();
            assert_eq!(error.summary, "Unable to Create qnap API Client");
            assert!(error.detail.contains("qnap Client Error: "));
            Ok(())
        });
    }

    #[test]
    fn test_config_file_rules() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "qnap.yaml",
                "request_timeout_secs: 5\nnot_found_rules:\n  - kind: volume\n    status: 404\n    code: 1009\n    message_contains: gone\n",
            )?;
            let provider = QnapProvider::new("test").with_config_path("qnap.yaml");
            let config = ProviderConfigModel {
                host: "nas.local".into(),
                username: "admin".into(),
                password: "secret".into(),
            };
            let Ok(data) = provider.configure(&config) else {
                panic!("configure must succeed");
            };
            let gone = ApiError::from_status(404, r#"{"code":1009,"message":"volume gone"}"#);
            assert!(data.not_found.matches(ObjectKind::Volume, &gone));
            let container_gone = ApiError::from_status(
                404,
                r#"{"code":1009,"message":"No such container: 7f3a"}"#,
            );
            assert!(!data.not_found.matches(ObjectKind::Container, &container_gone));
            Ok(())
        });
    }
}
