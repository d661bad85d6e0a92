use std::{fmt, path::Path, time::Duration};

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::not_found::NotFoundRules;

/// Settings the provider resolves before building its API client.
///
/// Values come from, in increasing priority: defaults, an optional YAML file,
/// `QNAP_*` environment variables, and the provider block.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, deserialize_with = "scalar_string")]
    pub host: String,
    #[serde(default, deserialize_with = "scalar_string")]
    pub username: String,
    #[serde(default, deserialize_with = "scalar_string")]
    pub password: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub structured_logging: bool,
    #[serde(default)]
    pub not_found_rules: NotFoundRules,
}

// The environment provider parses values, so `QNAP_PASSWORD=1234` arrives as
// a number.
fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Int(i64),
        Float(f64),
        Bool(bool),
    }
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(s) => s,
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Bool(b) => b.to_string(),
    })
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            host: String::new(),
            username: String::new(),
            password: String::new(),
            request_timeout_secs: default_request_timeout_secs(),
            structured_logging: false,
            not_found_rules: NotFoundRules::default(),
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("structured_logging", &self.structured_logging)
            .field("not_found_rules", &self.not_found_rules)
            .finish()
    }
}

/// Values set in the provider block. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplicitSettings {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProviderConfig {
    fn figment(base: Figment) -> Figment {
        base.merge(Env::prefixed("QNAP_"))
    }

    /// Resolves the full configuration. Explicit provider block values win
    /// over the environment, which wins over the file and defaults.
    pub fn resolve(path: Option<&Path>, explicit: &ExplicitSettings) -> Result<ProviderConfig> {
        let mut figment = Figment::from(Serialized::defaults(ProviderConfig::default()));
        if let Some(path) = path {
            let config_str = std::fs::read_to_string(path)?;
            figment = figment.merge(Yaml::string(&config_str));
        }
        let mut figment = Self::figment(figment);
        if let Some(host) = &explicit.host {
            figment = figment.merge(Serialized::default("host", host));
        }
        if let Some(username) = &explicit.username {
            figment = figment.merge(Serialized::default("username", username));
        }
        if let Some(password) = &explicit.password {
            figment = figment.merge(Serialized::default("password", password));
        }
        let config: ProviderConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks only. Missing credentials are reported per
    /// attribute by the provider, not here.
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("request_timeout_secs must be greater than 0"));
        }
        self.not_found_rules.validate()?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn structured_logging(&self) -> bool {
        self.structured_logging
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use container_station::ApiError;

    use super::*;
    use crate::not_found::ObjectKind;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|_jail| {
            let config = ProviderConfig::resolve(None, &ExplicitSettings::default()).map_err(|e| e.to_string())?;
            assert_eq!(config.host, "");
            assert_eq!(config.request_timeout_secs, 60);
            assert!(!config.structured_logging());
            assert_eq!(config.not_found_rules, NotFoundRules::default());
            Ok(())
        });
    }

    #[test]
    fn test_environment_fallback() {
        Jail::expect_with(|jail| {
            jail.set_env("QNAP_HOST", "nas.local:8080");
            jail.set_env("QNAP_USERNAME", "admin");
            jail.set_env("QNAP_PASSWORD", "secret");

            let config = ProviderConfig::resolve(None, &ExplicitSettings::default()).map_err(|e| e.to_string())?;
            assert_eq!(config.host, "nas.local:8080");
            assert_eq!(config.username, "admin");
            assert_eq!(config.password, "secret");
            Ok(())
        });
    }

    #[test]
    fn test_explicit_values_override_environment() {
        Jail::expect_with(|jail| {
            jail.set_env("QNAP_HOST", "env-host");
            jail.set_env("QNAP_USERNAME", "env-user");

            let explicit = ExplicitSettings {
                host: Some("config-host".to_string()),
                ..Default::default()
            };
            let config = ProviderConfig::resolve(None, &explicit).map_err(|e| e.to_string())?;
            assert_eq!(config.host, "config-host");
            assert_eq!(config.username, "env-user");
            Ok(())
        });
    }

    #[test]
    fn test_yaml_overlay() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "qnap.yaml",
                r#"
request_timeout_secs: 15
structured_logging: true
not_found_rules:
  - kind: container
    status: 404
    code: 1009
    message_contains: "No such container"
  - kind: application
    status: 404
    code: 2001
    message_contains: "application not found"
"#,
            )?;
            jail.set_env("QNAP_HOST", "nas.local");

            let config = ProviderConfig::resolve(Some(Path::new("qnap.yaml")), &ExplicitSettings::default())
                .map_err(|e| e.to_string())?;
            assert_eq!(config.request_timeout(), Duration::from_secs(15));
            assert!(config.structured_logging());
            assert_eq!(config.host, "nas.local");
            let gone = ApiError::from_status(404, r#"{"code":2001,"message":"application not found: web"}"#);
            assert!(config.not_found_rules.matches(ObjectKind::Application, &gone));
            let legacy = ApiError::from_status(404, r#"{"code":1009,"message":"cannot find compose web"}"#);
            assert!(!config.not_found_rules.matches(ObjectKind::Application, &legacy));
            Ok(())
        });
    }

    #[test]
    fn test_numeric_password_from_environment() {
        Jail::expect_with(|jail| {
            jail.set_env("QNAP_PASSWORD", "1234");
            let config = ProviderConfig::resolve(None, &ExplicitSettings::default()).map_err(|e| e.to_string())?;
            assert_eq!(config.password, "1234");
            Ok(())
        });
    }

    #[test]
    fn test_zero_timeout_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("QNAP_REQUEST_TIMEOUT_SECS", "0");
            assert!(ProviderConfig::resolve(None, &ExplicitSettings::default()).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = ProviderConfig {
            password: "hunter2".to_string(),
            ..Default::default()
        };
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
