//! Compose documents submitted by `qnap_app`.
//!
//! Only the parts the provider validates are typed; every other key is kept
//! verbatim so normalization never drops configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ComposeError {
    #[error("failed to parse compose document. error: {0}")]
    Parse(#[source] serde_yaml::Error),

    #[error("missing required field: version")]
    MissingVersion,

    #[error("no services defined")]
    NoServices,

    #[error("service '{0}' must have either an image or a build context")]
    MissingImage(String),

    #[error("failed to serialize compose document. error: {0}")]
    Serialize(#[source] serde_yaml::Error),
}

/// A scalar rendered as text. Compose authors write `5432` and `'5432'`
/// interchangeably.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Scalar(pub String);

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        match serde_yaml::Value::deserialize(deserializer)? {
            serde_yaml::Value::String(s) => Ok(Scalar(s)),
            serde_yaml::Value::Number(n) => Ok(Scalar(n.to_string())),
            serde_yaml::Value::Bool(b) => Ok(Scalar(b.to_string())),
            other => Err(D::Error::custom(format!("expected a scalar, got {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Build {
    Context(String),
    Config(BuildConfig),
}

impl Build {
    fn context(&self) -> &str {
        match self {
            Build::Context(context) => context,
            Build::Config(config) => config.context.as_deref().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Environment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Environment {
    Map(BTreeMap<String, Option<Scalar>>),
    List(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    Shell(String),
    Exec(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<Build>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Command>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networks: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Service {
    fn has_image_or_context(&self) -> bool {
        let has_image = self.image.as_deref().is_some_and(|i| !i.is_empty());
        let has_context = self.build.as_ref().is_some_and(|b| !b.context().is_empty());
        has_image || has_context
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposeFile {
    #[serde(default, deserialize_with = "optional_scalar")]
    pub version: Option<String>,
    #[serde(default)]
    pub services: BTreeMap<String, Service>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volumes: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networks: Option<serde_yaml::Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

fn optional_scalar<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|s| s.0))
}

impl ComposeFile {
    pub fn parse(yml: &str) -> Result<Self, ComposeError> {
        let mut value: serde_yaml::Value = serde_yaml::from_str(yml).map_err(ComposeError::Parse)?;
        value.apply_merge().map_err(ComposeError::Parse)?;
        serde_yaml::from_value(value).map_err(ComposeError::Parse)
    }

    pub fn validate(&self) -> Result<(), ComposeError> {
        if self.version.as_deref().map_or(true, str::is_empty) {
            return Err(ComposeError::MissingVersion);
        }
        if self.services.is_empty() {
            return Err(ComposeError::NoServices);
        }
        if let Some((name, _)) = self.services.iter().find(|(_, s)| !s.has_image_or_context()) {
            return Err(ComposeError::MissingImage(name.clone()));
        }
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String, ComposeError> {
        serde_yaml::to_string(self)
            .map(|yaml| quote_yaml11_booleans(&yaml))
            .map_err(ComposeError::Serialize)
    }
}

/// Plain scalars YAML 1.1 readers, the compose CLI among them, take as booleans.
const YAML11_BOOLEANS: &[&str] = &[
    "y", "Y", "yes", "Yes", "YES", "n", "N", "no", "No", "NO", "on", "On", "ON", "off", "Off",
    "OFF",
];

/// Single-quotes plain scalar values that a YAML 1.1 reader would turn into
/// booleans. Block scalar content is left alone.
fn quote_yaml11_booleans(yaml: &str) -> String {
    let mut out = String::with_capacity(yaml.len());
    let mut block_indent: Option<usize> = None;
    for line in yaml.lines() {
        let indent = line.len() - line.trim_start().len();
        if let Some(block) = block_indent {
            if line.trim().is_empty() || indent > block {
                out.push_str(line);
                out.push('\n');
                continue;
            }
            block_indent = None;
        }

        let (head, value) = split_value(line);
        if value.starts_with('|') || value.starts_with('>') {
            block_indent = Some(indent);
        }
        out.push_str(head);
        if YAML11_BOOLEANS.contains(&value) {
            out.push('\'');
            out.push_str(value);
            out.push('\'');
        } else {
            out.push_str(value);
        }
        out.push('\n');
    }
    out
}

/// Splits a block-style line into everything up to its scalar value and the
/// value itself, which is empty when the line holds no plain value.
fn split_value(line: &str) -> (&str, &str) {
    let mut start = line.len() - line.trim_start().len();
    while line[start..].starts_with("- ") {
        start += 2;
    }
    let rest = &line[start..];
    if rest.starts_with(['\'', '"']) {
        return (line, "");
    }
    match rest.find(": ") {
        Some(pos) if rest[..pos].contains(['\'', '"']) => (line, ""),
        Some(pos) => line.split_at(start + pos + 2),
        None if rest.ends_with(':') => (line, ""),
        None => line.split_at(start),
    }
}

/// Parses, validates and re-serializes a compose document.
pub fn normalize(yml: &str) -> Result<String, ComposeError> {
    let compose = ComposeFile::parse(yml)?;
    compose.validate()?;
    compose.to_yaml()
}

/// Whether two documents describe the same application, ignoring
/// formatting, key order and quoting of scalars.
pub fn equivalent(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (ComposeFile::parse(a), ComposeFile::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use data_model::test_objects::tests::TEST_COMPOSE;

    use super::*;

    #[test]
    fn test_normalize_valid_document() -> anyhow::Result<()> {
        let normalized = normalize(TEST_COMPOSE)?;
        let compose = ComposeFile::parse(&normalized)?;
        assert_eq!(compose.version.as_deref(), Some("3"));
        assert_eq!(
            compose.services.keys().collect::<Vec<_>>(),
            vec!["phppgadmin", "postgres"]
        );
        let env = compose.services["phppgadmin"].environment.clone().unwrap();
        let Environment::Map(env) = env else {
            panic!("expected an environment map");
        };
        assert_eq!(
            env["PHP_PG_ADMIN_SERVER_PORT"],
            Some(Scalar("5432".to_string()))
        );
        assert!(equivalent(TEST_COMPOSE, &normalized));
        Ok(())
    }

    #[test]
    fn test_missing_version() {
        let err = normalize("services:\n  web:\n    image: nginx\n").unwrap_err();
        assert_eq!(err.to_string(), "missing required field: version");
    }

    #[test]
    fn test_no_services() {
        let err = normalize("version: '3'\n").unwrap_err();
        assert_eq!(err.to_string(), "no services defined");
    }

    #[test]
    fn test_service_without_image_or_build() {
        let yml = "version: '3'\nservices:\n  web:\n    image: nginx\n  worker:\n    restart: always\n";
        let err = normalize(yml).unwrap_err();
        assert_eq!(
            err.to_string(),
            "service 'worker' must have either an image or a build context"
        );
    }

    #[test]
    fn test_build_context_is_enough() -> anyhow::Result<()> {
        normalize("version: '3'\nservices:\n  app:\n    build:\n      context: ./app\n")?;
        normalize("version: '3'\nservices:\n  app:\n    build: ./app\n")?;
        Ok(())
    }

    #[test]
    fn test_unknown_keys_survive() -> anyhow::Result<()> {
        let yml = "version: '3.8'\nservices:\n  web:\n    image: nginx\n    healthcheck:\n      test: [\"CMD\", \"true\"]\nx-common:\n  a: 1\n";
        let normalized = normalize(yml)?;
        assert!(normalized.contains("healthcheck"));
        assert!(normalized.contains("x-common"));
        Ok(())
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            normalize("version: [unterminated"),
            Err(ComposeError::Parse(_))
        ));
    }

    #[test]
    fn test_merge_keys() -> anyhow::Result<()> {
        let yml = "version: '3'\nx-common: &common\n  image: postgres:16\n  restart: always\nservices:\n  db:\n    <<: *common\n    environment:\n      POSTGRES_DB: app\n";
        let compose = ComposeFile::parse(yml)?;
        compose.validate()?;
        let db = &compose.services["db"];
        assert_eq!(db.image.as_deref(), Some("postgres:16"));
        assert_eq!(db.restart.as_deref(), Some("always"));
        assert!(!db.extra.contains_key("<<"));
        Ok(())
    }

    #[test]
    fn test_build_args_list() -> anyhow::Result<()> {
        let yml = "version: '3'\nservices:\n  app:\n    build:\n      context: ./app\n      args:\n        - GIT_COMMIT=cdc3b19\n        - DEBUG\n";
        let compose = ComposeFile::parse(&normalize(yml)?)?;
        let Some(Build::Config(build)) = &compose.services["app"].build else {
            panic!("expected a build section");
        };
        assert_eq!(
            build.args,
            Some(Environment::List(vec![
                "GIT_COMMIT=cdc3b19".to_string(),
                "DEBUG".to_string(),
            ]))
        );
        Ok(())
    }

    #[test]
    fn test_yaml11_keywords_stay_quoted() -> anyhow::Result<()> {
        let yml = "version: '3'\nservices:\n  web:\n    image: nginx\n    restart: \"no\"\n    command: [\"serve\", \"off\"]\n    labels:\n      note: |\n        on\n        yes\n";
        let normalized = normalize(yml)?;
        assert!(normalized.contains("restart: 'no'"), "{normalized}");
        assert!(normalized.contains("- 'off'"), "{normalized}");
        assert!(!normalized.contains("'on'"), "{normalized}");
        assert!(!normalized.contains("'yes'"), "{normalized}");

        let compose = ComposeFile::parse(&normalized)?;
        assert_eq!(compose.services["web"].restart.as_deref(), Some("no"));
        assert!(equivalent(yml, &normalized));
        Ok(())
    }

    #[test]
    fn test_equivalent_ignores_formatting() {
        let a = "version: '3'\nservices:\n  web:\n    image: nginx\n    ports:\n      - 8080:80\n";
        let b = "services:\n  web:\n    ports: ['8080:80']\n    image: nginx\nversion: \"3\"\n";
        assert!(equivalent(a, b));
        let c = "version: '3'\nservices:\n  web:\n    image: httpd\n";
        assert!(!equivalent(a, c));
    }
}
