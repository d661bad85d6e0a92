//! Classifies API errors that mean "the remote object no longer exists".
//!
//! Read drops such objects from state instead of failing. The matching rules
//! are data so that a Container Station release that words its errors
//! differently only needs a configuration change.

use anyhow::{anyhow, Result};
use container_station::ApiError;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ObjectKind {
    Container,
    Application,
    Volume,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotFoundRule {
    pub kind: ObjectKind,
    pub status: u16,
    pub code: i64,
    pub message_contains: String,
}

impl NotFoundRule {
    fn new(kind: ObjectKind, message_contains: &str) -> Self {
        Self {
            kind,
            status: 404,
            code: 1009,
            message_contains: message_contains.to_string(),
        }
    }

    fn matches(&self, status: u16, code: Option<i64>, message: Option<&str>) -> bool {
        self.status == status
            && code == Some(self.code)
            && message.is_some_and(|m| m.contains(&self.message_contains))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotFoundRules(Vec<NotFoundRule>);

impl Default for NotFoundRules {
    fn default() -> Self {
        Self(vec![
            NotFoundRule::new(ObjectKind::Container, "No such container"),
            NotFoundRule::new(ObjectKind::Application, "cannot find compose"),
            NotFoundRule::new(ObjectKind::Volume, "No such volume"),
        ])
    }
}

impl NotFoundRules {
    pub fn new(rules: Vec<NotFoundRule>) -> Self {
        Self(rules)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(rule) = self.0.iter().find(|r| r.message_contains.is_empty()) {
            return Err(anyhow!(
                "not found rule for {} must have a non-empty message_contains",
                rule.kind
            ));
        }
        Ok(())
    }

    /// True when `error` reports that the object of `kind` does not exist.
    /// Transport, decode and authentication failures never match.
    pub fn matches(&self, kind: ObjectKind, error: &ApiError) -> bool {
        let Some(status) = error.status() else {
            return false;
        };
        self.0
            .iter()
            .filter(|rule| rule.kind == kind)
            .any(|rule| rule.matches(status, error.code(), error.message()))
    }

    /// Same as [`NotFoundRules::matches`] for an error that was already
    /// formatted to text. Text that does not carry a status error never
    /// matches.
    pub fn is_not_found_message(&self, kind: ObjectKind, text: &str) -> bool {
        ApiError::from_formatted(text)
            .map(|error| self.matches(kind, &error))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTAINER_GONE: &str = r#"status: 404, body: {"code":1009,"message":"Error response from daemon: No such container: 7f3a"}"#;

    #[test]
    fn test_container_not_found_message() {
        let rules = NotFoundRules::default();
        assert!(rules.is_not_found_message(ObjectKind::Container, CONTAINER_GONE));
        assert!(!rules.is_not_found_message(ObjectKind::Application, CONTAINER_GONE));
    }

    #[test]
    fn test_other_errors_do_not_match() {
        let rules = NotFoundRules::default();
        let wrong_status = r#"status: 500, body: {"code":1009,"message":"Error response from daemon: No such container: 7f3a"}"#;
        let wrong_code = r#"status: 404, body: {"code":1010,"message":"Error response from daemon: No such container: 7f3a"}"#;
        let wrong_message = r#"status: 404, body: {"code":1009,"message":"Error response from daemon: No such image"}"#;
        for text in [wrong_status, wrong_code, wrong_message] {
            assert!(!rules.is_not_found_message(ObjectKind::Container, text), "{text}");
        }
    }

    #[test]
    fn test_malformed_text_does_not_match() {
        let rules = NotFoundRules::default();
        for text in [
            "",
            "dial tcp 10.0.0.1:8080: connection refused",
            "status: 404, body: {not json}",
            "status: 404,",
            "status: 404, body: {\"code\":1009,\"message\":\"No such container\"",
        ] {
            assert!(!rules.is_not_found_message(ObjectKind::Container, text), "{text}");
        }
    }

    #[test]
    fn test_structured_error() {
        let rules = NotFoundRules::default();
        let gone = ApiError::from_status(404, r#"{"code":1009,"message":"cannot find compose web"}"#);
        assert!(rules.matches(ObjectKind::Application, &gone));

        let raw = ApiError::from_status(404, "not found");
        assert!(!rules.matches(ObjectKind::Application, &raw));

        let auth = ApiError::Authentication("expired".to_string());
        assert!(!rules.matches(ObjectKind::Application, &auth));
    }

    #[test]
    fn test_volume_rule() {
        let rules = NotFoundRules::default();
        let gone = ApiError::from_status(
            404,
            r#"{"code":1009,"message":"Error response from daemon: No such volume: data"}"#,
        );
        assert!(rules.matches(ObjectKind::Volume, &gone));
        assert!(!rules.matches(ObjectKind::Container, &gone));
    }

    #[test]
    fn test_empty_message_rule_rejected() {
        let rules = NotFoundRules::new(vec![NotFoundRule {
            kind: ObjectKind::Container,
            status: 404,
            code: 1009,
            message_contains: String::new(),
        }]);
        assert!(rules.validate().is_err());
    }
}
