use serde::Deserialize;

/// Body returned by Container Station alongside non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    ///
    /// Displayed as `status: <n>, body: <body>`, the form older clients
    /// embedded in plain error strings.
    #[error("status: {status}, body: {body}")]
    Status {
        status: u16,
        code: Option<i64>,
        message: Option<String>,
        body: String,
    },

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("request to {url} failed. error: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to decode response from {url}. error: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl ApiError {
    /// Builds a status error, extracting `{code, message}` when the body is
    /// JSON.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let parsed = serde_json::from_str::<ErrorBody>(&body).ok();
        ApiError::Status {
            status,
            code: parsed.as_ref().map(|b| b.code),
            message: parsed.map(|b| b.message),
            body,
        }
    }

    /// Recovers a status error from its formatted form,
    /// `status: <n>, body: {"code": <c>, "message": "<m>"}`.
    ///
    /// Returns `None` when the text does not start with a status prefix or the
    /// body is not a JSON error object.
    pub fn from_formatted(text: &str) -> Option<Self> {
        let rest = text.strip_prefix("status: ")?;
        let (status, _) = rest.split_once(',')?;
        let status = status.trim().parse::<u16>().ok()?;
        let start = text.find("body: {")? + "body: ".len();
        let body = &text[start..];
        let parsed = serde_json::from_str::<ErrorBody>(body).ok()?;
        Some(ApiError::Status {
            status,
            code: Some(parsed.code),
            message: Some(parsed.message),
            body: body.to_string(),
        })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            ApiError::Status { code, .. } => *code,
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_parses_json_body() {
        let err = ApiError::from_status(
            404,
            r#"{"code":1009,"message":"Error response from daemon: No such container: abc"}"#,
        );
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.code(), Some(1009));
        assert_eq!(
            err.message(),
            Some("Error response from daemon: No such container: abc")
        );
    }

    #[test]
    fn test_from_status_keeps_raw_body() {
        let err = ApiError::from_status(502, "Bad Gateway");
        assert_eq!(err.code(), None);
        assert_eq!(err.to_string(), "status: 502, body: Bad Gateway");
    }

    #[test]
    fn test_formatted_round_trip() {
        let err = ApiError::from_status(404, r#"{"code":1009,"message":"cannot find compose"}"#);
        let parsed = ApiError::from_formatted(&err.to_string()).unwrap();
        assert_eq!(parsed.status(), Some(404));
        assert_eq!(parsed.code(), Some(1009));
        assert_eq!(parsed.message(), Some("cannot find compose"));
    }

    #[test]
    fn test_from_formatted_rejects_malformed() {
        assert!(ApiError::from_formatted("connection refused").is_none());
        assert!(ApiError::from_formatted("status: abc, body: {}").is_none());
        assert!(ApiError::from_formatted("status: 404, body: not json").is_none());
        assert!(ApiError::from_formatted("status: 404, body: {\"code\": 1009").is_none());
        assert!(ApiError::from_formatted("").is_none());
    }
}
