use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::{
    error::ApiError,
    session::Session,
    types::{
        AppInfo,
        ContainerInfo,
        ContainerSummary,
        Envelope,
        LoginRequest,
        LoginResponse,
        NewAppRequest,
        NewContainerSpec,
        NewVolumeSpec,
        VolumeInfo,
    },
    ContainerStationApi,
};

const API_PREFIX: &str = "container-station/api/v3";

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Container Station client over HTTP(S).
///
/// Building the client does not contact the server; the first request logs
/// in and later requests reuse the session token.
#[derive(Debug)]
pub struct HttpClient {
    base: Url,
    http: reqwest::Client,
    credentials: Credentials,
    session: Session,
}

impl HttpClient {
    /// `host` is either a bare `host[:port]` (HTTP is assumed) or a full
    /// `http://` / `https://` URL.
    pub fn new(host: &str, credentials: Credentials, timeout: Duration) -> Result<Self, ApiError> {
        let base = parse_base(host)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::InvalidConfig(format!("unable to build http client: {e}")))?;
        Ok(Self {
            base,
            http,
            credentials,
            session: Session::default(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(&format!("{API_PREFIX}/{}", path.trim_start_matches('/')))
            .map_err(|e| ApiError::InvalidConfig(format!("invalid request path {path}: {e}")))
    }

    async fn login(&self) -> Result<String, ApiError> {
        let url = self.url("login")?;
        let response = self
            .http
            .post(url.clone())
            .json(&LoginRequest {
                username: &self.credentials.username,
                password: &self.credentials.password,
            })
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        let body = read_body(&url, response).await?;
        if !status.is_success() {
            return Err(ApiError::Authentication(
                ApiError::from_status(status.as_u16(), body).to_string(),
            ));
        }
        let login: Envelope<LoginResponse> = decode(&url, &body)?;
        Ok(login.data.token)
    }

    async fn token(&self) -> Result<String, ApiError> {
        match self.session.current().await {
            Some(token) => Ok(token),
            None => self.session.refresh(None, self.login()).await,
        }
    }

    async fn dispatch(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&serde_json::Value>,
        token: &str,
    ) -> Result<(StatusCode, String), ApiError> {
        let mut request = self.http.request(method.clone(), url.clone()).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;
        let status = response.status();
        Ok((status, read_body(url, response).await?))
    }

    /// Sends one request. A 401 triggers a single re-login and replay.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<String, ApiError> {
        let url = self.url(path)?;
        let token = self.token().await?;
        debug!(method = %method, url = %url, "container station request");
        let (mut status, mut text) = self.dispatch(&method, &url, body.as_ref(), &token).await?;
        if status == StatusCode::UNAUTHORIZED {
            warn!(url = %url, "session token rejected, logging in again");
            let token = self.session.refresh(Some(&token), self.login()).await?;
            (status, text) = self.dispatch(&method, &url, body.as_ref(), &token).await?;
        }
        if !status.is_success() {
            return Err(ApiError::from_status(status.as_u16(), text));
        }
        Ok(text)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, ApiError> {
        let url = self.url(path)?;
        let text = self.send(method, path, body).await?;
        let envelope: Envelope<T> = decode(&url, &text)?;
        Ok(envelope.data)
    }

    async fn call_with<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path)?;
        let body = serde_json::to_value(body).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })?;
        self.call(method, path, Some(body)).await
    }
}

fn parse_base(host: &str) -> Result<Url, ApiError> {
    let host = host.trim();
    if host.is_empty() {
        return Err(ApiError::InvalidConfig("host must not be empty".to_string()));
    }
    let with_scheme = if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    };
    let mut base = Url::parse(&with_scheme)
        .map_err(|e| ApiError::InvalidConfig(format!("invalid host {host}: {e}")))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

async fn read_body(url: &Url, response: reqwest::Response) -> Result<String, ApiError> {
    response.text().await.map_err(|source| ApiError::Transport {
        url: url.to_string(),
        source,
    })
}

fn decode<T: DeserializeOwned>(url: &Url, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|source| ApiError::Decode {
        url: url.to_string(),
        source,
    })
}

#[async_trait]
impl ContainerStationApi for HttpClient {
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, ApiError> {
        self.call(Method::GET, "containers", None).await
    }

    async fn create_container(&self, spec: &NewContainerSpec) -> Result<ContainerInfo, ApiError> {
        self.call_with(Method::POST, "containers", spec).await
    }

    async fn inspect_container(&self, id: &str, kind: &str) -> Result<ContainerInfo, ApiError> {
        self.call(Method::GET, &format!("containers/{kind}/{id}/inspect"), None)
            .await
    }

    async fn start_container(&self, id: &str, kind: &str) -> Result<(), ApiError> {
        self.send(Method::PUT, &format!("containers/{kind}/{id}/start"), None)
            .await
            .map(|_| ())
    }

    async fn stop_container(&self, id: &str, kind: &str) -> Result<(), ApiError> {
        self.send(Method::PUT, &format!("containers/{kind}/{id}/stop"), None)
            .await
            .map(|_| ())
    }

    async fn delete_container(
        &self,
        id: &str,
        kind: &str,
        remove_anon_volumes: bool,
    ) -> Result<(), ApiError> {
        let path = format!("containers/{kind}/{id}?removeAnonymousVolumes={remove_anon_volumes}");
        self.send(Method::DELETE, &path, None).await.map(|_| ())
    }

    async fn create_application(&self, request: &NewAppRequest) -> Result<AppInfo, ApiError> {
        self.call_with(Method::POST, "apps", request).await
    }

    async fn inspect_application(&self, name: &str) -> Result<AppInfo, ApiError> {
        self.call(Method::GET, &format!("apps/{name}/inspect"), None).await
    }

    async fn start_application(&self, name: &str) -> Result<(), ApiError> {
        self.send(Method::PUT, &format!("apps/{name}/start"), None)
            .await
            .map(|_| ())
    }

    async fn stop_application(&self, name: &str) -> Result<(), ApiError> {
        self.send(Method::PUT, &format!("apps/{name}/stop"), None)
            .await
            .map(|_| ())
    }

    async fn delete_application(&self, name: &str, remove_anon_volumes: bool) -> Result<(), ApiError> {
        let path = format!("apps/{name}?removeAnonymousVolumes={remove_anon_volumes}");
        self.send(Method::DELETE, &path, None).await.map(|_| ())
    }

    async fn create_volume(&self, spec: &NewVolumeSpec) -> Result<VolumeInfo, ApiError> {
        self.call_with(Method::POST, "volumes", spec).await
    }

    async fn inspect_volume(&self, id: &str, kind: &str) -> Result<VolumeInfo, ApiError> {
        self.call(Method::GET, &format!("volumes/{kind}/{id}/inspect"), None)
            .await
    }

    async fn delete_volume(&self, id: &str, kind: &str) -> Result<(), ApiError> {
        self.send(Method::DELETE, &format!("volumes/{kind}/{id}"), None)
            .await
            .map(|_| ())
    }
}
