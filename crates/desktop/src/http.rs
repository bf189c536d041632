//! Authenticated HTTP client wrapper.
//!
//! Every request that needs authentication carries the persisted access token
//! as a bearer token. When the backend answers 401, the wrapper refreshes the
//! access token once and replays the request once. A failed refresh hands the
//! original 401 back to the caller; nothing is retried a second time.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::error::ClientError;
use crate::storage::SessionVault;
use crate::types::{ErrorBody, RefreshRequest, RefreshResponse};

pub const REFRESH_PATH: &str = "/token/refresh/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl core::fmt::Display for Method {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outbound request, relative to the API base URL.
#[derive(Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    /// Whether the stored access token should be attached.
    pub authenticated: bool,
    /// Bearer token actually sent. Filled in by [`ApiClient`].
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            authenticated: true,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ClientError> {
        let value = serde_json::to_value(body).map_err(|e| ClientError::Decode(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Send without the stored access token (login, token refresh).
    pub fn anonymous(mut self) -> Self {
        self.authenticated = false;
        self
    }
}

impl core::fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("authenticated", &self.authenticated)
            .field("has_bearer", &self.bearer.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_str(&self.body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// DRF `detail` message when present, otherwise the raw body.
    pub fn error_message(&self) -> String {
        match serde_json::from_str::<ErrorBody>(&self.body) {
            Ok(body) => body.detail,
            Err(_) if self.body.trim().is_empty() => format!("HTTP {}", self.status),
            Err(_) => self.body.chars().take(200).collect(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

/// Sends a single request. Implementations never retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// reqwest transport
// ─────────────────────────────────────────────────────────────────────────────

/// [`Transport`] over reqwest.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Arc<str>,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Delete => self.client.delete(&url),
        };
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| TransportError(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| TransportError(e.to_string()))?;

        Ok(ApiResponse { status, body })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authenticated client
// ─────────────────────────────────────────────────────────────────────────────

/// Whether the one refresh a request is entitled to has been used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshAttempt {
    Available,
    Spent,
}

/// HTTP client wrapper shared by the session store and the views.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    vault: SessionVault,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, vault: SessionVault) -> Self {
        Self { transport, vault }
    }

    /// Send `request`, refreshing the access token at most once on 401.
    ///
    /// Returns the final response whatever its status; only transport and
    /// storage failures are errors here.
    pub async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse, ClientError> {
        if request.authenticated {
            request.bearer = self.vault.access_token().await?;
        }

        let mut attempt = RefreshAttempt::Available;
        loop {
            let response = self.send(&request).await?;

            if !response.is_unauthorized() || !request.authenticated {
                return Ok(response);
            }

            match attempt {
                RefreshAttempt::Spent => return Ok(response),
                RefreshAttempt::Available => {
                    attempt = RefreshAttempt::Spent;
                    match self.refresh_access_token().await {
                        Some(access) => {
                            tracing::debug!(path = %request.path, "replaying request with refreshed token");
                            request.bearer = Some(access);
                        }
                        None => return Ok(response),
                    }
                }
            }
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.execute(ApiRequest::get(path)).await?;
        check(response)?.json()
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.execute(ApiRequest::post(path).with_json(body)?).await?;
        check(response)?.json()
    }

    /// POST without the stored access token.
    pub async fn post_anonymous<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .execute(ApiRequest::post(path).with_json(body)?.anonymous())
            .await?;
        check(response)?.json()
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.execute(ApiRequest::put(path).with_json(body)?).await?;
        check(response)?.json()
    }

    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let response = self.execute(ApiRequest::delete(path)).await?;
        check(response).map(|_| ())
    }

    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| ClientError::Network(e.0))?;
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status = response.status,
            "api request"
        );
        Ok(response)
    }

    /// Exchange the stored refresh token for a new access token and persist it.
    ///
    /// Talks to the transport directly so a failing refresh can never trigger
    /// another refresh.
    async fn refresh_access_token(&self) -> Option<String> {
        let refresh = match self.vault.refresh_token().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                tracing::debug!("401 without a stored refresh token");
                return None;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to read refresh token");
                return None;
            }
        };

        let request = ApiRequest::post(REFRESH_PATH)
            .with_json(&RefreshRequest { refresh: &refresh })
            .ok()?
            .anonymous();

        let response = match self.send(&request).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                tracing::warn!(status = response.status, "token refresh rejected");
                return None;
            }
            Err(err) => {
                tracing::warn!(error = %err, "token refresh failed");
                return None;
            }
        };

        let access = match response.json::<RefreshResponse>() {
            Ok(body) => body.access,
            Err(err) => {
                tracing::warn!(error = %err, "token refresh returned an unreadable body");
                return None;
            }
        };

        if let Err(err) = self.vault.store_access_token(&access).await {
            tracing::warn!(error = %err, "failed to persist refreshed access token");
        }
        tracing::info!("access token refreshed");
        Some(access)
    }
}

/// Map a final response onto the error taxonomy.
fn check(response: ApiResponse) -> Result<ApiResponse, ClientError> {
    if response.is_success() {
        return Ok(response);
    }
    if response.is_unauthorized() {
        return Err(ClientError::Authentication);
    }
    Err(ClientError::Api {
        status: response.status,
        message: response.error_message(),
    })
}
