//! Selling Partner API client.
//!
//! One [`SpApiClient`] is one credential session: it attaches the held access
//! token to every request, refreshes it once when a request comes back 401,
//! and keeps a minimum gap between request starts.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, StatusCode, Url};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config;

pub mod auth;
pub mod endpoints;
pub mod helpers;
pub mod rate_limit;

pub use auth::{Credentials, LwaApp};
pub use endpoints::*;
pub use rate_limit::RateLimiter;

/// Header SP-API reads the LWA access token from.
pub const ACCESS_TOKEN_HEADER: &str = "x-amz-access-token";

/// How many times a request may be replayed after a 401.
pub const MAX_AUTH_RETRIES: u8 = 1;

#[derive(Debug, Error)]
pub enum SpApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("SP-API returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("invalid SP-API response JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid SP-API URL: {0}")]
    InvalidUrl(String),
    #[error("no refresh token held; cannot refresh the access token")]
    MissingRefreshToken,
    #[error("invalid token response: {0}")]
    InvalidTokenResponse(String),
}

impl SpApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SpApiError::Status { status, .. } => Some(*status),
            SpApiError::Http(err) => err.status(),
            _ => None,
        }
    }
}

/// Status and raw body of one HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Parse a 2xx body as JSON (empty bodies become `null`); anything else is
    /// returned as [`SpApiError::Status`].
    pub fn into_json(self) -> Result<Value, SpApiError> {
        if !self.status.is_success() {
            return Err(SpApiError::Status {
                status: self.status,
                body: self.body,
            });
        }
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Executes built requests. Swappable so the session logic can be exercised
/// without a network.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: reqwest::Request) -> Result<RawResponse, SpApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: reqwest::Request) -> Result<RawResponse, SpApiError> {
        let res = self.http.execute(request).await?;
        let status = res.status();
        let body = res.text().await?;
        Ok(RawResponse { status, body })
    }
}

/// Description of one logical call. Replays reuse it verbatim apart from the
/// decremented retry budget.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Relative to the client's base URL unless absolute.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub retries_left: u8,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            retries_left: MAX_AUTH_RETRIES,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    /// The same request with one less retry available.
    pub fn retried(self) -> Self {
        Self {
            retries_left: self.retries_left.saturating_sub(1),
            ..self
        }
    }

    pub fn can_retry(&self) -> bool {
        self.retries_left > 0
    }
}

pub struct SpApiClient {
    http: Client,
    transport: Arc<dyn HttpTransport>,
    base_url: Url,
    lwa: LwaApp,
    credentials: RwLock<Credentials>,
    refresh_lock: Mutex<()>,
    limiter: RateLimiter,
}

impl fmt::Debug for SpApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpApiClient")
            .field("base_url", &self.base_url)
            .field("min_interval", &self.limiter.min_interval())
            .finish_non_exhaustive()
    }
}

impl SpApiClient {
    /// Client talking to the real network through reqwest.
    pub fn new(cfg: &config::SpApi) -> Result<Self, SpApiError> {
        let http = build_http(cfg.request_timeout())?;
        let transport = Arc::new(ReqwestTransport::new(http.clone()));
        Self::assemble(cfg, http, transport)
    }

    pub fn with_transport(
        cfg: &config::SpApi,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, SpApiError> {
        let http = build_http(cfg.request_timeout())?;
        Self::assemble(cfg, http, transport)
    }

    fn assemble(
        cfg: &config::SpApi,
        http: Client,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, SpApiError> {
        let base_url = base_url(&cfg.base_url)?;
        let lwa = LwaApp {
            token_url: parse_url(&cfg.token_url)?,
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
        };
        Ok(Self {
            http,
            transport,
            base_url,
            lwa,
            credentials: RwLock::new(Credentials::default()),
            refresh_lock: Mutex::new(()),
            limiter: RateLimiter::new(cfg.min_request_interval()),
        })
    }

    /// Replace the held credential set. Nothing is validated.
    pub async fn set_credentials(&self, credentials: Credentials) {
        *self.credentials.write().await = credentials;
    }

    /// Snapshot of the held credential set, e.g. to persist a refreshed token.
    pub async fn credentials(&self) -> Credentials {
        self.credentials.read().await.clone()
    }

    pub fn build_request(
        &self,
        request: &ApiRequest,
        access_token: Option<&str>,
    ) -> Result<reqwest::Request, SpApiError> {
        let url = self
            .base_url
            .join(&request.path)
            .map_err(|e| SpApiError::InvalidUrl(format!("{}: {e}", request.path)))?;
        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .header("Accept", "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = access_token {
            builder = builder.header(ACCESS_TOKEN_HEADER, token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        Ok(builder.build()?)
    }

    /// Issue `request`, returning the parsed body. A 401 triggers one token
    /// refresh and a replay while the request still has retries left.
    pub async fn send(&self, request: ApiRequest) -> Result<Value, SpApiError> {
        let mut request = request;
        loop {
            self.limiter.wait().await;
            let token = self.credentials.read().await.access_token.clone();
            let http_request = self.build_request(&request, token.as_deref())?;
            debug!(method = %http_request.method(), url = %http_request.url(), "sp-api request");

            let response = self.transport.execute(http_request).await?;
            debug!(status = %response.status, path = %request.path, "sp-api response");

            if response.status == StatusCode::UNAUTHORIZED && request.can_retry() {
                info!(path = %request.path, "access token rejected; refreshing and replaying");
                self.refresh_after_rejection(token.as_deref()).await?;
                request = request.retried();
                continue;
            }
            if !response.status.is_success() {
                warn!(status = %response.status, path = %request.path, body = %response.body, "sp-api error");
            }
            return response.into_json();
        }
    }

    /// Exchange the held refresh token for a new access token and store it in
    /// the session. Fails without any network traffic when no refresh token
    /// is held.
    pub async fn refresh_access_token(&self) -> Result<(), SpApiError> {
        let _guard = self.refresh_lock.lock().await;
        self.exchange_refresh_token().await
    }

    /// Refresh unless another caller already replaced the token that was
    /// rejected, in which case the replay can use the new one directly.
    async fn refresh_after_rejection(&self, rejected: Option<&str>) -> Result<(), SpApiError> {
        let _guard = self.refresh_lock.lock().await;
        let current = self.credentials.read().await.access_token.clone();
        if current.is_some() && current.as_deref() != rejected {
            debug!("access token already refreshed by a concurrent request");
            return Ok(());
        }
        self.exchange_refresh_token().await
    }

    async fn exchange_refresh_token(&self) -> Result<(), SpApiError> {
        let refresh_token = self
            .credentials
            .read()
            .await
            .refresh_token
            .clone()
            .ok_or(SpApiError::MissingRefreshToken)?;

        let request = self.lwa.build_refresh_request(&self.http, &refresh_token)?;
        let response = self.transport.execute(request).await?;
        if !response.status.is_success() {
            warn!(status = %response.status, "access token refresh failed");
            return Err(SpApiError::Status {
                status: response.status,
                body: response.body,
            });
        }
        let token: auth::TokenResponse = serde_json::from_str(&response.body)?;
        let expires_at = token.expires_at(Utc::now())?;

        let mut creds = self.credentials.write().await;
        creds.access_token = Some(token.access_token);
        creds.expires_at = Some(expires_at);
        info!(%expires_at, "refreshed sp-api access token");
        Ok(())
    }
}

fn build_http(timeout: Duration) -> Result<Client, SpApiError> {
    Ok(Client::builder()
        .user_agent(concat!("fba-wms/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()?)
}

fn parse_url(raw: &str) -> Result<Url, SpApiError> {
    Url::parse(raw).map_err(|e| SpApiError::InvalidUrl(format!("{raw}: {e}")))
}

/// Endpoint paths are joined onto the base, so a path prefix such as
/// `/spapi` needs a trailing slash to survive `Url::join`.
fn base_url(raw: &str) -> Result<Url, SpApiError> {
    let mut url = parse_url(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
