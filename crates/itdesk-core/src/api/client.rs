//! HTTP client for the itdesk backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use url::Url;

use super::types::{ErrorBody, LoginRequest, LoginResponse, VerifyRequest, VerifyResponse};
use super::{AuthBackend, EventStore};
use crate::calendar::{CalendarEvent, StoredEvent};
use crate::config::BackendConfig;
use crate::error::ApiError;

const EVENTS_PATH: &str = "api/calendar-events";

/// Client for the backend's calendar and auth endpoints.
///
/// Adds `Authorization: Bearer <token>` to every request once a token is
/// attached.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    http_client: Client,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base,
            http_client,
            token: None,
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, ApiError> {
        Self::new(&config.url, Duration::from_secs(config.timeout_secs))
    }

    /// Attach (or clear) the bearer token sent with every request.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base.join(path)?)
    }

    fn event_url(&self, id: i64) -> Result<Url, ApiError> {
        self.endpoint(&format!("{EVENTS_PATH}/{id}"))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let resp = self.authorized(request).send().await?;
        check_status(resp).await
    }
}

/// Turn a non-2xx response into [`ApiError::Status`], keeping the
/// backend's `error` message when it sent one.
async fn check_status(resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|body| body.error.or(body.message))
        .unwrap_or(text);
    tracing::warn!(status = status.as_u16(), %message, "backend request failed");
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl EventStore for ApiClient {
    async fn list_events(&self) -> Result<Vec<StoredEvent>, ApiError> {
        let url = self.endpoint(EVENTS_PATH)?;
        tracing::debug!(%url, "listing calendar events");
        let resp = self.send(self.http_client.get(url)).await?;
        Ok(resp.json().await?)
    }

    async fn create_event(&self, event: &CalendarEvent) -> Result<StoredEvent, ApiError> {
        let url = self.endpoint(EVENTS_PATH)?;
        tracing::debug!(%url, title = %event.title, start = %event.start, "creating calendar event");
        let resp = self.send(self.http_client.post(url).json(event)).await?;
        Ok(resp.json().await?)
    }

    async fn update_event(&self, id: i64, event: &CalendarEvent) -> Result<StoredEvent, ApiError> {
        let url = self.event_url(id)?;
        tracing::debug!(%url, id, "updating calendar event");
        let resp = self.send(self.http_client.put(url).json(event)).await?;
        Ok(resp.json().await?)
    }

    async fn delete_event(&self, id: i64) -> Result<(), ApiError> {
        let url = self.event_url(id)?;
        tracing::debug!(%url, id, "deleting calendar event");
        self.send(self.http_client.delete(url)).await?;
        Ok(())
    }
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let url = self.endpoint("api/auth/login")?;
        let body = LoginRequest { username, password };
        let resp = self
            .http_client
            .post(url)
            .json(&body)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }

    async fn verify(&self, token: &str) -> Result<VerifyResponse, ApiError> {
        let url = self.endpoint("api/auth/verify")?;
        let resp = self
            .http_client
            .post(url)
            .json(&VerifyRequest { token })
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }

    async fn logout(&self, token: &str) -> Result<(), ApiError> {
        let url = self.endpoint("api/auth/logout")?;
        let resp = self.http_client.post(url).bearer_auth(token).send().await?;
        check_status(resp).await?;
        Ok(())
    }
}
