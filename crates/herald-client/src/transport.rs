//! HTTP transport between a client and its server.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use herald_core::stored_event::StoredEvent;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use crate::error::ClientError;

/// The two calls a client makes against its server.
#[async_trait]
pub trait EventTransport: Send + Sync {
    /// Fetches stored events created at or after `since`.
    async fn fetch_since(&self, since: DateTime<Utc>) -> Result<Vec<StoredEvent>, ClientError>;

    /// Sends one locally published event to the server for ingestion.
    async fn forward(&self, event: &StoredEvent) -> Result<(), ClientError>;
}

/// [`EventTransport`] over HTTP using reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    events_url: String,
    headers: HeaderMap,
}

impl HttpTransport {
    /// Builds a transport for `config.server_url` with the configured
    /// request timeout.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Transport` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            events_url: format!("{}/events", config.server_url.trim_end_matches('/')),
            headers: HeaderMap::new(),
        })
    }

    /// Sends `value` under `name` on every request, e.g. `x-tenant-id`.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sends `Authorization: Bearer <token>` on every request.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::State` if the token is not a valid header value.
    pub fn with_bearer_token(self, token: &str) -> Result<Self, ClientError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ClientError::State("bearer token is not a valid header value"))?;
        value.set_sensitive(true);
        Ok(self.with_header(AUTHORIZATION, value))
    }

    /// URL polled by this transport.
    #[must_use]
    pub fn events_url(&self) -> &str {
        &self.events_url
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl EventTransport for HttpTransport {
    #[instrument(skip(self), fields(url = %self.events_url))]
    async fn fetch_since(&self, since: DateTime<Utc>) -> Result<Vec<StoredEvent>, ClientError> {
        let since = since.to_rfc3339_opts(SecondsFormat::AutoSi, true);
        let response = self
            .client
            .get(&self.events_url)
            .headers(self.headers.clone())
            .query(&[("since", since.as_str())])
            .send()
            .await?;
        let events: Vec<StoredEvent> = Self::check(response).await?.json().await?;
        debug!(count = events.len(), "fetched events");
        Ok(events)
    }

    #[instrument(skip(self, event), fields(url = %self.events_url, event_id = %event.id()))]
    async fn forward(&self, event: &StoredEvent) -> Result<(), ClientError> {
        let response = self
            .client
            .post(&self.events_url)
            .headers(self.headers.clone())
            .json(event)
            .send()
            .await?;
        Self::check(response).await?;
        debug!("event forwarded");
        Ok(())
    }
}
