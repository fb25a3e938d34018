//! Client configuration.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Default interval between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Default timeout for a single HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// How a client reaches its server and replicates from it.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL the events router is mounted under, e.g.
    /// `http://localhost:3000/api/v1`.
    pub server_url: String,
    /// Time between two polls.
    pub poll_interval: Duration,
    /// Where replication starts; `None` means the client's creation time.
    pub initial_cursor: Option<DateTime<Utc>>,
    /// Mirror locally published events back to the server.
    pub auto_forward: bool,
    /// Timeout for each GET/POST.
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Configuration with defaults: 1 s polling, cursor at creation time,
    /// no auto-forward.
    #[must_use]
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            initial_cursor: None,
            auto_forward: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Sets the polling interval. It must be non-zero for
    /// [`EventBusClient::start`](crate::client::EventBusClient::start) to
    /// succeed.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Starts replication at `cursor` instead of the creation time.
    #[must_use]
    pub fn with_initial_cursor(mut self, cursor: DateTime<Utc>) -> Self {
        self.initial_cursor = Some(cursor);
        self
    }

    /// Enables or disables auto-forward.
    ///
    /// Forwarding is at-most-once: a failed `POST` is logged and the event
    /// is not retried. Polling is at-least-once, since the cursor only moves
    /// after a successful fetch.
    #[must_use]
    pub fn with_auto_forward(mut self, auto_forward: bool) -> Self {
        self.auto_forward = auto_forward;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
