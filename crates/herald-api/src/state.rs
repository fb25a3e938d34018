//! Shared application state.

use std::fmt;
use std::sync::Arc;

use herald_bus::server::EventBusServer;

use crate::auth::AuthorizationFilter;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The event bus server backing both endpoints.
    pub server: Arc<EventBusServer>,
    /// Per-request filter for `GET /events`; `None` serves every event.
    pub authorization: Option<Arc<dyn AuthorizationFilter>>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("server", &self.server)
            .field("authorization", &self.authorization.is_some())
            .finish()
    }
}

impl AppState {
    /// Create new application state with no authorization filter.
    #[must_use]
    pub fn new(server: Arc<EventBusServer>) -> Self {
        Self {
            server,
            authorization: None,
        }
    }

    /// Filters `GET /events` responses through `filter`.
    #[must_use]
    pub fn with_authorization(mut self, filter: Arc<dyn AuthorizationFilter>) -> Self {
        self.authorization = Some(filter);
        self
    }
}
