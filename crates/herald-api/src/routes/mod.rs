//! Route modules.

pub mod events;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Health check at the root, events under `/api/v1`. Shared by the binary
/// and the integration tests.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest("/api/v1", events::router())
        .with_state(state)
}
