//! Herald API: HTTP surface of the event bus server.
//!
//! `GET /events?since=` serves persisted events to polling clients,
//! filtered per caller by an optional [`auth::AuthorizationFilter`].
//! `POST /events` ingests events forwarded by clients.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;
