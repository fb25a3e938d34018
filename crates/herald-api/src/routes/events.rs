//! Routes for polling and ingesting events.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{Json, Router, routing::get};
use chrono::{DateTime, Utc};
use herald_core::error::DomainError;
use herald_core::event::SharedEvent;
use herald_core::stored_event::{RemoteEvent, StoredEvent};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::auth::RequestContext;
use crate::error::ApiError;
use crate::state::AppState;

/// Query string for GET /events.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// RFC 3339 timestamp; events created at or after it are returned.
    pub since: Option<String>,
}

fn parse_since(raw: Option<&str>) -> Result<DateTime<Utc>, DomainError> {
    let raw = raw.ok_or_else(|| DomainError::Validation("missing since parameter".into()))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|since| since.with_timezone(&Utc))
        .map_err(|e| DomainError::Validation(format!("invalid since timestamp {raw:?}: {e}")))
}

/// GET /events?since=
#[instrument(skip(state, query, headers), fields(since = ?query.since))]
async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<StoredEvent>>, ApiError> {
    let since = parse_since(query.since.as_deref())?;
    let events = state.server.events_since(since).await?;
    let total = events.len();

    let events = match &state.authorization {
        None => events,
        Some(filter) => {
            let request = RequestContext::new(headers);
            events
                .into_iter()
                .filter(|event| match filter.is_authorized(event, &request) {
                    Ok(allowed) => allowed,
                    Err(err) => {
                        warn!(event_id = %event.id(), error = %err, "authorization filter failed");
                        false
                    }
                })
                .collect()
        }
    };

    debug!(total, served = events.len(), "serving events");
    Ok(Json(events))
}

/// POST /events
#[instrument(skip(state, event), fields(event_id = %event.id(), event_type = event.event_type()))]
async fn ingest_event(
    State(state): State<AppState>,
    Json(event): Json<StoredEvent>,
) -> Result<(StatusCode, Json<StoredEvent>), ApiError> {
    let remote: SharedEvent = Arc::new(RemoteEvent::new(event));
    let stored = state.server.publish(remote).await?;
    info!("ingested forwarded event");
    Ok((StatusCode::CREATED, Json(stored)))
}

/// Returns the events router.
pub fn router() -> Router<AppState> {
    Router::new().route("/events", get(list_events).post(ingest_event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_test_support::at;

    #[test]
    fn test_parse_since_accepts_offsets_and_normalizes_to_utc() {
        let since = parse_since(Some("2026-01-15T11:00:00+01:00")).unwrap();

        assert_eq!(since, at(10, 0, 0));
    }

    #[test]
    fn test_parse_since_rejects_missing_and_malformed_values() {
        assert!(matches!(parse_since(None), Err(DomainError::Validation(_))));
        assert!(matches!(
            parse_since(Some("yesterday")),
            Err(DomainError::Validation(_))
        ));
    }
}
