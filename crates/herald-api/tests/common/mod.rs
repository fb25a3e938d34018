//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use herald_api::auth::AuthorizationFilter;
use herald_api::routes;
use herald_api::state::AppState;
use herald_bus::server::EventBusServer;
use herald_core::repository::EventRepository;
use herald_event_store::pg_event_repository::PgEventRepository;
use herald_test_support::InMemoryEventRepository;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

/// An in-memory server with unbounded retention.
pub fn in_memory_server() -> (Arc<EventBusServer>, Arc<InMemoryEventRepository>) {
    let repository = Arc::new(InMemoryEventRepository::new());
    let server = Arc::new(EventBusServer::builder(repository.clone()).build());
    (server, repository)
}

/// A server backed by a real `PgEventRepository`.
pub fn pg_server(pool: PgPool) -> Arc<EventBusServer> {
    let repository: Arc<dyn EventRepository> = Arc::new(PgEventRepository::new(pool));
    Arc::new(EventBusServer::builder(repository).build())
}

/// Build the full app router. Uses the same route structure as `main.rs`.
pub fn build_test_app(server: Arc<EventBusServer>) -> Router {
    routes::app(AppState::new(server))
}

/// Build the full app router with `filter` guarding `GET /events`.
pub fn build_test_app_with_filter(
    server: Arc<EventBusServer>,
    filter: Arc<dyn AuthorizationFilter>,
) -> Router {
    routes::app(AppState::new(server).with_authorization(filter))
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    get_json_with_headers(app, uri, &[]).await
}

/// Send a GET request carrying `headers` and return the response.
pub async fn get_json_with_headers(
    app: Router,
    uri: &str,
    headers: &[(&str, &str)],
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method("GET").uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(Body::empty()).unwrap();

    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(serde_json::Value::Null)
    };

    (status, json)
}
