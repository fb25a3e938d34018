//! Herald API server entry point.

use std::sync::Arc;

use herald_api::config::ServerConfig;
use herald_api::error::AppError;
use herald_api::{routes, state, telemetry};
use herald_bus::server::EventBusServer;
use herald_event_store::pg_event_repository::PgEventRepository;
use herald_event_store::schema::MIGRATOR;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = ServerConfig::from_env()?;
    let _telemetry = telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!(
        addr = %config.addr,
        retention_secs = config.retention.map(|r| r.num_seconds()),
        authorization = ?config.authorization,
        "Starting Herald API server"
    );

    // Create database connection pool and bring the schema up to date.
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    MIGRATOR.run(&pool).await?;

    let server = Arc::new(
        EventBusServer::builder(Arc::new(PgEventRepository::new(pool)))
            .retention_opt(config.retention)
            .build(),
    );
    let sweeper = server.spawn_retention_sweeper(config.cleanup_interval);

    let mut app_state = state::AppState::new(Arc::clone(&server));
    if let Some(filter) = config.authorization.filter() {
        app_state = app_state.with_authorization(filter);
    }

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = routes::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!("Listening on {}", config.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    server.close();
    sweeper.abort();
    tracing::info!("Herald API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
