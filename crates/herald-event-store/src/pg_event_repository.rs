//! `PostgreSQL` implementation of the `EventRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use herald_core::error::DomainError;
use herald_core::repository::EventRepository;
use herald_core::stored_event::StoredEvent;

/// PostgreSQL-backed event repository.
///
/// Every method is a single statement, so each call is atomic and the
/// repository is safe to share between the publish path, HTTP polls, and
/// retention sweeps.
#[derive(Debug, Clone)]
pub struct PgEventRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct StoredEventRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    aggregate_id: Uuid,
    event_type: String,
    event_json: serde_json::Value,
    user_id: Option<String>,
    tenant_id: Option<String>,
    session_id: Option<String>,
}

impl From<StoredEventRow> for StoredEvent {
    fn from(row: StoredEventRow) -> Self {
        StoredEvent::new(
            row.id,
            row.created_at,
            row.aggregate_id,
            row.event_type,
            row.event_json,
        )
        .with_user_id(row.user_id)
        .with_tenant_id(row.tenant_id)
        .with_session_id(row.session_id)
    }
}

const SELECT_COLUMNS: &str = "SELECT id, created_at, aggregate_id, event_type, event_json, \
     user_id, tenant_id, session_id FROM stored_events";

#[allow(clippy::needless_pass_by_value)]
fn infrastructure(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(err.to_string())
}

impl PgEventRepository {
    /// Creates a new `PgEventRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    #[instrument(skip(self, event), fields(event_id = %event.id()))]
    async fn save(&self, event: &StoredEvent) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO stored_events \
             (id, created_at, aggregate_id, event_type, event_json, user_id, tenant_id, session_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (id) DO UPDATE SET \
             created_at = EXCLUDED.created_at, \
             aggregate_id = EXCLUDED.aggregate_id, \
             event_type = EXCLUDED.event_type, \
             event_json = EXCLUDED.event_json, \
             user_id = EXCLUDED.user_id, \
             tenant_id = EXCLUDED.tenant_id, \
             session_id = EXCLUDED.session_id",
        )
        .bind(event.id())
        .bind(event.created_at())
        .bind(event.aggregate_id())
        .bind(event.event_type())
        .bind(event.event_json())
        .bind(event.user_id())
        .bind(event.tenant_id())
        .bind(event.session_id())
        .execute(&self.pool)
        .await
        .map_err(infrastructure)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<StoredEvent, DomainError> {
        let row: Option<StoredEventRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(infrastructure)?;
        row.map(StoredEvent::from)
            .ok_or(DomainError::EventNotFound(id))
    }

    async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM stored_events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(infrastructure)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::EventNotFound(id));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_since(&self, since: DateTime<Utc>) -> Result<Vec<StoredEvent>, DomainError> {
        let rows: Vec<StoredEventRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE created_at >= $1 ORDER BY created_at, id"
        ))
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(infrastructure)?;
        debug!(count = rows.len(), "loaded events since cursor");
        Ok(rows.into_iter().map(StoredEvent::from).collect())
    }

    #[instrument(skip(self))]
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM stored_events WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(infrastructure)?;
        Ok(result.rows_affected())
    }
}
