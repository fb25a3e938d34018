//! Event repository abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;
use crate::stored_event::StoredEvent;

/// Durable store of [`StoredEvent`]s keyed by event id.
///
/// Implementations must be safe for concurrent callers: the server saves on
/// every publish while polls read and retention sweeps delete. Each call is
/// expected to be individually atomic; callers do not coordinate across
/// calls.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Inserts the event, replacing any existing event with the same id.
    async fn save(&self, event: &StoredEvent) -> Result<(), DomainError>;

    /// Loads one event.
    ///
    /// Returns `DomainError::EventNotFound` if no event has `id`.
    async fn get(&self, id: Uuid) -> Result<StoredEvent, DomainError>;

    /// Deletes one event.
    ///
    /// Returns `DomainError::EventNotFound` if no event has `id`.
    async fn delete(&self, id: Uuid) -> Result<(), DomainError>;

    /// Returns every event with `created_at >= since`, ordered by
    /// `created_at` and then by id.
    async fn find_since(&self, since: DateTime<Utc>) -> Result<Vec<StoredEvent>, DomainError>;

    /// Irreversibly removes every event with `created_at < cutoff` and
    /// returns how many were removed.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DomainError>;
}
