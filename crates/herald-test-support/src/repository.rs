//! Test repositories: `EventRepository` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use herald_core::error::DomainError;
use herald_core::repository::EventRepository;
use herald_core::stored_event::StoredEvent;
use uuid::Uuid;

/// A mutex-guarded map of events. Safe for concurrent callers; every call
/// holds the lock for its whole duration.
#[derive(Debug, Default)]
pub struct InMemoryEventRepository {
    events: Mutex<HashMap<Uuid, StoredEvent>>,
}

impl InMemoryEventRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-loaded with `events`.
    #[must_use]
    pub fn with_events(events: impl IntoIterator<Item = StoredEvent>) -> Self {
        Self {
            events: Mutex::new(events.into_iter().map(|e| (e.id(), e)).collect()),
        }
    }

    /// Returns a snapshot of every stored event, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn snapshot(&self) -> Vec<StoredEvent> {
        let mut events: Vec<StoredEvent> = self.events.lock().unwrap().values().cloned().collect();
        events.sort_by_key(|e| (e.created_at(), e.id()));
        events
    }

    /// Number of stored events.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, StoredEvent>>, DomainError> {
        self.events
            .lock()
            .map_err(|_| DomainError::Infrastructure("repository lock poisoned".into()))
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn save(&self, event: &StoredEvent) -> Result<(), DomainError> {
        self.lock()?.insert(event.id(), event.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<StoredEvent, DomainError> {
        self.lock()?
            .get(&id)
            .cloned()
            .ok_or(DomainError::EventNotFound(id))
    }

    async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        self.lock()?
            .remove(&id)
            .map(|_| ())
            .ok_or(DomainError::EventNotFound(id))
    }

    async fn find_since(&self, since: DateTime<Utc>) -> Result<Vec<StoredEvent>, DomainError> {
        let mut found: Vec<StoredEvent> = self
            .lock()?
            .values()
            .filter(|e| e.created_at() >= since)
            .cloned()
            .collect();
        found.sort_by_key(|e| (e.created_at(), e.id()));
        Ok(found)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DomainError> {
        let mut events = self.lock()?;
        let before = events.len();
        events.retain(|_, e| e.created_at() >= cutoff);
        Ok((before - events.len()) as u64)
    }
}

/// An event repository that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventRepository;

#[async_trait]
impl EventRepository for FailingEventRepository {
    async fn save(&self, _event: &StoredEvent) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn get(&self, _id: Uuid) -> Result<StoredEvent, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn delete(&self, _id: Uuid) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn find_since(&self, _since: DateTime<Utc>) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn delete_older_than(&self, _cutoff: DateTime<Utc>) -> Result<u64, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
