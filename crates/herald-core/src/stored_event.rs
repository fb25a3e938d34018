//! Stored (wire and persistence) representation of a domain event.

use std::any::Any;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::event::{DomainEvent, EventContext, EventMetadata};

/// Durable projection of a domain event plus its authorization attributes.
///
/// Values are built once and never modified; an "update" is a new event.
/// The JSON form is camelCase and omits absent attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEvent {
    id: Uuid,
    created_at: DateTime<Utc>,
    aggregate_id: Uuid,
    event_type: String,
    event_json: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
}

impl StoredEvent {
    /// Creates a stored event without authorization attributes.
    #[must_use]
    pub fn new(
        id: Uuid,
        created_at: DateTime<Utc>,
        aggregate_id: Uuid,
        event_type: impl Into<String>,
        event_json: serde_json::Value,
    ) -> Self {
        Self {
            id,
            created_at,
            aggregate_id,
            event_type: event_type.into(),
            event_json,
            user_id: None,
            tenant_id: None,
            session_id: None,
        }
    }

    /// Sets the user attribute during construction.
    #[must_use]
    pub fn with_user_id(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    /// Sets the tenant attribute during construction.
    #[must_use]
    pub fn with_tenant_id(mut self, tenant_id: Option<String>) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    /// Sets the session attribute during construction.
    #[must_use]
    pub fn with_session_id(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    /// Projects a domain event, extracting authorization attributes from its
    /// context. This is the default [`StoredEventFactory`].
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the payload cannot be
    /// serialized.
    pub fn from_domain_event(event: &dyn DomainEvent) -> Result<Self, DomainError> {
        let meta = event.metadata();
        Ok(Self::new(
            meta.event_id,
            meta.occurred_at,
            meta.aggregate_id,
            event.event_type(),
            event.to_payload()?,
        )
        .with_user_id(meta.context.user_id().map(str::to_owned))
        .with_tenant_id(meta.context.tenant_id().map(str::to_owned))
        .with_session_id(meta.context.session_id().map(str::to_owned)))
    }

    /// Unique event identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// When the event occurred; the replication cursor key.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Aggregate the event belongs to.
    #[must_use]
    pub fn aggregate_id(&self) -> Uuid {
        self.aggregate_id
    }

    /// Event type name used to select a decoder.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Serialized payload.
    #[must_use]
    pub fn event_json(&self) -> &serde_json::Value {
        &self.event_json
    }

    /// User attribute, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Tenant attribute, if any.
    #[must_use]
    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    /// Session attribute, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Rebuilds event metadata, with the authorization attributes placed
    /// back into the context.
    #[must_use]
    pub fn metadata(&self) -> EventMetadata {
        let mut context = EventContext::new();
        if let Some(user_id) = &self.user_id {
            context = context.with_user_id(user_id.clone());
        }
        if let Some(tenant_id) = &self.tenant_id {
            context = context.with_tenant_id(tenant_id.clone());
        }
        if let Some(session_id) = &self.session_id {
            context = context.with_session_id(session_id.clone());
        }
        EventMetadata {
            event_id: self.id,
            aggregate_id: self.aggregate_id,
            occurred_at: self.created_at,
            context,
        }
    }
}

/// Builds the stored projection of a domain event.
pub type StoredEventFactory =
    Arc<dyn Fn(&dyn DomainEvent) -> Result<StoredEvent, DomainError> + Send + Sync>;

/// Returns a factory backed by [`StoredEvent::from_domain_event`].
#[must_use]
pub fn default_factory() -> StoredEventFactory {
    Arc::new(StoredEvent::from_domain_event)
}

/// A domain event whose concrete type is unknown locally.
///
/// Used when an event arrives over the wire and must be persisted and
/// re-emitted without decoding its payload.
#[derive(Debug, Clone)]
pub struct RemoteEvent {
    stored: StoredEvent,
    metadata: EventMetadata,
}

impl RemoteEvent {
    /// Wraps a stored event.
    #[must_use]
    pub fn new(stored: StoredEvent) -> Self {
        let metadata = stored.metadata();
        Self { stored, metadata }
    }

    /// The wrapped stored event.
    #[must_use]
    pub fn stored(&self) -> &StoredEvent {
        &self.stored
    }
}

impl DomainEvent for RemoteEvent {
    fn event_type(&self) -> &str {
        self.stored.event_type()
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn to_payload(&self) -> Result<serde_json::Value, DomainError> {
        Ok(self.stored.event_json.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
