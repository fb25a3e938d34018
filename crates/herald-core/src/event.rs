//! Domain event abstractions.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Context key holding the acting user.
pub const USER_ID_KEY: &str = "userId";
/// Context key holding the owning tenant.
pub const TENANT_ID_KEY: &str = "tenantId";
/// Context key holding the originating session.
pub const SESSION_ID_KEY: &str = "sessionId";

/// Open key-value map carried by every event.
///
/// Authorization attributes live under [`USER_ID_KEY`], [`TENANT_ID_KEY`]
/// and [`SESSION_ID_KEY`]; anything else is free-form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventContext(BTreeMap<String, String>);

impl EventContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of this context with `key` set to `value`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Returns a copy of this context with the user attribute set.
    #[must_use]
    pub fn with_user_id(self, user_id: impl Into<String>) -> Self {
        self.with(USER_ID_KEY, user_id)
    }

    /// Returns a copy of this context with the tenant attribute set.
    #[must_use]
    pub fn with_tenant_id(self, tenant_id: impl Into<String>) -> Self {
        self.with(TENANT_ID_KEY, tenant_id)
    }

    /// Returns a copy of this context with the session attribute set.
    #[must_use]
    pub fn with_session_id(self, session_id: impl Into<String>) -> Self {
        self.with(SESSION_ID_KEY, session_id)
    }

    /// Looks up an arbitrary key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// The acting user, if recorded.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.get(USER_ID_KEY)
    }

    /// The owning tenant, if recorded.
    #[must_use]
    pub fn tenant_id(&self) -> Option<&str> {
        self.get(TENANT_ID_KEY)
    }

    /// The originating session, if recorded.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.get(SESSION_ID_KEY)
    }

    /// Returns `true` if no keys are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Metadata attached to every domain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate this event belongs to.
    pub aggregate_id: Uuid,
    /// Timestamp of event creation; doubles as the replication cursor key.
    pub occurred_at: DateTime<Utc>,
    /// Free-form context, including authorization attributes.
    #[serde(default)]
    pub context: EventContext,
}

impl EventMetadata {
    /// Creates metadata with a fresh time-ordered event id and an empty context.
    #[must_use]
    pub fn new(aggregate_id: Uuid, occurred_at: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            aggregate_id,
            occurred_at,
            context: EventContext::new(),
        }
    }

    /// Returns a copy of this metadata carrying `context`.
    #[must_use]
    pub fn with_context(mut self, context: EventContext) -> Self {
        self.context = context;
        self
    }
}

/// Trait that all domain events implement.
///
/// The event type is the routing discriminant: it selects a decoder on the
/// receiving side and drives [`crate::kind::EventKind`] subscription
/// matching. Types are dotted names such as `orders.placed`.
pub trait DomainEvent: Any + Send + Sync + Debug {
    /// Returns the event type name.
    fn event_type(&self) -> &str;

    /// Returns the metadata for this event.
    fn metadata(&self) -> &EventMetadata;

    /// Serializes the event payload to JSON.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the payload cannot be
    /// represented as JSON.
    fn to_payload(&self) -> Result<serde_json::Value, DomainError>;

    /// Upcast used to recover the concrete event type.
    fn as_any(&self) -> &dyn Any;
}

impl dyn DomainEvent {
    /// Returns the concrete event if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: DomainEvent>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// The form in which events travel over a local bus.
pub type SharedEvent = Arc<dyn DomainEvent>;

/// A serde payload with a fixed event type name.
///
/// Implementing this is enough to publish the payload through
/// [`Envelope`] and to register it with a client-side decoder.
pub trait EventPayload: Serialize + DeserializeOwned + Debug + Send + Sync + 'static {
    /// The event type name this payload is published under.
    const EVENT_TYPE: &'static str;
}

/// Generic domain event: metadata plus a typed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<P> {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub payload: P,
}

impl<P: EventPayload> Envelope<P> {
    /// Wraps `payload` with fresh metadata.
    #[must_use]
    pub fn new(aggregate_id: Uuid, occurred_at: DateTime<Utc>, payload: P) -> Self {
        Self {
            metadata: EventMetadata::new(aggregate_id, occurred_at),
            payload,
        }
    }

    /// Returns a copy of this envelope carrying `context`.
    #[must_use]
    pub fn with_context(mut self, context: EventContext) -> Self {
        self.metadata.context = context;
        self
    }

    /// Moves the envelope into the shared form carried by a bus.
    #[must_use]
    pub fn shared(self) -> SharedEvent {
        Arc::new(self)
    }
}

impl<P: EventPayload> DomainEvent for Envelope<P> {
    fn event_type(&self) -> &str {
        P::EVENT_TYPE
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn to_payload(&self) -> Result<serde_json::Value, DomainError> {
        Ok(serde_json::to_value(&self.payload)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct Pinged {
        count: u32,
    }

    impl EventPayload for Pinged {
        const EVENT_TYPE: &'static str = "test.pinged";
    }

    #[test]
    fn test_context_accessors_read_authorization_keys() {
        let context = EventContext::new()
            .with_user_id("u-1")
            .with_tenant_id("t-1")
            .with("traceId", "abc");

        assert_eq!(context.user_id(), Some("u-1"));
        assert_eq!(context.tenant_id(), Some("t-1"));
        assert_eq!(context.session_id(), None);
        assert_eq!(context.get("traceId"), Some("abc"));
    }

    #[test]
    fn test_envelope_reports_payload_event_type() {
        let at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let event = Envelope::new(Uuid::new_v4(), at, Pinged { count: 3 });

        assert_eq!(event.event_type(), "test.pinged");
        assert_eq!(event.metadata().occurred_at, at);
        assert_eq!(event.to_payload().unwrap(), serde_json::json!({ "count": 3 }));
    }

    #[test]
    fn test_downcast_ref_recovers_concrete_envelope() {
        let at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let shared = Envelope::new(Uuid::new_v4(), at, Pinged { count: 7 }).shared();

        let typed = shared.downcast_ref::<Envelope<Pinged>>().unwrap();

        assert_eq!(typed.payload.count, 7);
    }
}
