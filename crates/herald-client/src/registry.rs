//! Event registry: which remote event types this client understands.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use herald_core::error::DomainError;
use herald_core::event::{Envelope, EventPayload, SharedEvent};
use herald_core::stored_event::StoredEvent;

/// Rebuilds a domain event from its stored form.
pub type EventDecoder = Arc<dyn Fn(&StoredEvent) -> Result<SharedEvent, DomainError> + Send + Sync>;

/// Immutable map from event type name to decoder.
///
/// A client only needs decoders for the types it cares about; anything else
/// is skipped during replication.
#[derive(Clone, Default)]
pub struct EventRegistry {
    decoders: Arc<HashMap<String, EventDecoder>>,
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&str> = self.event_types().collect();
        types.sort_unstable();
        f.debug_struct("EventRegistry")
            .field("event_types", &types)
            .finish()
    }
}

impl EventRegistry {
    /// Starts an empty registry.
    #[must_use]
    pub fn builder() -> EventRegistryBuilder {
        EventRegistryBuilder::default()
    }

    /// Decodes `stored`, or returns `None` if its type is not registered.
    #[must_use]
    pub fn decode(&self, stored: &StoredEvent) -> Option<Result<SharedEvent, DomainError>> {
        self.decoders
            .get(stored.event_type())
            .map(|decoder| decoder(stored))
    }

    /// Returns `true` if `event_type` has a decoder.
    #[must_use]
    pub fn contains(&self, event_type: &str) -> bool {
        self.decoders.contains_key(event_type)
    }

    /// Registered type names, in no particular order.
    pub fn event_types(&self) -> impl Iterator<Item = &str> {
        self.decoders.keys().map(String::as_str)
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

/// Collects decoders before freezing them into an [`EventRegistry`].
#[derive(Default)]
pub struct EventRegistryBuilder {
    decoders: HashMap<String, EventDecoder>,
}

impl EventRegistryBuilder {
    /// Registers `decoder` for `event_type`, replacing any earlier one.
    #[must_use]
    pub fn register<F>(mut self, event_type: impl Into<String>, decoder: F) -> Self
    where
        F: Fn(&StoredEvent) -> Result<SharedEvent, DomainError> + Send + Sync + 'static,
    {
        self.decoders.insert(event_type.into(), Arc::new(decoder));
        self
    }

    /// Registers `P` under its own event type, decoding into an
    /// [`Envelope<P>`].
    #[must_use]
    pub fn register_payload<P: EventPayload>(self) -> Self {
        self.register(P::EVENT_TYPE, |stored: &StoredEvent| {
            let payload: P = serde_json::from_value(stored.event_json().clone())?;
            let event: SharedEvent = Arc::new(Envelope {
                metadata: stored.metadata(),
                payload,
            });
            Ok(event)
        })
    }

    /// Freezes the registry.
    #[must_use]
    pub fn build(self) -> EventRegistry {
        EventRegistry {
            decoders: Arc::new(self.decoders),
        }
    }
}
