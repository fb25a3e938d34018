//! Durable side of the bus: persist, then emit.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use herald_core::clock::{Clock, SystemClock};
use herald_core::error::DomainError;
use herald_core::event::SharedEvent;
use herald_core::kind::EventKind;
use herald_core::repository::EventRepository;
use herald_core::stored_event::{StoredEvent, StoredEventFactory, default_factory};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use crate::local::{LocalEventBus, Subscription};

/// Result of one retention sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// No retention is configured; nothing was deleted.
    Disabled,
    /// Events older than `cutoff` were deleted.
    Swept {
        /// Events created strictly before this instant were removed.
        cutoff: DateTime<Utc>,
        /// How many events were removed.
        deleted: u64,
    },
}

/// Bridges a [`LocalEventBus`] to an [`EventRepository`].
///
/// Every published event is stored first and only then emitted locally, so
/// anything a local subscriber has seen can also be replicated.
pub struct EventBusServer {
    repository: Arc<dyn EventRepository>,
    bus: LocalEventBus,
    clock: Arc<dyn Clock>,
    retention: Option<TimeDelta>,
    factory: StoredEventFactory,
}

impl std::fmt::Debug for EventBusServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBusServer")
            .field("bus", &self.bus)
            .field("retention", &self.retention)
            .finish_non_exhaustive()
    }
}

/// Builder for [`EventBusServer`].
pub struct EventBusServerBuilder {
    repository: Arc<dyn EventRepository>,
    bus: Option<LocalEventBus>,
    clock: Arc<dyn Clock>,
    retention: Option<TimeDelta>,
    factory: StoredEventFactory,
}

impl EventBusServerBuilder {
    /// Keeps events for `retention`; without this, retention is unbounded.
    /// Negative durations are treated as zero.
    #[must_use]
    pub fn retention(mut self, retention: TimeDelta) -> Self {
        self.retention = Some(retention.max(TimeDelta::zero()));
        self
    }

    /// Sets an optional retention, e.g. straight from configuration.
    #[must_use]
    pub fn retention_opt(self, retention: Option<TimeDelta>) -> Self {
        match retention {
            Some(retention) => self.retention(retention),
            None => self,
        }
    }

    /// Overrides the time source used by retention sweeps.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Overrides how domain events are projected into stored events.
    #[must_use]
    pub fn factory(mut self, factory: StoredEventFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Emits onto an existing bus instead of a fresh one.
    #[must_use]
    pub fn bus(mut self, bus: LocalEventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Builds the server.
    #[must_use]
    pub fn build(self) -> EventBusServer {
        EventBusServer {
            repository: self.repository,
            bus: self.bus.unwrap_or_default(),
            clock: self.clock,
            retention: self.retention,
            factory: self.factory,
        }
    }
}

impl EventBusServer {
    /// Starts building a server over `repository`.
    #[must_use]
    pub fn builder(repository: Arc<dyn EventRepository>) -> EventBusServerBuilder {
        EventBusServerBuilder {
            repository,
            bus: None,
            clock: Arc::new(SystemClock),
            retention: None,
            factory: default_factory(),
        }
    }

    /// Persists `event` and then emits it on the local bus.
    ///
    /// Returns the stored projection. If persistence fails nothing is
    /// emitted. A failure to emit after a successful save is logged and does
    /// not undo the save.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Closed` if the server is closed, or the
    /// projection/repository error if the event could not be stored.
    #[instrument(
        skip_all,
        fields(event_type = event.event_type(), event_id = %event.metadata().event_id)
    )]
    pub async fn publish(&self, event: SharedEvent) -> Result<StoredEvent, DomainError> {
        if self.bus.is_closed() {
            return Err(DomainError::Closed);
        }

        let stored = (self.factory)(event.as_ref())?;
        self.repository.save(&stored).await?;
        debug!("event persisted");

        if let Err(err) = self.bus.publish(event) {
            warn!(error = %err, "event persisted but not emitted locally");
        }
        Ok(stored)
    }

    /// Subscribes to events emitted by this server.
    #[must_use]
    pub fn subscribe(&self, kind: EventKind) -> Subscription {
        self.bus.subscribe(kind)
    }

    /// The local bus events are emitted on.
    #[must_use]
    pub fn bus(&self) -> &LocalEventBus {
        &self.bus
    }

    /// Configured retention, if any.
    #[must_use]
    pub fn retention(&self) -> Option<TimeDelta> {
        self.retention
    }

    /// Returns stored events created at or after `since`.
    ///
    /// # Errors
    ///
    /// Propagates repository errors.
    pub async fn events_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        self.repository.find_since(since).await
    }

    /// Deletes every stored event older than the retention window.
    ///
    /// Events exactly at the cutoff are kept. Without a configured retention
    /// this deletes nothing. Repeating a sweep with no newly expired events
    /// deletes nothing.
    ///
    /// # Errors
    ///
    /// Propagates repository errors.
    #[instrument(skip(self))]
    pub async fn cleanup(&self) -> Result<CleanupOutcome, DomainError> {
        let Some(retention) = self.retention else {
            debug!("retention sweep skipped: unbounded retention");
            return Ok(CleanupOutcome::Disabled);
        };

        let cutoff = self.clock.retention_cutoff(retention);
        let deleted = self.repository.delete_older_than(cutoff).await?;
        if deleted > 0 {
            info!(%cutoff, deleted, "retention sweep removed expired events");
        } else {
            debug!(%cutoff, "retention sweep found nothing to remove");
        }
        Ok(CleanupOutcome::Swept { cutoff, deleted })
    }

    /// Runs [`cleanup`](Self::cleanup) every `every` until the server is
    /// closed or dropped. Sweep failures are logged and retried on the next
    /// tick.
    #[must_use]
    pub fn spawn_retention_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let server: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(server) = server.upgrade() else {
                    break;
                };
                if server.is_closed() {
                    break;
                }
                if let Err(err) = server.cleanup().await {
                    error!(error = %err, "retention sweep failed");
                }
            }
            debug!("retention sweeper stopped");
        })
    }

    /// Closes the underlying bus. Later publishes fail with
    /// `DomainError::Closed`.
    pub fn close(&self) {
        if self.bus.close() {
            info!("event bus server closed");
        }
    }

    /// Returns `true` once the server has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.bus.is_closed()
    }
}
