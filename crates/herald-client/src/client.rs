//! The replicating event bus client.
//!
//! Lifecycle is `Created -> Polling -> Closed`. There is no reconnecting
//! state: a failed poll counts as an empty batch and the next tick retries.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use herald_bus::local::{LocalEventBus, Subscription};
use herald_core::clock::{Clock, SystemClock};
use herald_core::error::DomainError;
use herald_core::event::SharedEvent;
use herald_core::kind::EventKind;
use herald_core::stored_event::{StoredEventFactory, default_factory};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::cursor::Cursor;
use crate::error::ClientError;
use crate::origin::OriginTracker;
use crate::registry::EventRegistry;
use crate::transport::{EventTransport, HttpTransport};

/// Where a client is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Constructed; nothing scheduled yet.
    Created,
    /// Poll loop (and forwarder, if enabled) running.
    Polling,
    /// Terminal.
    Closed,
}

/// What one poll did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollReport {
    /// Events decoded and republished locally.
    pub received: usize,
    /// Events with an unregistered or undecodable type.
    pub skipped: usize,
    /// Events already processed by an earlier poll.
    pub duplicates: usize,
    /// Events this client forwarded itself, coming back from the server.
    pub echoes: usize,
    /// Cursor after the poll.
    pub cursor: DateTime<Utc>,
}

struct ClientInner {
    config: ClientConfig,
    registry: EventRegistry,
    transport: Arc<dyn EventTransport>,
    bus: LocalEventBus,
    factory: StoredEventFactory,
    cursor: tokio::sync::Mutex<Cursor>,
    origins: Mutex<OriginTracker>,
}

/// Replicates events from a Herald server into a local bus.
pub struct EventBusClient {
    inner: Arc<ClientInner>,
    state: Mutex<ClientState>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for EventBusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBusClient")
            .field("server_url", &self.inner.config.server_url)
            .field("state", &self.state())
            .field("registry", &self.inner.registry)
            .finish_non_exhaustive()
    }
}

impl EventBusClient {
    /// Creates a client in the `Created` state. The cursor starts at
    /// `config.initial_cursor`, or at the current system time.
    #[must_use]
    pub fn new(
        config: ClientConfig,
        registry: EventRegistry,
        transport: Arc<dyn EventTransport>,
    ) -> Self {
        Self::with_clock(config, registry, transport, &SystemClock)
    }

    /// Like [`new`](Self::new), reading the default cursor from `clock`.
    #[must_use]
    pub fn with_clock(
        config: ClientConfig,
        registry: EventRegistry,
        transport: Arc<dyn EventTransport>,
        clock: &dyn Clock,
    ) -> Self {
        let cursor = Cursor::new(config.initial_cursor.unwrap_or_else(|| clock.now()));
        Self {
            inner: Arc::new(ClientInner {
                config,
                registry,
                transport,
                bus: LocalEventBus::new(),
                factory: default_factory(),
                cursor: tokio::sync::Mutex::new(cursor),
                origins: Mutex::new(OriginTracker::default()),
            }),
            state: Mutex::new(ClientState::Created),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Creates a client with an [`HttpTransport`] and starts it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Transport` if the HTTP client cannot be built.
    pub fn connect(config: ClientConfig, registry: EventRegistry) -> Result<Self, ClientError> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        let client = Self::new(config, registry, transport);
        client.start()?;
        Ok(client)
    }

    /// Starts the poll loop and, with auto-forward, the forwarder.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::State` unless the client is `Created`, or if
    /// the configured poll interval is zero.
    pub fn start(&self) -> Result<(), ClientError> {
        let mut state = self.lock_state()?;
        match *state {
            ClientState::Created => {}
            ClientState::Polling => return Err(ClientError::State("client already started")),
            ClientState::Closed => return Err(ClientError::State("client is closed")),
        }
        if self.inner.config.poll_interval.is_zero() {
            return Err(ClientError::State("poll interval must be greater than zero"));
        }

        let mut tasks = self
            .tasks
            .lock()
            .map_err(|_| ClientError::State("client task list poisoned"))?;
        if self.inner.config.auto_forward {
            // Subscribe before polling starts so no inbound event is missed.
            let subscription = self.inner.bus.subscribe(EventKind::Any);
            tasks.push(tokio::spawn(forward_loop(Arc::clone(&self.inner), subscription)));
        }
        tasks.push(tokio::spawn(poll_loop(Arc::clone(&self.inner))));
        *state = ClientState::Polling;

        info!(
            server_url = %self.inner.config.server_url,
            poll_interval_ms =
                u64::try_from(self.inner.config.poll_interval.as_millis()).unwrap_or(u64::MAX),
            auto_forward = self.inner.config.auto_forward,
            registered_types = self.inner.registry.len(),
            "event bus client started"
        );
        Ok(())
    }

    /// Runs a single poll immediately, independent of the timer.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the fetch failed (the cursor is left
    /// untouched), or `DomainError::Closed` if the client is closed.
    pub async fn poll_once(&self) -> Result<PollReport, ClientError> {
        self.inner.poll_once().await
    }

    /// Publishes `event` on the local bus; with auto-forward it is also sent
    /// to the server.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Closed` if the client is closed.
    pub fn publish(&self, event: SharedEvent) -> Result<usize, ClientError> {
        Ok(self.inner.bus.publish(event)?)
    }

    /// Subscribes to replicated and locally published events.
    #[must_use]
    pub fn subscribe(&self, kind: EventKind) -> Subscription {
        self.inner.bus.subscribe(kind)
    }

    /// The client's local bus.
    #[must_use]
    pub fn bus(&self) -> &LocalEventBus {
        &self.inner.bus
    }

    /// The registry used to decode replicated events.
    #[must_use]
    pub fn registry(&self) -> &EventRegistry {
        &self.inner.registry
    }

    /// Current cursor position.
    pub async fn cursor(&self) -> DateTime<Utc> {
        self.inner.cursor.lock().await.position()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ClientState {
        self.state
            .lock()
            .map_or(ClientState::Closed, |state| *state)
    }

    /// Stops the timer and the forwarder and closes the local bus.
    ///
    /// In-flight requests are abandoned and their results discarded.
    /// Calling `close` again does nothing.
    pub fn close(&self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if *state == ClientState::Closed {
            return;
        }
        *state = ClientState::Closed;
        self.abort_tasks();
        self.inner.bus.close();
        info!(server_url = %self.inner.config.server_url, "event bus client closed");
    }

    fn abort_tasks(&self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, ClientState>, ClientError> {
        self.state
            .lock()
            .map_err(|_| ClientError::State("client state poisoned"))
    }
}

impl Drop for EventBusClient {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

impl ClientInner {
    fn origins(&self) -> Result<std::sync::MutexGuard<'_, OriginTracker>, ClientError> {
        self.origins
            .lock()
            .map_err(|_| ClientError::State("origin tracker poisoned"))
    }

    #[instrument(skip(self), fields(server_url = %self.config.server_url))]
    async fn poll_once(&self) -> Result<PollReport, ClientError> {
        if self.bus.is_closed() {
            return Err(DomainError::Closed.into());
        }

        // Held across the fetch so concurrent polls cannot interleave.
        let mut cursor = self.cursor.lock().await;
        let mut batch = self.transport.fetch_since(cursor.position()).await?;
        // Stable: keeps the server's order among equal timestamps.
        batch.sort_by_key(herald_core::stored_event::StoredEvent::created_at);

        let mut report = PollReport {
            received: 0,
            skipped: 0,
            duplicates: 0,
            echoes: 0,
            cursor: cursor.position(),
        };

        for stored in &batch {
            if !cursor.is_new(stored) {
                report.duplicates += 1;
                continue;
            }
            if self.origins()?.take_outbound(stored.id()) {
                report.echoes += 1;
                continue;
            }
            let event = match self.registry.decode(stored) {
                None => {
                    debug!(
                        event_type = stored.event_type(),
                        event_id = %stored.id(),
                        "skipping unregistered event type"
                    );
                    report.skipped += 1;
                    continue;
                }
                Some(Err(err)) => {
                    warn!(
                        event_type = stored.event_type(),
                        event_id = %stored.id(),
                        error = %err,
                        "skipping undecodable event"
                    );
                    report.skipped += 1;
                    continue;
                }
                Some(Ok(event)) => event,
            };
            if self.config.auto_forward {
                self.origins()?.mark_inbound(stored.id());
            }
            self.bus.publish(event)?;
            report.received += 1;
        }

        cursor.advance(&batch);
        report.cursor = cursor.position();
        if !batch.is_empty() {
            debug!(
                received = report.received,
                skipped = report.skipped,
                duplicates = report.duplicates,
                echoes = report.echoes,
                cursor = %report.cursor,
                "poll processed batch"
            );
        }
        Ok(report)
    }

    async fn forward(&self, event: &SharedEvent) -> Result<(), ClientError> {
        let stored = (self.factory)(event.as_ref())?;
        self.origins()?.mark_outbound(stored.id());
        if let Err(err) = self.transport.forward(&stored).await {
            self.origins()?.take_outbound(stored.id());
            return Err(err);
        }
        Ok(())
    }
}

async fn poll_loop(inner: Arc<ClientInner>) {
    let mut ticker = tokio::time::interval(inner.config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match inner.poll_once().await {
            Ok(_) => {}
            Err(ClientError::Domain(DomainError::Closed)) => break,
            Err(err) => warn!(error = %err, "poll failed; treating as empty batch"),
        }
    }
    debug!("poll loop stopped");
}

async fn forward_loop(inner: Arc<ClientInner>, mut subscription: Subscription) {
    while let Some(event) = subscription.recv().await {
        let event_id = event.metadata().event_id;
        let inbound = match inner.origins() {
            Ok(mut origins) => origins.take_inbound(event_id),
            Err(_) => false,
        };
        if inbound {
            continue;
        }
        if let Err(err) = inner.forward(&event).await {
            warn!(
                event_type = event.event_type(),
                %event_id,
                error = %err,
                "failed to forward event to server"
            );
        }
    }
    debug!("forward loop stopped");
}
