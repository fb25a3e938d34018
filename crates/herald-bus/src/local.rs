//! In-process publish/subscribe bus.
//!
//! Every subscription owns an unbounded channel. `publish` walks the
//! subscriber list under a mutex and pushes the event into each matching
//! channel, so a subscriber sees events in publish order and a slow or
//! failing subscriber never holds up the others.

use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use herald_core::error::DomainError;
use herald_core::event::SharedEvent;
use herald_core::kind::EventKind;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

#[derive(Debug)]
struct Subscriber {
    kind: EventKind,
    sender: mpsc::UnboundedSender<SharedEvent>,
}

#[derive(Debug, Default)]
struct BusState {
    closed: bool,
    subscribers: Vec<Subscriber>,
}

/// Broadcast bus for domain events.
///
/// Cloning yields another handle to the same bus.
#[derive(Debug, Clone, Default)]
pub struct LocalEventBus {
    state: Arc<Mutex<BusState>>,
}

impl LocalEventBus {
    /// Creates an open bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BusState>, DomainError> {
        self.state
            .lock()
            .map_err(|_| DomainError::Infrastructure("event bus lock poisoned".into()))
    }

    /// Delivers `event` to every subscription whose kind matches it and
    /// returns the number of subscriptions it reached.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Closed` if the bus has been closed.
    pub fn publish(&self, event: SharedEvent) -> Result<usize, DomainError> {
        let mut state = self.lock()?;
        if state.closed {
            return Err(DomainError::Closed);
        }

        let mut delivered = 0;
        state.subscribers.retain(|subscriber| {
            if !subscriber.kind.matches(event.as_ref()) {
                return !subscriber.sender.is_closed();
            }
            // A failed send means the receiver was dropped.
            let alive = subscriber.sender.send(Arc::clone(&event)).is_ok();
            if alive {
                delivered += 1;
            }
            alive
        });

        debug!(
            event_type = event.event_type(),
            event_id = %event.metadata().event_id,
            delivered,
            "event published on local bus"
        );
        Ok(delivered)
    }

    /// Opens a subscription that yields every event matching `kind`
    /// published from now on.
    ///
    /// Subscribing to a closed bus returns a subscription that is already at
    /// end-of-stream.
    #[must_use]
    pub fn subscribe(&self, kind: EventKind) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        match self.lock() {
            Ok(mut state) if !state.closed => {
                state.subscribers.push(Subscriber {
                    kind: kind.clone(),
                    sender,
                });
            }
            // Dropping the sender ends the subscription immediately.
            _ => drop(sender),
        }
        Subscription { kind, receiver }
    }

    /// Runs `handler` for every event matching `kind` on a dedicated task.
    ///
    /// Handler errors are logged and the loop continues; they never reach
    /// other subscribers. The task ends when the bus closes.
    pub fn spawn_handler<F, Fut, E>(&self, kind: EventKind, mut handler: F) -> JoinHandle<()>
    where
        F: FnMut(SharedEvent) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + 'static,
    {
        let mut subscription = self.subscribe(kind);
        tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                let event_type = event.event_type().to_owned();
                let event_id = event.metadata().event_id;
                if let Err(err) = handler(event).await {
                    warn!(
                        event_type = %event_type,
                        %event_id,
                        error = %err,
                        kind = %subscription.kind(),
                        "event handler failed"
                    );
                }
            }
        })
    }

    /// Closes the bus: every subscription reaches end-of-stream and later
    /// publishes fail.
    ///
    /// Returns `false` if the bus was already closed; closing twice is a
    /// no-op.
    pub fn close(&self) -> bool {
        let Ok(mut state) = self.lock() else {
            return false;
        };
        if state.closed {
            debug!("local event bus already closed");
            return false;
        }
        state.closed = true;
        let dropped = state.subscribers.len();
        state.subscribers.clear();
        debug!(subscriptions = dropped, "local event bus closed");
        true
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().map_or(true, |state| state.closed)
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().map_or(0, |state| {
            state
                .subscribers
                .iter()
                .filter(|s| !s.sender.is_closed())
                .count()
        })
    }
}

/// One subscriber's view of a [`LocalEventBus`].
#[derive(Debug)]
pub struct Subscription {
    kind: EventKind,
    receiver: mpsc::UnboundedReceiver<SharedEvent>,
}

impl Subscription {
    /// What this subscription matches.
    #[must_use]
    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Waits for the next event; `None` once the bus has closed and every
    /// buffered event has been taken.
    pub async fn recv(&mut self) -> Option<SharedEvent> {
        self.receiver.recv().await
    }

    /// Takes the next buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<SharedEvent> {
        self.receiver.try_recv().ok()
    }

    /// Converts the subscription into a `Stream`.
    #[must_use]
    pub fn into_stream(self) -> UnboundedReceiverStream<SharedEvent> {
        UnboundedReceiverStream::new(self.receiver)
    }
}
