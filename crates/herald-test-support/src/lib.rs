//! Shared test doubles and fixtures for the Herald event replication system.

mod clock;
mod events;
mod repository;

pub use clock::{FixedClock, ManualClock};
pub use events::{OrderPlaced, OrderShipped, at, order_placed, order_shipped};
pub use repository::{FailingEventRepository, InMemoryEventRepository};
