//! Sample event payloads shared by the bus, client, and API tests.

use chrono::{DateTime, TimeZone, Utc};
use herald_core::event::{Envelope, EventPayload};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emitted when an order is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    /// The order identifier.
    pub order_id: Uuid,
    /// Order total in cents.
    pub total_cents: u64,
}

impl EventPayload for OrderPlaced {
    const EVENT_TYPE: &'static str = "orders.placed";
}

/// Emitted when an order leaves the warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderShipped {
    /// The order identifier.
    pub order_id: Uuid,
    /// Carrier name.
    pub carrier: String,
}

impl EventPayload for OrderShipped {
    const EVENT_TYPE: &'static str = "orders.shipped";
}

/// A timestamp on the shared test day, 2026-01-15 (UTC).
///
/// # Panics
///
/// Panics if the components do not form a valid time of day.
#[must_use]
pub fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, hour, minute, second).unwrap()
}

/// An `orders.placed` event for a new order, occurring at `occurred_at`.
#[must_use]
pub fn order_placed(occurred_at: DateTime<Utc>, total_cents: u64) -> Envelope<OrderPlaced> {
    let order_id = Uuid::new_v4();
    Envelope::new(
        order_id,
        occurred_at,
        OrderPlaced {
            order_id,
            total_cents,
        },
    )
}

/// An `orders.shipped` event for `order_id`, occurring at `occurred_at`.
#[must_use]
pub fn order_shipped(occurred_at: DateTime<Utc>, order_id: Uuid) -> Envelope<OrderShipped> {
    Envelope::new(
        order_id,
        occurred_at,
        OrderShipped {
            order_id,
            carrier: "ups".to_owned(),
        },
    )
}
