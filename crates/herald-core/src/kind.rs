//! Subscription predicates over event type names.
//!
//! Event types are dotted names (`orders.placed`, `orders.line.added`).
//! A [`EventKind::Category`] subscription matches every type below its
//! prefix, which is how a subscriber asks for "this event and all of its
//! subtypes".

use std::fmt;

use crate::event::DomainEvent;

/// Which events a subscription wants to see.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Every event.
    Any,
    /// Exactly one event type.
    Exact(String),
    /// The named category and everything nested under it.
    Category(String),
}

impl EventKind {
    /// Subscription for a single event type.
    #[must_use]
    pub fn exact(event_type: impl Into<String>) -> Self {
        Self::Exact(event_type.into())
    }

    /// Subscription for a category of event types.
    #[must_use]
    pub fn category(prefix: impl Into<String>) -> Self {
        Self::Category(prefix.into())
    }

    /// Returns `true` if an event of `event_type` should be delivered.
    #[must_use]
    pub fn matches_type(&self, event_type: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(name) => name == event_type,
            Self::Category(prefix) => event_type
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('.')),
        }
    }

    /// Returns `true` if `event` should be delivered.
    #[must_use]
    pub fn matches(&self, event: &dyn DomainEvent) -> bool {
        self.matches_type(event.event_type())
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Exact(name) => f.write_str(name),
            Self::Category(prefix) => write!(f, "{prefix}.*"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_matches_everything() {
        assert!(EventKind::Any.matches_type("orders.placed"));
        assert!(EventKind::Any.matches_type(""));
    }

    #[test]
    fn test_exact_matches_only_identical_name() {
        let kind = EventKind::exact("orders.placed");

        assert!(kind.matches_type("orders.placed"));
        assert!(!kind.matches_type("orders.placed.v2"));
        assert!(!kind.matches_type("orders"));
    }

    #[test]
    fn test_category_matches_nested_types_on_segment_boundary() {
        let kind = EventKind::category("orders");

        assert!(kind.matches_type("orders"));
        assert!(kind.matches_type("orders.placed"));
        assert!(kind.matches_type("orders.line.added"));
        assert!(!kind.matches_type("ordersarchive.placed"));
        assert!(!kind.matches_type("billing.orders"));
    }

    #[test]
    fn test_display_renders_wildcards() {
        assert_eq!(EventKind::Any.to_string(), "*");
        assert_eq!(EventKind::category("orders").to_string(), "orders.*");
    }
}
