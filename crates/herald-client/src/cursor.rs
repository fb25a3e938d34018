//! Replication cursor.
//!
//! The server answers `since` queries inclusively, so every poll returns the
//! events sitting exactly at the cursor again. The cursor therefore keeps
//! the ids it has already processed at its current timestamp and treats a
//! `(timestamp, id)` pair as the real position. Events sharing a timestamp
//! are never skipped and never processed twice.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use herald_core::stored_event::StoredEvent;
use uuid::Uuid;

/// How far a client has replicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    position: DateTime<Utc>,
    seen_at_position: HashSet<Uuid>,
}

impl Cursor {
    /// A cursor at `position` that has seen nothing yet.
    #[must_use]
    pub fn new(position: DateTime<Utc>) -> Self {
        Self {
            position,
            seen_at_position: HashSet::new(),
        }
    }

    /// Timestamp sent as `since` on the next poll.
    #[must_use]
    pub fn position(&self) -> DateTime<Utc> {
        self.position
    }

    /// Returns `true` if `event` lies beyond what has been processed.
    #[must_use]
    pub fn is_new(&self, event: &StoredEvent) -> bool {
        let created_at = event.created_at();
        created_at > self.position
            || (created_at == self.position && !self.seen_at_position.contains(&event.id()))
    }

    /// Moves past every event in `batch`, whether it was delivered or
    /// skipped. Never moves backwards; an empty batch changes nothing.
    pub fn advance<'a>(&mut self, batch: impl IntoIterator<Item = &'a StoredEvent>) {
        for event in batch {
            let created_at = event.created_at();
            if created_at > self.position {
                self.position = created_at;
                self.seen_at_position.clear();
            }
            if created_at == self.position {
                self.seen_at_position.insert(event.id());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_test_support::at;

    fn event_at(created_at: DateTime<Utc>) -> StoredEvent {
        StoredEvent::new(
            Uuid::new_v4(),
            created_at,
            Uuid::new_v4(),
            "orders.placed",
            serde_json::Value::Null,
        )
    }

    #[test]
    fn test_advance_moves_to_latest_timestamp_in_batch() {
        let mut cursor = Cursor::new(at(9, 59, 59));
        let batch = [event_at(at(10, 0, 0)), event_at(at(10, 0, 2)), event_at(at(10, 0, 1))];

        cursor.advance(&batch);

        assert_eq!(cursor.position(), at(10, 0, 2));
    }

    #[test]
    fn test_empty_batch_leaves_cursor_unchanged() {
        let mut cursor = Cursor::new(at(10, 0, 0));

        cursor.advance(&[]);

        assert_eq!(cursor, Cursor::new(at(10, 0, 0)));
    }

    #[test]
    fn test_cursor_never_moves_backwards() {
        let mut cursor = Cursor::new(at(10, 0, 0));

        cursor.advance(&[event_at(at(9, 0, 0))]);

        assert_eq!(cursor.position(), at(10, 0, 0));
    }

    #[test]
    fn test_events_at_cursor_are_new_until_processed() {
        // Arrange
        let mut cursor = Cursor::new(at(10, 0, 0));
        let first = event_at(at(10, 0, 5));
        let same_time = event_at(at(10, 0, 5));
        cursor.advance([&first]);

        // Act / Assert
        assert!(!cursor.is_new(&first));
        assert!(cursor.is_new(&same_time));

        cursor.advance([&same_time]);
        assert!(!cursor.is_new(&same_time));
        assert_eq!(cursor.position(), at(10, 0, 5));
    }

    #[test]
    fn test_events_before_cursor_are_not_new() {
        let cursor = Cursor::new(at(10, 0, 0));

        assert!(!cursor.is_new(&event_at(at(9, 59, 59))));
        assert!(cursor.is_new(&event_at(at(10, 0, 0))));
    }
}
