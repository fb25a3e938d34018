//! Origin tracking that keeps auto-forward from echoing events.
//!
//! Events the poller republishes are marked inbound so the forwarder does
//! not send them back. Events the forwarder sends are marked outbound so the
//! poller does not republish them when the server returns them.

use std::collections::{HashSet, VecDeque};

use uuid::Uuid;

/// Upper bound on ids remembered per direction.
const MAX_TRACKED: usize = 10_000;

#[derive(Debug, Default)]
struct BoundedIdSet {
    order: VecDeque<Uuid>,
    ids: HashSet<Uuid>,
}

impl BoundedIdSet {
    fn insert(&mut self, id: Uuid) {
        if !self.ids.insert(id) {
            return;
        }
        self.order.push_back(id);
        if self.order.len() > MAX_TRACKED {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
    }

    fn take(&mut self, id: Uuid) -> bool {
        if self.ids.remove(&id) {
            self.order.retain(|tracked| *tracked != id);
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct OriginTracker {
    inbound: BoundedIdSet,
    outbound: BoundedIdSet,
}

impl OriginTracker {
    pub(crate) fn mark_inbound(&mut self, id: Uuid) {
        self.inbound.insert(id);
    }

    /// Returns `true` (once) if `id` came from the server.
    pub(crate) fn take_inbound(&mut self, id: Uuid) -> bool {
        self.inbound.take(id)
    }

    pub(crate) fn mark_outbound(&mut self, id: Uuid) {
        self.outbound.insert(id);
    }

    /// Returns `true` (once) if `id` was forwarded by this client.
    pub(crate) fn take_outbound(&mut self, id: Uuid) -> bool {
        self.outbound.take(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marks_are_consumed_once() {
        let mut tracker = OriginTracker::default();
        let id = Uuid::new_v4();

        tracker.mark_outbound(id);

        assert!(!tracker.take_inbound(id));
        assert!(tracker.take_outbound(id));
        assert!(!tracker.take_outbound(id));
    }

    #[test]
    fn test_oldest_ids_are_evicted_past_capacity() {
        let mut tracker = OriginTracker::default();
        let first = Uuid::new_v4();
        tracker.mark_inbound(first);

        for _ in 0..MAX_TRACKED {
            tracker.mark_inbound(Uuid::new_v4());
        }

        assert!(!tracker.take_inbound(first));
    }
}
