//! Clock abstraction for retention sweeps and replication cursors.

use chrono::{DateTime, TimeDelta, Utc};

/// Abstraction over system time so retention and cursor logic stay
/// deterministic under test.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;

    /// Returns the instant before which events fall outside `retention`.
    ///
    /// A window reaching past the earliest representable instant yields
    /// `DateTime::<Utc>::MIN_UTC`, so nothing is old enough to expire.
    fn retention_cutoff(&self, retention: TimeDelta) -> DateTime<Utc> {
        self.now()
            .checked_sub_signed(retention)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
