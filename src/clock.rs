//! Time source for the store.
//!
//! Every timestamp the store writes, and every "now" a ranking decays
//! against, comes from a [`Clock`]. Production code uses [`LocalClock`];
//! tests and benchmarks drive a [`ManualClock`] by hand.

use chrono::{DateTime, Duration, FixedOffset, Local};
use std::cell::Cell;

/// Source of the current wall-clock time, with the offset that should be
/// stored alongside it.
pub trait Clock {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// The system clock in the local time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Cell<DateTime<FixedOffset>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn set(&self, now: DateTime<FixedOffset>) {
        self.now.set(now);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.now.get()
    }
}
