//! Report cadence
//!
//! Time is passed in as a monotonic millisecond count so the schedule can be
//! driven by `embassy_time::Instant` on the device and by plain numbers in
//! tests.

/// Decides when the next report cycle is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSchedule {
    interval_ms: u64,
    last_sent_ms: Option<u64>,
}

impl ReportSchedule {
    /// A schedule with no previous report, so the first check is due at once.
    pub const fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_sent_ms: None,
        }
    }

    pub const fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub const fn last_sent_ms(&self) -> Option<u64> {
        self.last_sent_ms
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        match self.last_sent_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.interval_ms,
        }
    }

    /// Record `at_ms` as the reference for the next interval.
    pub fn mark_sent(&mut self, at_ms: u64) {
        self.last_sent_ms = Some(at_ms);
    }

    /// Milliseconds until the next cycle is due, zero if it already is.
    pub fn due_in(&self, now_ms: u64) -> u64 {
        match self.last_sent_ms {
            None => 0,
            Some(last) => (last + self.interval_ms).saturating_sub(now_ms),
        }
    }
}
