// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::{Duration, Instant};

/// Status poll interval.
pub const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(1000);
/// Per-job elapsed-time tick.
pub const JOB_TIMER_INTERVAL: Duration = Duration::from_millis(1000);
/// Follow-to-bottom tick for the output pane.
pub const SCROLL_FOLLOW_INTERVAL: Duration = Duration::from_millis(200);

/// A fixed-interval deadline owned by the run loop. All repeating work hangs
/// off a `Cadence` held on the loop's stack, so every timer dies with the
/// view instead of leaking. Deadlines compare against caller-supplied
/// instants, which keeps tests free of sleeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    period: Duration,
    next_due: Instant,
}

impl Cadence {
    pub fn new(period: Duration, now: Instant) -> Self {
        Self {
            period,
            next_due: now + period,
        }
    }

    /// Whether the deadline has passed. Advances to the next one when it
    /// fires. A long stall yields a single catch-up tick, not a burst.
    pub fn due(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due = now + self.period;
        true
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}
