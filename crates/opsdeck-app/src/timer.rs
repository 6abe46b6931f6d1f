// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{Job, ProcessId};

/// Render elapsed whole seconds the way the job list shows them. Minutes do
/// not roll over into hours.
pub fn format_elapsed(elapsed_seconds: u64) -> String {
    let minutes = elapsed_seconds / 60;
    let seconds = elapsed_seconds % 60;
    if minutes == 0 {
        format!("{seconds}s")
    } else {
        format!("{minutes}m{seconds}s")
    }
}

/// Per-job elapsed-time counters for the running set. Finished jobs never
/// tick and carry no timer. A timer resets only when its process id
/// reappears after an absence from the running set; while the id stays
/// running across snapshots the count persists.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobTimers {
    elapsed: Vec<(ProcessId, u64)>,
}

impl JobTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile against the authoritative running list: departed ids lose
    /// their timer, newly reported ids start at zero, surviving ids keep
    /// their count.
    pub fn sync(&mut self, running: &[Job]) {
        self.elapsed
            .retain(|(id, _)| running.iter().any(|job| job.process_id == *id));
        for job in running {
            if !self.elapsed.iter().any(|(id, _)| *id == job.process_id) {
                self.elapsed.push((job.process_id, 0));
            }
        }
    }

    /// One timer tick: every tracked job gains a second.
    pub fn tick(&mut self) {
        for (_, seconds) in &mut self.elapsed {
            *seconds += 1;
        }
    }

    pub fn elapsed(&self, id: ProcessId) -> Option<u64> {
        self.elapsed
            .iter()
            .find(|(tracked, _)| *tracked == id)
            .map(|(_, seconds)| *seconds)
    }

    pub fn display(&self, id: ProcessId) -> Option<String> {
        self.elapsed(id).map(format_elapsed)
    }

    pub fn remove(&mut self, id: ProcessId) {
        self.elapsed.retain(|(tracked, _)| *tracked != id);
    }
}
