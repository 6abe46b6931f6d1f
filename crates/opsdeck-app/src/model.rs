// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned process identifier, unique while the process is tracked.
/// Opaque to the client beyond equality and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessId(i64);

impl ProcessId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for ProcessId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub process_id: ProcessId,
    pub command: String,
}

impl Job {
    pub fn new(process_id: impl Into<ProcessId>, command: impl Into<String>) -> Self {
        Self {
            process_id: process_id.into(),
            command: command.into(),
        }
    }
}

/// One authoritative status poll result. Replaced wholesale on every tick;
/// never merged with a prior snapshot.
///
/// Wire field names follow the server's status handler.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(rename = "running_process_ids", default)]
    pub running: Vec<Job>,
    #[serde(rename = "finished_jobs", default)]
    pub finished: Vec<Job>,
}

impl StatusSnapshot {
    pub fn is_running(&self, id: ProcessId) -> bool {
        self.running.iter().any(|job| job.process_id == id)
    }

    pub fn is_finished(&self, id: ProcessId) -> bool {
        self.finished.iter().any(|job| job.process_id == id)
    }

    /// Whether the server reports the id at all, running or finished.
    pub fn reports(&self, id: ProcessId) -> bool {
        self.is_running(id) || self.is_finished(id)
    }
}

/// Close lifecycle of a job as the client sees it. `ClosingPending` is set
/// optimistically at request time and rolls back to `Active` if the close
/// request fails; `Closed` jobs are gone from all local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Active,
    ClosingPending,
    Closed,
}
