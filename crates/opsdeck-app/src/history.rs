// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

/// Most-recent-first log of submitted command text. Append-only via prepend,
/// verbatim entries, unbounded, duplicates allowed. Lives only for the
/// session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandHistory {
    entries: Vec<String>,
}

impl CommandHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, command: &str) {
        self.entries.insert(0, command.to_owned());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
