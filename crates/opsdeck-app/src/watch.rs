// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{ProcessId, StatusSnapshot};

/// Client-side intent to view job output. Ordered, duplicate-free, and not
/// authoritative: entries may outlive the jobs they reference.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WatchSet {
    ids: Vec<ProcessId>,
}

impl WatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[ProcessId] {
        &self.ids
    }

    pub fn contains(&self, id: ProcessId) -> bool {
        self.ids.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Append `id` unless already watched. Returns whether the set changed.
    pub fn start_watch(&mut self, id: ProcessId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Remove every occurrence of `id`, preserving the relative order of the
    /// remaining entries. Unwatching an absent id is a no-op.
    pub fn unwatch(&mut self, id: ProcessId) -> bool {
        let before = self.ids.len();
        self.ids.retain(|watched| *watched != id);
        self.ids.len() != before
    }

    pub fn toggle(&mut self, id: ProcessId) -> bool {
        if self.contains(id) {
            self.unwatch(id)
        } else {
            self.start_watch(id)
        }
    }

    /// Adopt a caller-computed set wholesale, deduplicating by first
    /// occurrence. Returns whether the resulting set differs from the old one.
    pub fn replace(&mut self, ids: Vec<ProcessId>) -> bool {
        let mut deduped = Vec::with_capacity(ids.len());
        for id in ids {
            if !deduped.contains(&id) {
                deduped.push(id);
            }
        }
        if deduped == self.ids {
            return false;
        }
        self.ids = deduped;
        true
    }

    /// Drop watches for ids the snapshot no longer reports. Returns whether
    /// anything was pruned.
    pub fn retain_reported(&mut self, snapshot: &StatusSnapshot) -> bool {
        let before = self.ids.len();
        self.ids.retain(|id| snapshot.reports(*id));
        self.ids.len() != before
    }

    /// Comma-joined ids in insertion order, as the log endpoint expects.
    /// Empty set yields an empty list (the server decides what that means).
    pub fn log_query(&self) -> String {
        let rendered: Vec<String> = self.ids.iter().map(ProcessId::to_string).collect();
        rendered.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::WatchSet;
    use crate::{Job, ProcessId, StatusSnapshot};

    fn id(value: i64) -> ProcessId {
        ProcessId::new(value)
    }

    #[test]
    fn start_watch_appends_and_dedupes() {
        let mut watch = WatchSet::new();
        assert!(watch.start_watch(id(3)));
        assert!(watch.start_watch(id(7)));
        assert!(!watch.start_watch(id(3)));
        assert_eq!(watch.ids(), &[id(3), id(7)]);
    }

    #[test]
    fn unwatch_removes_in_place_and_preserves_order() {
        let mut watch = WatchSet::new();
        watch.start_watch(id(1));
        watch.start_watch(id(2));
        watch.start_watch(id(3));
        assert!(watch.unwatch(id(2)));
        assert_eq!(watch.ids(), &[id(1), id(3)]);
    }

    #[test]
    fn unwatch_absent_id_is_a_noop() {
        let mut watch = WatchSet::new();
        watch.start_watch(id(1));
        assert!(!watch.unwatch(id(9)));
        assert_eq!(watch.ids(), &[id(1)]);
    }

    #[test]
    fn arbitrary_sequences_stay_duplicate_free() {
        let mut watch = WatchSet::new();
        let ops: &[(bool, i64)] = &[
            (true, 5),
            (true, 2),
            (true, 5),
            (false, 2),
            (true, 8),
            (true, 2),
            (false, 99),
            (true, 5),
        ];
        for &(add, value) in ops {
            if add {
                watch.start_watch(id(value));
            } else {
                watch.unwatch(id(value));
            }
        }
        let mut seen = Vec::new();
        for watched in watch.ids() {
            assert!(!seen.contains(watched), "duplicate {watched}");
            seen.push(*watched);
        }
        assert_eq!(watch.ids(), &[id(5), id(8), id(2)]);
    }

    #[test]
    fn replace_dedupes_by_first_occurrence() {
        let mut watch = WatchSet::new();
        assert!(watch.replace(vec![id(4), id(1), id(4), id(1)]));
        assert_eq!(watch.ids(), &[id(4), id(1)]);
        assert!(!watch.replace(vec![id(4), id(1)]));
    }

    #[test]
    fn retain_reported_drops_vanished_ids() {
        let mut watch = WatchSet::new();
        watch.start_watch(id(1));
        watch.start_watch(id(2));
        let snapshot = StatusSnapshot {
            running: vec![],
            finished: vec![Job::new(2, "ls")],
        };
        assert!(watch.retain_reported(&snapshot));
        assert_eq!(watch.ids(), &[id(2)]);
    }

    #[test]
    fn log_query_joins_in_insertion_order() {
        let mut watch = WatchSet::new();
        watch.start_watch(id(3));
        watch.start_watch(id(7));
        assert_eq!(watch.log_query(), "3,7");
        assert_eq!(WatchSet::new().log_query(), "");
    }
}
