// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::WatchSet;

/// Log-stream address for the current watch set: comma-joined ids in
/// insertion order on the fixed log path. An empty watch set yields an empty
/// id list; the server treats that as "all processes".
pub fn log_path(watch: &WatchSet) -> String {
    format!("/log?process_id={}", watch.log_query())
}

/// Scroll state for the output pane. Content is replaced wholesale on every
/// refresh; there is no incremental append. `manual_scroll` is global, not
/// per job: while it is off, every follow tick forces the offset to the
/// bottom; while it is on, the offset is frozen no matter how much content
/// arrives.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutputViewer {
    content: String,
    scroll: usize,
    viewport_rows: usize,
    manual_scroll: bool,
}

impl OutputViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: String) {
        self.content = content;
        self.clamp();
    }

    pub fn line_count(&self) -> usize {
        if self.content.is_empty() {
            0
        } else {
            self.content.lines().count()
        }
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn manual_scroll(&self) -> bool {
        self.manual_scroll
    }

    pub fn toggle_manual_scroll(&mut self) -> bool {
        self.manual_scroll = !self.manual_scroll;
        self.manual_scroll
    }

    /// Rows the terminal currently gives the pane; needed to compute the
    /// bottom offset.
    pub fn set_viewport_rows(&mut self, rows: usize) {
        self.viewport_rows = rows;
        self.clamp();
    }

    pub fn max_scroll(&self) -> usize {
        self.line_count().saturating_sub(self.viewport_rows.max(1))
    }

    /// One follow tick. Forces the view to the bottom unless the user froze
    /// it with manual scroll.
    pub fn follow_tick(&mut self) {
        if !self.manual_scroll {
            self.scroll = self.max_scroll();
        }
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll = (self.scroll + lines).min(self.max_scroll());
    }

    fn clamp(&mut self) {
        self.scroll = self.scroll.min(self.max_scroll());
    }
}

#[cfg(test)]
mod tests {
    use super::{OutputViewer, log_path};
    use crate::{ProcessId, WatchSet};

    fn grown_content(lines: usize) -> String {
        (0..lines).map(|n| format!("line {n}\n")).collect()
    }

    #[test]
    fn log_path_joins_watched_ids_in_insertion_order() {
        let mut watch = WatchSet::new();
        watch.start_watch(ProcessId::new(3));
        watch.start_watch(ProcessId::new(7));
        assert_eq!(log_path(&watch), "/log?process_id=3,7");
    }

    #[test]
    fn log_path_for_empty_watch_set_has_empty_id_list() {
        assert_eq!(log_path(&WatchSet::new()), "/log?process_id=");
    }

    #[test]
    fn follow_tick_forces_bottom_while_automatic() {
        let mut viewer = OutputViewer::new();
        viewer.set_viewport_rows(10);
        viewer.set_content(grown_content(30));
        viewer.follow_tick();
        assert_eq!(viewer.scroll(), 20);

        viewer.set_content(grown_content(50));
        viewer.follow_tick();
        assert_eq!(viewer.scroll(), 40);
    }

    #[test]
    fn manual_scroll_freezes_position_across_content_growth() {
        let mut viewer = OutputViewer::new();
        viewer.set_viewport_rows(10);
        viewer.set_content(grown_content(30));
        viewer.follow_tick();
        assert_eq!(viewer.scroll(), 20);

        viewer.toggle_manual_scroll();
        viewer.set_content(grown_content(100));
        viewer.follow_tick();
        viewer.follow_tick();
        assert_eq!(viewer.scroll(), 20);

        // toggling back resumes forcing bottom on the next tick
        viewer.toggle_manual_scroll();
        viewer.follow_tick();
        assert_eq!(viewer.scroll(), 90);
    }

    #[test]
    fn manual_scroll_keys_stay_within_bounds() {
        let mut viewer = OutputViewer::new();
        viewer.set_viewport_rows(10);
        viewer.set_content(grown_content(25));
        viewer.toggle_manual_scroll();
        viewer.scroll_down(100);
        assert_eq!(viewer.scroll(), 15);
        viewer.scroll_up(7);
        assert_eq!(viewer.scroll(), 8);
        viewer.scroll_up(100);
        assert_eq!(viewer.scroll(), 0);
    }

    #[test]
    fn shrinking_content_clamps_the_offset() {
        let mut viewer = OutputViewer::new();
        viewer.set_viewport_rows(5);
        viewer.set_content(grown_content(40));
        viewer.follow_tick();
        viewer.set_content(grown_content(6));
        assert_eq!(viewer.scroll(), 1);
    }
}
