// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{CommandHistory, JobPhase, JobTimers, OutputViewer, ProcessId, StatusSnapshot, WatchSet};

/// What to do with watches whose jobs the server no longer reports.
/// `Retain` matches the historical behavior (keep showing a just-finished
/// job's tail); `Prune` drops them on the next snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StalePolicy {
    #[default]
    Retain,
    Prune,
}

/// Single source of truth for the dashboard. Only the run loop dispatches
/// into it; UI children and background threads never mutate it directly.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardState {
    pub snapshot: StatusSnapshot,
    pub watch: WatchSet,
    pub timers: JobTimers,
    pub history: CommandHistory,
    pub viewer: OutputViewer,
    pub input: String,
    pub status_line: Option<String>,
    stale_policy: StalePolicy,
    closing: Vec<ProcessId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Authoritative poll result; replaces the previous snapshot wholesale.
    ApplySnapshot(StatusSnapshot),
    StartWatch(ProcessId),
    Unwatch(ProcessId),
    ToggleWatch(ProcessId),
    /// Adopt a caller-computed watch set as the new source of truth.
    AdoptWatches(Vec<ProcessId>),
    SetInput(String),
    /// Submit the current input as a command.
    SubmitInput,
    /// Re-run a history entry verbatim.
    ResubmitHistory(usize),
    /// The run request was accepted by the server.
    CommandSent(String),
    CommandFailed(String),
    CloseJob(ProcessId),
    /// The close request was accepted; drop the job locally ahead of the
    /// next poll.
    CloseAccepted(ProcessId),
    CloseFailed(ProcessId),
    TimerTick,
    ToggleManualScroll,
    SetStatus(String),
    ClearStatus,
}

/// Effects for the run loop to interpret. The state machine itself performs
/// no I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    SnapshotReplaced,
    /// The watch set changed; the viewer address must be re-resolved and the
    /// log view fully reloaded.
    WatchChanged,
    RunRequested(String),
    CloseRequested(ProcessId),
    /// Fetch status now, out of band of the periodic poll.
    PollRequested,
    ScrollModeChanged(bool),
    StatusUpdated(String),
    StatusCleared,
}

impl DashboardState {
    pub fn new(stale_policy: StalePolicy) -> Self {
        Self {
            stale_policy,
            ..Self::default()
        }
    }

    pub fn stale_policy(&self) -> StalePolicy {
        self.stale_policy
    }

    /// Close lifecycle as the UI should render it. Ids the client already
    /// dropped are simply absent from the snapshot, so `Closed` never
    /// surfaces here.
    pub fn job_phase(&self, id: ProcessId) -> JobPhase {
        if self.closing.contains(&id) {
            JobPhase::ClosingPending
        } else {
            JobPhase::Active
        }
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::ApplySnapshot(snapshot) => self.apply_snapshot(snapshot),
            AppCommand::StartWatch(id) => {
                if self.watch.start_watch(id) {
                    vec![AppEvent::WatchChanged]
                } else {
                    vec![]
                }
            }
            AppCommand::Unwatch(id) => {
                if self.watch.unwatch(id) {
                    vec![AppEvent::WatchChanged]
                } else {
                    vec![]
                }
            }
            AppCommand::ToggleWatch(id) => {
                if self.watch.toggle(id) {
                    vec![AppEvent::WatchChanged]
                } else {
                    vec![]
                }
            }
            AppCommand::AdoptWatches(ids) => {
                if self.watch.replace(ids) {
                    vec![AppEvent::WatchChanged]
                } else {
                    vec![]
                }
            }
            AppCommand::SetInput(text) => {
                self.input = text;
                vec![]
            }
            AppCommand::SubmitInput => {
                if self.input.is_empty() {
                    return vec![];
                }
                vec![AppEvent::RunRequested(self.input.clone())]
            }
            AppCommand::ResubmitHistory(index) => match self.history.get(index) {
                Some(command) => vec![AppEvent::RunRequested(command.to_owned())],
                None => vec![],
            },
            AppCommand::CommandSent(command) => {
                self.history.record(&command);
                if self.input == command {
                    self.input.clear();
                }
                vec![AppEvent::PollRequested]
            }
            AppCommand::CommandFailed(message) => vec![self.set_status(&message)],
            AppCommand::CloseJob(id) => {
                if self.closing.contains(&id) {
                    return vec![];
                }
                self.closing.push(id);
                vec![AppEvent::CloseRequested(id)]
            }
            AppCommand::CloseAccepted(id) => {
                self.closing.retain(|pending| *pending != id);
                self.snapshot.running.retain(|job| job.process_id != id);
                self.snapshot.finished.retain(|job| job.process_id != id);
                self.timers.remove(id);
                vec![AppEvent::PollRequested]
            }
            AppCommand::CloseFailed(id) => {
                self.closing.retain(|pending| *pending != id);
                vec![self.set_status(&format!("close failed for process {id}"))]
            }
            AppCommand::TimerTick => {
                self.timers.tick();
                vec![]
            }
            AppCommand::ToggleManualScroll => {
                let manual = self.viewer.toggle_manual_scroll();
                vec![AppEvent::ScrollModeChanged(manual)]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn apply_snapshot(&mut self, snapshot: StatusSnapshot) -> Vec<AppEvent> {
        self.timers.sync(&snapshot.running);
        self.closing.retain(|id| snapshot.reports(*id));

        let mut events = vec![AppEvent::SnapshotReplaced];
        if self.stale_policy == StalePolicy::Prune && self.watch.retain_reported(&snapshot) {
            events.push(AppEvent::WatchChanged);
        }
        self.snapshot = snapshot;
        events
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::{AppCommand, AppEvent, DashboardState, StalePolicy};
    use crate::{Job, JobPhase, ProcessId, StatusSnapshot};

    fn id(value: i64) -> ProcessId {
        ProcessId::new(value)
    }

    fn running(jobs: &[(i64, &str)]) -> StatusSnapshot {
        StatusSnapshot {
            running: jobs
                .iter()
                .map(|(pid, command)| Job::new(*pid, *command))
                .collect(),
            finished: vec![],
        }
    }

    #[test]
    fn snapshot_replaces_prior_state_wholesale() {
        let mut state = DashboardState::default();
        state.dispatch(AppCommand::ApplySnapshot(running(&[(1, "ls"), (2, "pwd")])));
        let events = state.dispatch(AppCommand::ApplySnapshot(running(&[(3, "make")])));
        assert_eq!(events, vec![AppEvent::SnapshotReplaced]);
        assert_eq!(state.snapshot.running, vec![Job::new(3, "make")]);
        assert!(state.snapshot.finished.is_empty());
    }

    #[test]
    fn stale_watch_is_retained_after_job_finishes() {
        let mut state = DashboardState::new(StalePolicy::Retain);
        state.dispatch(AppCommand::ApplySnapshot(running(&[(1, "ls")])));
        state.dispatch(AppCommand::StartWatch(id(1)));

        // job moves from running to finished; the watch must survive until
        // an explicit unwatch
        state.dispatch(AppCommand::ApplySnapshot(StatusSnapshot {
            running: vec![],
            finished: vec![Job::new(1, "ls")],
        }));
        assert_eq!(state.watch.ids(), &[id(1)]);

        // even fully vanished ids stay watched under Retain
        state.dispatch(AppCommand::ApplySnapshot(StatusSnapshot::default()));
        assert_eq!(state.watch.ids(), &[id(1)]);

        let events = state.dispatch(AppCommand::Unwatch(id(1)));
        assert_eq!(events, vec![AppEvent::WatchChanged]);
        assert!(state.watch.is_empty());
    }

    #[test]
    fn prune_policy_drops_vanished_watches_on_snapshot() {
        let mut state = DashboardState::new(StalePolicy::Prune);
        state.dispatch(AppCommand::ApplySnapshot(running(&[(1, "ls")])));
        state.dispatch(AppCommand::StartWatch(id(1)));

        let events = state.dispatch(AppCommand::ApplySnapshot(StatusSnapshot::default()));
        assert_eq!(
            events,
            vec![AppEvent::SnapshotReplaced, AppEvent::WatchChanged]
        );
        assert!(state.watch.is_empty());
    }

    #[test]
    fn submit_then_sent_records_history_clears_input_and_repolls() {
        let mut state = DashboardState::default();
        state.dispatch(AppCommand::SetInput("echo hi".to_owned()));

        let events = state.dispatch(AppCommand::SubmitInput);
        assert_eq!(events, vec![AppEvent::RunRequested("echo hi".to_owned())]);
        // nothing recorded until the server accepts the run
        assert!(state.history.is_empty());
        assert_eq!(state.input, "echo hi");

        let events = state.dispatch(AppCommand::CommandSent("echo hi".to_owned()));
        assert_eq!(events, vec![AppEvent::PollRequested]);
        assert_eq!(state.history.entries(), &["echo hi".to_owned()]);
        assert!(state.input.is_empty());
    }

    #[test]
    fn failed_submit_leaves_history_and_input_untouched() {
        let mut state = DashboardState::default();
        state.dispatch(AppCommand::SetInput("echo hi".to_owned()));
        state.dispatch(AppCommand::SubmitInput);

        let events = state.dispatch(AppCommand::CommandFailed("run failed: refused".to_owned()));
        assert_eq!(
            events,
            vec![AppEvent::StatusUpdated("run failed: refused".to_owned())]
        );
        assert!(state.history.is_empty());
        assert_eq!(state.input, "echo hi");
    }

    #[test]
    fn empty_input_submit_is_a_noop() {
        let mut state = DashboardState::default();
        assert!(state.dispatch(AppCommand::SubmitInput).is_empty());
    }

    #[test]
    fn history_resubmit_sends_exact_text() {
        let mut state = DashboardState::default();
        state.dispatch(AppCommand::CommandSent("deploy:staging".to_owned()));
        state.dispatch(AppCommand::CommandSent("ls".to_owned()));

        let events = state.dispatch(AppCommand::ResubmitHistory(1));
        assert_eq!(
            events,
            vec![AppEvent::RunRequested("deploy:staging".to_owned())]
        );
        assert!(state.dispatch(AppCommand::ResubmitHistory(9)).is_empty());
    }

    #[test]
    fn input_edited_after_submit_is_not_clobbered_by_sent() {
        let mut state = DashboardState::default();
        state.dispatch(AppCommand::SetInput("ls".to_owned()));
        state.dispatch(AppCommand::SubmitInput);
        state.dispatch(AppCommand::SetInput("ls -la".to_owned()));

        state.dispatch(AppCommand::CommandSent("ls".to_owned()));
        assert_eq!(state.input, "ls -la");
        assert_eq!(state.history.entries(), &["ls".to_owned()]);
    }

    #[test]
    fn close_marks_pending_then_removes_optimistically_on_accept() {
        let mut state = DashboardState::default();
        state.dispatch(AppCommand::ApplySnapshot(running(&[(4, "tail -f x")])));

        let events = state.dispatch(AppCommand::CloseJob(id(4)));
        assert_eq!(events, vec![AppEvent::CloseRequested(id(4))]);
        assert_eq!(state.job_phase(id(4)), JobPhase::ClosingPending);
        // re-clicking while pending does not send a second request
        assert!(state.dispatch(AppCommand::CloseJob(id(4))).is_empty());

        let events = state.dispatch(AppCommand::CloseAccepted(id(4)));
        assert_eq!(events, vec![AppEvent::PollRequested]);
        assert!(state.snapshot.running.is_empty());
        assert_eq!(state.job_phase(id(4)), JobPhase::Active);
    }

    #[test]
    fn close_failure_rolls_back_to_active() {
        let mut state = DashboardState::default();
        state.dispatch(AppCommand::ApplySnapshot(running(&[(4, "tail -f x")])));
        state.dispatch(AppCommand::CloseJob(id(4)));

        let events = state.dispatch(AppCommand::CloseFailed(id(4)));
        assert_eq!(state.job_phase(id(4)), JobPhase::Active);
        assert_eq!(state.snapshot.running.len(), 1);
        assert!(matches!(events.as_slice(), [AppEvent::StatusUpdated(_)]));
        // a new close attempt is allowed again
        assert_eq!(
            state.dispatch(AppCommand::CloseJob(id(4))),
            vec![AppEvent::CloseRequested(id(4))]
        );
    }

    #[test]
    fn adopt_watches_dedupes_before_adoption() {
        let mut state = DashboardState::default();
        let events = state.dispatch(AppCommand::AdoptWatches(vec![id(3), id(7), id(3)]));
        assert_eq!(events, vec![AppEvent::WatchChanged]);
        assert_eq!(state.watch.ids(), &[id(3), id(7)]);

        // adopting the same set again is a no-op
        assert!(
            state
                .dispatch(AppCommand::AdoptWatches(vec![id(3), id(7)]))
                .is_empty()
        );
    }

    #[test]
    fn timer_tick_advances_running_jobs_only() {
        let mut state = DashboardState::default();
        state.dispatch(AppCommand::ApplySnapshot(StatusSnapshot {
            running: vec![Job::new(1, "sleep 99")],
            finished: vec![Job::new(2, "ls")],
        }));
        state.dispatch(AppCommand::TimerTick);
        state.dispatch(AppCommand::TimerTick);
        assert_eq!(state.timers.display(id(1)).as_deref(), Some("2s"));
        assert_eq!(state.timers.display(id(2)), None);
    }

    #[test]
    fn toggle_manual_scroll_reports_new_mode() {
        let mut state = DashboardState::default();
        assert_eq!(
            state.dispatch(AppCommand::ToggleManualScroll),
            vec![AppEvent::ScrollModeChanged(true)]
        );
        assert_eq!(
            state.dispatch(AppCommand::ToggleManualScroll),
            vec![AppEvent::ScrollModeChanged(false)]
        );
    }

    #[test]
    fn closing_mark_survives_snapshots_that_still_report_the_job() {
        let mut state = DashboardState::default();
        state.dispatch(AppCommand::ApplySnapshot(running(&[(4, "x")])));
        state.dispatch(AppCommand::CloseJob(id(4)));

        state.dispatch(AppCommand::ApplySnapshot(running(&[(4, "x")])));
        assert_eq!(state.job_phase(id(4)), JobPhase::ClosingPending);

        // server stopped reporting it; the pending mark is dropped
        state.dispatch(AppCommand::ApplySnapshot(StatusSnapshot::default()));
        assert_eq!(state.job_phase(id(4)), JobPhase::Active);
    }
}
