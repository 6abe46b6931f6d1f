// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use opsdeck_app::{
    AppCommand, AppEvent, Cadence, DashboardState, JOB_TIMER_INTERVAL, Job, JobPhase, ProcessId,
    SCROLL_FOLLOW_INTERVAL, STATUS_POLL_INTERVAL, StatusSnapshot, WatchSet,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

const WATCH_MARK: &str = "👁 ";
const PAGE_SCROLL_ROWS: usize = 10;
const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);

/// Messages from background work back into the single-writer loop. All
/// network results arrive here; nothing mutates `DashboardState` off the
/// loop thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    StatusLoaded(StatusSnapshot),
    PollFailed(String),
    LogLoaded(String),
    LogFailed(String),
    CommandFinished {
        command: String,
        error: Option<String>,
    },
    CloseFinished {
        id: ProcessId,
        error: Option<String>,
    },
    SuggestionsLoaded {
        query: String,
        values: Vec<String>,
    },
    ClearStatus {
        token: u64,
    },
}

/// Seam between the dashboard and the command server. The `spawn_*` methods
/// default to running inline and reporting over the channel, which is what
/// tests want; the HTTP runtime overrides them to use worker threads so an
/// in-flight request never blocks a tick. Overlapping requests are allowed
/// by design: the last response to arrive wins.
pub trait AppRuntime {
    fn load_status(&mut self) -> Result<StatusSnapshot>;
    fn run_command(&mut self, command: &str) -> Result<()>;
    fn close_process(&mut self, id: ProcessId) -> Result<()>;
    fn search(&mut self, query: &str) -> Result<Vec<String>>;
    fn load_log(&mut self, watch: &WatchSet) -> Result<String>;

    fn spawn_status_poll(&mut self, tx: &Sender<InternalEvent>) {
        let event = match self.load_status() {
            Ok(snapshot) => InternalEvent::StatusLoaded(snapshot),
            Err(error) => InternalEvent::PollFailed(error.to_string()),
        };
        let _ = tx.send(event);
    }

    fn spawn_log_fetch(&mut self, watch: &WatchSet, tx: &Sender<InternalEvent>) {
        let event = match self.load_log(watch) {
            Ok(text) => InternalEvent::LogLoaded(text),
            Err(error) => InternalEvent::LogFailed(error.to_string()),
        };
        let _ = tx.send(event);
    }

    fn spawn_run_command(&mut self, command: String, tx: &Sender<InternalEvent>) {
        let error = self.run_command(&command).err().map(|e| e.to_string());
        let _ = tx.send(InternalEvent::CommandFinished { command, error });
    }

    fn spawn_close(&mut self, id: ProcessId, tx: &Sender<InternalEvent>) {
        let error = self.close_process(id).err().map(|e| e.to_string());
        let _ = tx.send(InternalEvent::CloseFinished { id, error });
    }

    fn spawn_search(&mut self, query: String, tx: &Sender<InternalEvent>) {
        if let Ok(values) = self.search(&query) {
            let _ = tx.send(InternalEvent::SuggestionsLoaded { query, values });
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Focus {
    #[default]
    Input,
    Jobs,
    History,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct SuggestionUiState {
    visible: bool,
    query: String,
    values: Vec<String>,
    selected: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    focus: Focus,
    job_selection: usize,
    history_selection: usize,
    suggestions: SuggestionUiState,
    last_update: Option<String>,
    failed_polls: u64,
    status_token: u64,
}

/// One selectable row in the jobs pane. Finished jobs render above running
/// ones, matching the server-status layout users know.
#[derive(Debug, Clone, PartialEq, Eq)]
struct JobRow {
    id: ProcessId,
    command: String,
    running: bool,
}

fn job_rows(state: &DashboardState) -> Vec<JobRow> {
    let mut rows: Vec<JobRow> = state
        .snapshot
        .finished
        .iter()
        .map(|job| row_of(job, false))
        .collect();
    rows.extend(state.snapshot.running.iter().map(|job| row_of(job, true)));
    rows
}

fn row_of(job: &Job, running: bool) -> JobRow {
    JobRow {
        id: job.process_id,
        command: job.command.clone(),
        running,
    }
}

pub fn run_app<R: AppRuntime>(state: &mut DashboardState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    // every repeating task lives on this stack frame and dies with it
    let now = Instant::now();
    let mut poll_cadence = Cadence::new(STATUS_POLL_INTERVAL, now);
    let mut timer_cadence = Cadence::new(JOB_TIMER_INTERVAL, now);
    let mut follow_cadence = Cadence::new(SCROLL_FOLLOW_INTERVAL, now);

    // first snapshot and log view without waiting a full interval
    runtime.spawn_status_poll(&internal_tx);
    runtime.spawn_log_fetch(&state.watch, &internal_tx);

    let mut result = Ok(());
    loop {
        process_internal_events(state, runtime, &mut view, &internal_tx, &internal_rx);

        let now = Instant::now();
        if poll_cadence.due(now) {
            runtime.spawn_status_poll(&internal_tx);
        }
        if timer_cadence.due(now) {
            state.dispatch(AppCommand::TimerTick);
        }
        if follow_cadence.due(now) {
            state.viewer.follow_tick();
        }

        let viewer_rows = terminal.size().map(|size| size.height).unwrap_or(0);
        state
            .viewer
            .set_viewport_rows(usize::from(viewer_rows.saturating_sub(6)));

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(50)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(state, runtime, &mut view, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events<R: AppRuntime>(
    state: &mut DashboardState,
    runtime: &mut R,
    view: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::StatusLoaded(snapshot) => {
                let events = state.dispatch(AppCommand::ApplySnapshot(snapshot));
                view.failed_polls = 0;
                view.last_update = Some(clock_stamp());
                apply_app_events(state, runtime, view, tx, events);
            }
            // a failed poll is dropped; the previous snapshot stays up and
            // the status bar shows staleness
            InternalEvent::PollFailed(_) => {
                view.failed_polls = view.failed_polls.saturating_add(1);
            }
            InternalEvent::LogLoaded(text) => {
                state.viewer.set_content(text);
            }
            InternalEvent::LogFailed(_) => {}
            InternalEvent::CommandFinished { command, error } => {
                let events = match error {
                    None => state.dispatch(AppCommand::CommandSent(command)),
                    Some(message) => {
                        state.dispatch(AppCommand::CommandFailed(format!("run failed: {message}")))
                    }
                };
                apply_app_events(state, runtime, view, tx, events);
            }
            InternalEvent::CloseFinished { id, error } => {
                let events = match error {
                    None => state.dispatch(AppCommand::CloseAccepted(id)),
                    Some(_) => state.dispatch(AppCommand::CloseFailed(id)),
                };
                apply_app_events(state, runtime, view, tx, events);
            }
            InternalEvent::SuggestionsLoaded { query, values } => {
                // stale responses for superseded queries are discarded
                if query == state.input && !values.is_empty() {
                    view.suggestions = SuggestionUiState {
                        visible: true,
                        query,
                        values,
                        selected: 0,
                    };
                }
            }
            InternalEvent::ClearStatus { token } if token == view.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
    clamp_selections(state, view);
}

fn apply_app_events<R: AppRuntime>(
    state: &mut DashboardState,
    runtime: &mut R,
    view: &mut ViewData,
    tx: &Sender<InternalEvent>,
    events: Vec<AppEvent>,
) {
    let mut reload_log = false;
    for event in events {
        match event {
            AppEvent::RunRequested(command) => runtime.spawn_run_command(command, tx),
            AppEvent::CloseRequested(id) => runtime.spawn_close(id, tx),
            AppEvent::PollRequested => runtime.spawn_status_poll(tx),
            AppEvent::WatchChanged | AppEvent::SnapshotReplaced => reload_log = true,
            AppEvent::ScrollModeChanged(manual) => {
                let message = if manual {
                    "manual scroll on"
                } else {
                    "manual scroll off"
                };
                emit_status(state, view, tx, message);
            }
            AppEvent::StatusUpdated(_) => {
                view.status_token = view.status_token.saturating_add(1);
                schedule_status_clear(tx, view.status_token);
            }
            AppEvent::StatusCleared => {}
        }
    }
    if reload_log {
        let watch = state.watch.clone();
        runtime.spawn_log_fetch(&watch, tx);
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut DashboardState,
    view: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    let events = state.dispatch(AppCommand::SetStatus(message.into()));
    for event in events {
        if matches!(event, AppEvent::StatusUpdated(_)) {
            view.status_token = view.status_token.saturating_add(1);
            schedule_status_clear(internal_tx, view.status_token);
        }
    }
}

fn clamp_selections(state: &DashboardState, view: &mut ViewData) {
    let rows = job_rows(state).len();
    if rows == 0 {
        view.job_selection = 0;
    } else {
        view.job_selection = view.job_selection.min(rows - 1);
    }
    let history = state.history.len();
    if history == 0 {
        view.history_selection = 0;
    } else {
        view.history_selection = view.history_selection.min(history - 1);
    }
}

fn handle_key_event<R: AppRuntime>(
    state: &mut DashboardState,
    runtime: &mut R,
    view: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view.suggestions.visible && view.focus == Focus::Input {
        handle_suggestion_key(state, view, key);
        return false;
    }

    match view.focus {
        Focus::Input => handle_input_key(state, runtime, view, tx, key),
        Focus::Jobs => handle_jobs_key(state, runtime, view, tx, key),
        Focus::History => handle_history_key(state, runtime, view, tx, key),
    }
    false
}

fn handle_suggestion_key(state: &mut DashboardState, view: &mut ViewData, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => view.suggestions = SuggestionUiState::default(),
        KeyCode::Up => {
            view.suggestions.selected = view.suggestions.selected.saturating_sub(1);
        }
        KeyCode::Down => {
            let last = view.suggestions.values.len().saturating_sub(1);
            view.suggestions.selected = (view.suggestions.selected + 1).min(last);
        }
        KeyCode::Enter => {
            if let Some(value) = view.suggestions.values.get(view.suggestions.selected) {
                state.dispatch(AppCommand::SetInput(value.clone()));
            }
            view.suggestions = SuggestionUiState::default();
        }
        KeyCode::Char(c) => {
            view.suggestions = SuggestionUiState::default();
            let mut input = state.input.clone();
            input.push(c);
            state.dispatch(AppCommand::SetInput(input));
        }
        KeyCode::Backspace => {
            view.suggestions = SuggestionUiState::default();
            let mut input = state.input.clone();
            input.pop();
            state.dispatch(AppCommand::SetInput(input));
        }
        _ => {}
    }
}

fn handle_input_key<R: AppRuntime>(
    state: &mut DashboardState,
    runtime: &mut R,
    view: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            let mut input = state.input.clone();
            input.push(c);
            state.dispatch(AppCommand::SetInput(input));
        }
        KeyCode::Backspace => {
            let mut input = state.input.clone();
            input.pop();
            state.dispatch(AppCommand::SetInput(input));
        }
        KeyCode::Enter => {
            let events = state.dispatch(AppCommand::SubmitInput);
            apply_app_events(state, runtime, view, tx, events);
        }
        KeyCode::Tab => {
            if !state.input.is_empty() {
                runtime.spawn_search(state.input.clone(), tx);
            }
        }
        KeyCode::Esc => view.focus = Focus::Jobs,
        _ => {}
    }
}

fn handle_jobs_key<R: AppRuntime>(
    state: &mut DashboardState,
    runtime: &mut R,
    view: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let rows = job_rows(state);
    match key.code {
        KeyCode::Up => view.job_selection = view.job_selection.saturating_sub(1),
        KeyCode::Down => {
            let last = rows.len().saturating_sub(1);
            view.job_selection = (view.job_selection + 1).min(last);
        }
        KeyCode::Enter | KeyCode::Char(' ') => {
            if let Some(row) = rows.get(view.job_selection) {
                let events = state.dispatch(AppCommand::ToggleWatch(row.id));
                apply_app_events(state, runtime, view, tx, events);
            }
        }
        KeyCode::Char('x') => {
            if let Some(row) = rows.get(view.job_selection) {
                let events = state.dispatch(AppCommand::CloseJob(row.id));
                apply_app_events(state, runtime, view, tx, events);
            }
        }
        KeyCode::Char('m') => {
            let events = state.dispatch(AppCommand::ToggleManualScroll);
            apply_app_events(state, runtime, view, tx, events);
        }
        KeyCode::PageUp => state.viewer.scroll_up(PAGE_SCROLL_ROWS),
        KeyCode::PageDown => state.viewer.scroll_down(PAGE_SCROLL_ROWS),
        KeyCode::Esc => view.focus = Focus::History,
        _ => {}
    }
}

fn handle_history_key<R: AppRuntime>(
    state: &mut DashboardState,
    runtime: &mut R,
    view: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Up => view.history_selection = view.history_selection.saturating_sub(1),
        KeyCode::Down => {
            let last = state.history.len().saturating_sub(1);
            view.history_selection = (view.history_selection + 1).min(last);
        }
        KeyCode::Enter => {
            let events = state.dispatch(AppCommand::ResubmitHistory(view.history_selection));
            apply_app_events(state, runtime, view, tx, events);
        }
        KeyCode::Esc => view.focus = Focus::Input,
        _ => {}
    }
}

fn clock_stamp() -> String {
    let format = time::macros::format_description!("[hour]:[minute]:[second]");
    time::OffsetDateTime::now_utc()
        .time()
        .format(&format)
        .unwrap_or_else(|_| "--:--:--".to_owned())
}

fn render(frame: &mut ratatui::Frame<'_>, state: &DashboardState, view: &ViewData) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_input(frame, state, view, outer[0]);
    render_main(frame, state, view, outer[1]);
    render_status_bar(frame, state, view, outer[2]);

    if view.suggestions.visible {
        render_suggestions(frame, view, outer[0]);
    }
}

fn render_input(frame: &mut ratatui::Frame<'_>, state: &DashboardState, view: &ViewData, area: Rect) {
    let style = if view.focus == Focus::Input {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let input = Paragraph::new(state.input.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(style)
            .title("command (Enter run, Tab suggest)"),
    );
    frame.render_widget(input, area);
}

fn render_main(frame: &mut ratatui::Frame<'_>, state: &DashboardState, view: &ViewData, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);

    render_viewer(frame, state, columns[0]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(columns[1]);
    render_jobs(frame, state, view, side[0]);
    render_history(frame, state, view, side[1]);
}

fn render_viewer(frame: &mut ratatui::Frame<'_>, state: &DashboardState, area: Rect) {
    let title = format!("output {}", opsdeck_app::log_path(&state.watch));
    let viewer = Paragraph::new(state.viewer.content())
        .block(Block::default().borders(Borders::ALL).title(title))
        .scroll((state.viewer.scroll() as u16, 0));
    frame.render_widget(viewer, area);
}

fn render_jobs(frame: &mut ratatui::Frame<'_>, state: &DashboardState, view: &ViewData, area: Rect) {
    let rows = job_rows(state);
    let items: Vec<ListItem<'_>> = rows
        .iter()
        .enumerate()
        .map(|(index, row)| job_list_item(state, view, index, row))
        .collect();

    let style = if view.focus == Focus::Jobs {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(style)
            .title("jobs (Enter watch, x close, m scroll mode)"),
    );
    frame.render_widget(list, area);
}

fn job_list_item<'a>(
    state: &'a DashboardState,
    view: &ViewData,
    index: usize,
    row: &JobRow,
) -> ListItem<'a> {
    let mut style = if row.running {
        Style::default()
    } else {
        Style::default().fg(Color::DarkGray)
    };
    if state.job_phase(row.id) == JobPhase::ClosingPending {
        style = style.add_modifier(Modifier::CROSSED_OUT);
    }
    if view.focus == Focus::Jobs && index == view.job_selection {
        style = style.add_modifier(Modifier::REVERSED);
    }

    let timer = state
        .timers
        .display(row.id)
        .map(|elapsed| format!("{elapsed} "))
        .unwrap_or_default();
    let watched = if state.watch.contains(row.id) {
        WATCH_MARK
    } else {
        ""
    };
    let line = Line::from(vec![
        Span::styled(format!("{timer}{watched}"), Style::default().fg(Color::Cyan)),
        Span::raw(row.command.clone()),
    ]);
    ListItem::new(line).style(style)
}

fn render_history(
    frame: &mut ratatui::Frame<'_>,
    state: &DashboardState,
    view: &ViewData,
    area: Rect,
) {
    let items: Vec<ListItem<'_>> = state
        .history
        .entries()
        .iter()
        .enumerate()
        .map(|(index, command)| {
            let mut style = Style::default();
            if view.focus == Focus::History && index == view.history_selection {
                style = style.add_modifier(Modifier::REVERSED);
            }
            ListItem::new(command.as_str()).style(style)
        })
        .collect();

    let style = if view.focus == Focus::History {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(style)
            .title("history (Enter re-run)"),
    );
    frame.render_widget(list, area);
}

fn render_status_bar(
    frame: &mut ratatui::Frame<'_>,
    state: &DashboardState,
    view: &ViewData,
    area: Rect,
) {
    let mut spans = vec![Span::raw(if state.viewer.manual_scroll() {
        "manual scroll"
    } else {
        "follow"
    })];
    if let Some(stamp) = &view.last_update {
        spans.push(Span::raw(format!("  updated {stamp}")));
    }
    if view.failed_polls > 0 {
        spans.push(Span::styled(
            format!("  stale ({} failed polls)", view.failed_polls),
            Style::default().fg(Color::Red),
        ));
    }
    if let Some(message) = &state.status_line {
        spans.push(Span::styled(
            format!("  {message}"),
            Style::default().fg(Color::Yellow),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_suggestions(frame: &mut ratatui::Frame<'_>, view: &ViewData, input_area: Rect) {
    let height = (view.suggestions.values.len() as u16 + 2).min(8);
    let area = Rect {
        x: input_area.x + 1,
        y: input_area.y + input_area.height,
        width: input_area.width.saturating_sub(2),
        height,
    };
    let items: Vec<ListItem<'_>> = view
        .suggestions
        .values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let mut style = Style::default();
            if index == view.suggestions.selected {
                style = style.add_modifier(Modifier::REVERSED);
            }
            ListItem::new(value.as_str()).style(style)
        })
        .collect();
    frame.render_widget(Clear, area);
    frame.render_widget(
        List::new(items).block(Block::default().borders(Borders::ALL).title("suggestions")),
        area,
    );
}
