// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use opsdeck_app::{ProcessId, StatusSnapshot, WatchSet};
use opsdeck_client::Client;
use opsdeck_tui::{AppRuntime, InternalEvent};
use std::sync::mpsc::Sender;
use std::thread;

/// Runs dashboard I/O against a real command server. Every request goes
/// out on its own thread so the event loop never blocks on the network;
/// results come back over the loop's internal event channel.
pub struct HttpRuntime {
    client: Client,
}

impl HttpRuntime {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl AppRuntime for HttpRuntime {
    fn load_status(&mut self) -> Result<StatusSnapshot> {
        self.client.fetch_status()
    }

    fn run_command(&mut self, command: &str) -> Result<()> {
        self.client.run_command(command)
    }

    fn close_process(&mut self, id: ProcessId) -> Result<()> {
        self.client.close_process(id)
    }

    fn search(&mut self, query: &str) -> Result<Vec<String>> {
        self.client.search(query)
    }

    fn load_log(&mut self, watch: &WatchSet) -> Result<String> {
        self.client.fetch_log(watch)
    }

    fn spawn_status_poll(&mut self, tx: &Sender<InternalEvent>) {
        let client = self.client.clone();
        let tx = tx.clone();
        thread::spawn(move || {
            let event = match client.fetch_status() {
                Ok(snapshot) => InternalEvent::StatusLoaded(snapshot),
                Err(error) => {
                    tracing::debug!(error = %error, "status poll failed");
                    InternalEvent::PollFailed(error.to_string())
                }
            };
            let _ = tx.send(event);
        });
    }

    fn spawn_log_fetch(&mut self, watch: &WatchSet, tx: &Sender<InternalEvent>) {
        let client = self.client.clone();
        let watch = watch.clone();
        let tx = tx.clone();
        thread::spawn(move || {
            let event = match client.fetch_log(&watch) {
                Ok(text) => InternalEvent::LogLoaded(text),
                Err(error) => {
                    tracing::debug!(error = %error, "log fetch failed");
                    InternalEvent::LogFailed(error.to_string())
                }
            };
            let _ = tx.send(event);
        });
    }

    fn spawn_run_command(&mut self, command: String, tx: &Sender<InternalEvent>) {
        let client = self.client.clone();
        let tx = tx.clone();
        thread::spawn(move || {
            let error = client.run_command(&command).err().map(|e| e.to_string());
            if let Some(message) = &error {
                tracing::warn!(command = %command, error = %message, "run request failed");
            }
            let _ = tx.send(InternalEvent::CommandFinished { command, error });
        });
    }

    fn spawn_close(&mut self, id: ProcessId, tx: &Sender<InternalEvent>) {
        let client = self.client.clone();
        let tx = tx.clone();
        thread::spawn(move || {
            let error = client.close_process(id).err().map(|e| e.to_string());
            if let Some(message) = &error {
                tracing::warn!(process_id = id.get(), error = %message, "close request failed");
            }
            let _ = tx.send(InternalEvent::CloseFinished { id, error });
        });
    }

    fn spawn_search(&mut self, query: String, tx: &Sender<InternalEvent>) {
        let client = self.client.clone();
        let tx = tx.clone();
        thread::spawn(move || match client.search(&query) {
            Ok(values) => {
                let _ = tx.send(InternalEvent::SuggestionsLoaded { query, values });
            }
            // stale or failed suggestions are simply not shown
            Err(error) => tracing::debug!(error = %error, "suggestion lookup failed"),
        });
    }
}
