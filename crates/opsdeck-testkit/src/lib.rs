// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Scripted stand-in for the command server, for exercising the client and
//! runtime without a real process executor behind them.

use anyhow::{Context, Result, anyhow};
use opsdeck_app::StatusSnapshot;
use std::collections::VecDeque;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Response, Server};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub body: String,
}

#[derive(Debug, Default)]
struct Script {
    queued_status: VecDeque<String>,
    current_status: String,
    log_body: String,
    suggestions: Vec<String>,
    fail_next_run: bool,
    fail_next_close: bool,
    requests: Vec<RecordedRequest>,
}

/// A tiny_http server speaking the command server's wire protocol. Status
/// responses are scripted: each enqueued snapshot is served once, then the
/// last one repeats, which mimics a server whose state settles between
/// polls.
pub struct MockCommandServer {
    base_url: String,
    script: Arc<Mutex<Script>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl MockCommandServer {
    pub fn start() -> Result<Self> {
        let server = Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let base_url = format!("http://{}", server.server_addr());

        let script = Arc::new(Mutex::new(Script {
            current_status: serde_json::to_string(&StatusSnapshot::default())
                .context("encode empty snapshot")?,
            ..Script::default()
        }));
        let running = Arc::new(AtomicBool::new(true));

        let thread_script = Arc::clone(&script);
        let thread_running = Arc::clone(&running);
        let handle = thread::spawn(move || {
            while thread_running.load(Ordering::SeqCst) {
                let request = match server.recv_timeout(Duration::from_millis(25)) {
                    Ok(Some(request)) => request,
                    Ok(None) => continue,
                    Err(_) => break,
                };
                serve(&thread_script, request);
            }
        });

        Ok(Self {
            base_url,
            script,
            running,
            handle: Some(handle),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Queue a status snapshot; served once, after which the most recently
    /// served snapshot repeats.
    pub fn enqueue_status(&self, snapshot: &StatusSnapshot) -> Result<()> {
        let body = serde_json::to_string(snapshot).context("encode snapshot")?;
        self.lock().queued_status.push_back(body);
        Ok(())
    }

    pub fn set_log(&self, text: &str) {
        self.lock().log_body = text.to_owned();
    }

    pub fn set_suggestions(&self, values: &[&str]) {
        self.lock().suggestions = values.iter().map(|value| (*value).to_owned()).collect();
    }

    pub fn fail_next_run(&self) {
        self.lock().fail_next_run = true;
    }

    pub fn fail_next_close(&self) {
        self.lock().fail_next_close = true;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    pub fn requests_for(&self, path: &str) -> Vec<RecordedRequest> {
        self.lock()
            .requests
            .iter()
            .filter(|request| {
                request.url == path || request.url.starts_with(&format!("{path}?"))
            })
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        match self.script.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for MockCommandServer {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve(script: &Arc<Mutex<Script>>, mut request: tiny_http::Request) {
    let method = request.method().to_string();
    let url = request.url().to_owned();
    let mut body = String::new();
    let _ = request.as_reader().read_to_string(&mut body);

    let mut guard = match script.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    guard.requests.push(RecordedRequest {
        method,
        url: url.clone(),
        body,
    });

    let path = url.split('?').next().unwrap_or("");
    let response = match path {
        "/status" => {
            if let Some(next) = guard.queued_status.pop_front() {
                guard.current_status = next;
            }
            json_response(&guard.current_status, 200)
        }
        "/run" => {
            if std::mem::take(&mut guard.fail_next_run) {
                Response::from_string("command center unavailable").with_status_code(500)
            } else {
                Response::from_string("").with_status_code(200)
            }
        }
        "/close-process" => {
            if std::mem::take(&mut guard.fail_next_close) {
                Response::from_string("no such process").with_status_code(500)
            } else {
                Response::from_string("").with_status_code(200)
            }
        }
        "/search" => {
            let suggestions: Vec<serde_json::Value> = guard
                .suggestions
                .iter()
                .map(|value| serde_json::json!({ "value": value }))
                .collect();
            let body = serde_json::json!({ "suggestions": suggestions }).to_string();
            json_response(&body, 200)
        }
        "/log" => Response::from_string(guard.log_body.clone()).with_status_code(200),
        _ => Response::from_string("not found").with_status_code(404),
    };
    drop(guard);

    let _ = request.respond(response);
}

fn json_response(body: &str, code: u16) -> Response<std::io::Cursor<Vec<u8>>> {
    let mut response = Response::from_string(body).with_status_code(code);
    if let Ok(header) = Header::from_bytes("Content-Type", "application/json") {
        response = response.with_header(header);
    }
    response
}
