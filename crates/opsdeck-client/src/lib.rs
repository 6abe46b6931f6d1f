// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use opsdeck_app::{ProcessId, StatusSnapshot, WatchSet, log_path};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use std::io::Read;
use std::time::{Duration, Instant};

const DEFAULT_LOG_READ_WINDOW: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct Suggestion {
    value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    suggestions: Vec<Suggestion>,
}

/// Blocking client for the command server. Cheap to clone; clones share the
/// underlying connection pool, which is how callers run overlapping requests
/// on worker threads.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    log_read_window: Duration,
    http: HttpClient,
    log_http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Self::with_log_read_window(base_url, timeout, DEFAULT_LOG_READ_WINDOW)
    }

    pub fn with_log_read_window(
        base_url: &str,
        timeout: Duration,
        log_read_window: Duration,
    ) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("server.base_url must not be empty");
        }
        let parsed = url::Url::parse(&base_url)
            .with_context(|| format!("server.base_url {base_url:?} is not a valid URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "server.base_url {base_url:?} must use http or https, got {:?}",
                parsed.scheme()
            );
        }
        if log_read_window.is_zero() {
            bail!("server.log_read_window must be positive");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;
        // the log endpoint streams forever; reads against it get their own
        // short deadline so one refresh never hangs the caller
        let log_http = HttpClient::builder()
            .connect_timeout(timeout)
            .timeout(log_read_window)
            .build()
            .context("build log HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            log_read_window,
            http,
            log_http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// One authoritative status read. The caller replaces its snapshot
    /// wholesale with the result.
    pub fn fetch_status(&self) -> Result<StatusSnapshot> {
        let response = self
            .http
            .get(format!("{}/status", self.base_url))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        response.json().context("decode status response")
    }

    /// Submit a command for background execution. The server assigns the
    /// process id; the next status poll reports it.
    pub fn run_command(&self, command: &str) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/run", self.base_url))
            .form(&[("command", command)])
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(())
    }

    /// Ask the server to terminate and forget a process. Response body is
    /// ignored.
    pub fn close_process(&self, id: ProcessId) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/close-process", self.base_url))
            .form(&[("process_id", id.get())])
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(())
    }

    /// Command-name suggestions for the input line.
    pub fn search(&self, query: &str) -> Result<Vec<String>> {
        let response = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[("query", query)])
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: SearchResponse = response.json().context("decode search response")?;
        Ok(parsed
            .suggestions
            .into_iter()
            .map(|suggestion| suggestion.value)
            .collect())
    }

    /// Full address of the log stream for a watch set, derived purely from
    /// the watched ids in insertion order.
    pub fn log_url(&self, watch: &WatchSet) -> String {
        format!("{}{}", self.base_url, log_path(watch))
    }

    /// Bounded read of the log stream for the current watch set. The
    /// endpoint never terminates on its own, so this collects whatever
    /// arrives inside the read window and returns it as one full-replace
    /// view. Leading space padding (the server's anti-buffering workaround)
    /// is stripped.
    pub fn fetch_log(&self, watch: &WatchSet) -> Result<String> {
        let mut response = self
            .log_http
            .get(self.log_url(watch))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let deadline = Instant::now() + self.log_read_window;
        let mut collected = Vec::new();
        let mut buf = [0_u8; 8192];
        loop {
            match response.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => collected.extend_from_slice(&buf[..n]),
                // the stream outlived the window; what we have is the view
                Err(error) => {
                    if collected.is_empty() && Instant::now() < deadline {
                        return Err(error).context("read log stream");
                    }
                    tracing::debug!(error = %error, "log stream read window elapsed");
                    break;
                }
            }
            if Instant::now() >= deadline {
                break;
            }
        }

        let text = String::from_utf8_lossy(&collected).into_owned();
        Ok(text.trim_start_matches(' ').to_owned())
    }

    /// Reachability probe for `--check`: one status round trip.
    pub fn ping(&self) -> Result<()> {
        self.fetch_status().map(|_| ())
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    if error.is_connect() || error.is_timeout() {
        anyhow::anyhow!(
            "cannot reach command server at {base_url} ({error}); is it running? Check [server].base_url or OPSDECK_SERVER_URL"
        )
    } else {
        anyhow::Error::new(error).context(format!("request to {base_url} failed"))
    }
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    let body = body.trim();
    if body.is_empty() {
        anyhow::anyhow!("server returned {status}")
    } else {
        let mut snippet = body.to_owned();
        if snippet.len() > 200 {
            snippet.truncate(200);
            snippet.push_str("...");
        }
        anyhow::anyhow!("server returned {status}: {snippet}")
    }
}
