// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:1234";
const DEFAULT_TIMEOUT: &str = "5s";
const DEFAULT_LOG_READ_WINDOW: &str = "300ms";
pub const APP_NAME: &str = "opsdeck";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub watch: Watch,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: Server::default(),
            watch: Watch::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
    pub log_read_window: Option<String>,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
            log_read_window: Some(DEFAULT_LOG_READ_WINDOW.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Watch {
    /// Drop watches whose jobs the server no longer reports. Off by
    /// default: a stale watch keeps showing a just-finished job's tail.
    pub prune_stale: Option<bool>,
}

impl Default for Watch {
    fn default() -> Self {
        Self {
            prune_stale: Some(false),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub file: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("OPSDECK_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set OPSDECK_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and move values under [server], [watch], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(base_url) = &self.server.base_url
            && base_url.trim().is_empty()
        {
            bail!("server.base_url in {} must not be empty", path.display());
        }

        for (key, raw) in [
            ("server.timeout", self.server.timeout.as_deref()),
            (
                "server.log_read_window",
                self.server.log_read_window.as_deref(),
            ),
        ] {
            if let Some(raw) = raw {
                let parsed = parse_duration(raw)?;
                if parsed <= Duration::ZERO {
                    bail!("{key} in {} must be positive, got {raw}", path.display());
                }
            }
        }

        Ok(())
    }

    /// Server URL resolution: config value, then OPSDECK_SERVER_URL, then
    /// the default local address. A `--server` flag overrides all of these
    /// (handled by the caller).
    pub fn base_url(&self) -> String {
        if let Some(base_url) = &self.server.base_url {
            return base_url.trim_end_matches('/').to_owned();
        }
        if let Ok(from_env) = env::var("OPSDECK_SERVER_URL")
            && !from_env.trim().is_empty()
        {
            return from_env.trim_end_matches('/').to_owned();
        }
        DEFAULT_BASE_URL.to_owned()
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.server.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn log_read_window(&self) -> Result<Duration> {
        parse_duration(
            self.server
                .log_read_window
                .as_deref()
                .unwrap_or(DEFAULT_LOG_READ_WINDOW),
        )
    }

    pub fn prune_stale(&self) -> bool {
        self.watch.prune_stale.unwrap_or(false)
    }

    /// Diagnostic log file: config value, then OPSDECK_LOG. None disables
    /// logging entirely (the terminal belongs to the TUI).
    pub fn log_file(&self) -> Option<PathBuf> {
        if let Some(file) = &self.log.file {
            return Some(PathBuf::from(file));
        }
        env::var_os("OPSDECK_LOG").map(PathBuf::from)
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# opsdeck config\n# Place this file at: {}\n\nversion = 1\n\n[server]\n# Command server to control. Also settable via OPSDECK_SERVER_URL.\nbase_url = \"{}\"\ntimeout = \"{}\"\n# How long one log refresh reads from the live stream before rendering.\nlog_read_window = \"{}\"\n\n[watch]\n# Drop watches for jobs the server no longer reports.\nprune_stale = false\n\n[log]\n# Optional diagnostic log file (also settable via OPSDECK_LOG).\n# file = \"/tmp/opsdeck.log\"\n",
            path.display(),
            DEFAULT_BASE_URL,
            DEFAULT_TIMEOUT,
            DEFAULT_LOG_READ_WINDOW,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}
