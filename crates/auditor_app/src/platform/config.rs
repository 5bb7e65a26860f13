use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use auditor_engine::{ApiSettings, StreamSettings};
use auditor_logging::auditor_info;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use super::logging::LogDestination;

const DEFAULT_CONFIG_FILENAME: &str = "auditor.ron";

/// Settings of the `auditor` binary.
///
/// Layered as defaults, then the RON file, then `AUDITOR_*` environment
/// variables, then command-line flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditorConfig {
    pub stream_base_url: String,
    pub task_api_base_url: String,
    pub task_api_token: Option<String>,
    pub company_id: String,
    pub user_id: String,
    pub output_dir: PathBuf,
    pub log_level: String,
    pub log_destination: LogDestination,
    pub connect_timeout_secs: u64,
    /// Idle limit on the progress stream; 0, the default, waits indefinitely.
    pub stream_idle_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for AuditorConfig {
    fn default() -> Self {
        let stream = StreamSettings::default();
        let api = ApiSettings::default();
        Self {
            stream_base_url: stream.base_url,
            task_api_base_url: api.base_url,
            task_api_token: None,
            company_id: String::new(),
            user_id: String::new(),
            output_dir: PathBuf::from("."),
            log_level: "warn".to_string(),
            log_destination: LogDestination::Terminal,
            connect_timeout_secs: stream.connect_timeout.as_secs(),
            stream_idle_timeout_secs: stream.idle_timeout.map_or(0, |limit| limit.as_secs()),
            request_timeout_secs: api.request_timeout.as_secs(),
        }
    }
}

impl AuditorConfig {
    /// Builds the effective configuration for one invocation.
    pub fn resolve(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = Self::load(cli.config.as_deref())?;
        config.apply_env(|name| std::env::var(name).ok());
        config.apply_cli(cli);
        Ok(config)
    }

    /// Reads `path`, or `./auditor.ron` when no path is given.
    ///
    /// A missing default file yields the defaults; a missing explicit file is
    /// an error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILENAME), false),
        };
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound && !explicit => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading config {}", path.display()))
            }
        };
        let config = ron::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        auditor_info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(value) = lookup("AUDITOR_STREAM_BASE_URL") {
            self.stream_base_url = value;
        }
        if let Some(value) = lookup("AUDITOR_TASK_API_BASE_URL") {
            self.task_api_base_url = value;
        }
        if let Some(value) = lookup("AUDITOR_TASK_API_TOKEN") {
            self.task_api_token = Some(value);
        }
        if let Some(value) = lookup("AUDITOR_COMPANY_ID") {
            self.company_id = value;
        }
        if let Some(value) = lookup("AUDITOR_USER_ID") {
            self.user_id = value;
        }
        if let Some(value) = lookup("AUDITOR_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(value);
        }
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(url) = &cli.stream_base_url {
            self.stream_base_url = url.clone();
        }
        if let Some(dir) = &cli.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(level) = &cli.log_level {
            self.log_level = level.clone();
        }
    }

    pub fn stream_settings(&self) -> StreamSettings {
        StreamSettings {
            base_url: self.stream_base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            idle_timeout: (self.stream_idle_timeout_secs > 0)
                .then(|| Duration::from_secs(self.stream_idle_timeout_secs)),
        }
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: self.task_api_base_url.clone(),
            auth_token: self.task_api_token.clone(),
            company_id: self.company_id.clone(),
            user_id: self.user_id.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}
