use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{LitePipeError, Result};
use crate::trigger::MATCH_EVERYTHING;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// Startup configuration. Never modified once [`LitePipeConfig::validate`]
/// has accepted it.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LitePipeConfig {
    #[serde(default)]
    pub port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default)]
    pub webhook_secret: String,
    #[serde(default)]
    pub trigger_paths: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<String>,
    pub tasks_working_directory: Option<PathBuf>,
    pub task_timeout_secs: Option<u64>,
    #[serde(default = "default_serialize_runs")]
    pub serialize_runs: bool,
    pub log_directory: Option<PathBuf>,
    /// Rolled log files kept in `log_directory`
    pub log_max_files: Option<usize>,
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

fn default_serialize_runs() -> bool {
    true
}

impl LitePipeConfig {
    /// Applies defaults and rejects configurations that cannot run.
    pub fn validate(mut self) -> Result<Self> {
        if self.port == 0 {
            self.port = DEFAULT_PORT;
        }

        if self.webhook_secret.is_empty() {
            return Err(LitePipeError::ConfigError(
                "You need to provide your webhook secret".to_string(),
            ));
        }

        if self.trigger_paths.is_empty() {
            self.trigger_paths = vec![MATCH_EVERYTHING.to_string()];
        }

        if self.tasks.is_empty() {
            return Err(LitePipeError::ConfigError(
                "There needs to be at least one task".to_string(),
            ));
        }

        if let Some(position) = self.tasks.iter().position(|t| t.trim().is_empty()) {
            return Err(LitePipeError::ConfigError(format!(
                "Task {} is empty",
                position + 1
            )));
        }

        if self
            .tasks_working_directory
            .as_ref()
            .is_some_and(|dir| dir.as_os_str().is_empty())
        {
            self.tasks_working_directory = None;
        }

        if self.log_max_files == Some(0) {
            return Err(LitePipeError::ConfigError(
                "logMaxFiles must be at least 1".to_string(),
            ));
        }

        if self.task_timeout_secs == Some(0) {
            self.task_timeout_secs = None;
        }

        Ok(self)
    }

    /// Logs the effective settings once logging is up.
    pub fn log_summary(&self) {
        info!("Trigger paths: {}", self.trigger_paths.join(", "));
        info!("Tasks: {}", self.tasks.len());
        match &self.tasks_working_directory {
            Some(dir) => info!("Tasks working directory: {}", dir.display()),
            None => info!(
                "No working directory for tasks to be executed in specified, defaulting to current directory"
            ),
        }
        match self.task_timeout() {
            Some(timeout) => info!("Task timeout: {:?}", timeout),
            None => info!("No task timeout"),
        }
        if !self.serialize_runs {
            warn!("serializeRuns is disabled, task runs from concurrent deliveries may overlap");
        }
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout_secs.map(Duration::from_secs)
    }
}

/// Parses configuration text. Files ending in `.toml` are TOML, everything
/// else is JSON.
pub fn parse_config(path: &Path, content: &str) -> Result<LitePipeConfig> {
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let config: LitePipeConfig = if is_toml {
        toml::from_str(content)?
    } else {
        serde_json::from_str(content)?
    };

    config.validate()
}

/// Load, parse and validate the configuration file
pub fn load_config(path: impl AsRef<Path>) -> Result<LitePipeConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        LitePipeError::ConfigError(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    parse_config(path, &content).map_err(|e| match e {
        LitePipeError::ConfigError(_) => e,
        other => LitePipeError::ConfigError(format!(
            "Failed to parse config file '{}': {}",
            path.display(),
            other
        )),
    })
}
