// src/config.rs
//! Runtime configuration of the submission client.
//!
//! Every field resolves in the same order: command line, environment, config
//! file, built-in default. The server endpoint has no built-in default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use serde::Deserialize;

use crate::diagnosis::task::TaskId;
use crate::error::ConfigError;

pub const ENV_API_URL: &str = "HEALTHGUARD_API_URL";
pub const ENV_CONFIG_FILE: &str = "HEALTHGUARD_CONFIG";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the inference server, without trailing slash.
    pub base_endpoint: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub default_task: TaskId,
    /// Where cameras write captured JPEGs.
    pub capture_dir: PathBuf,
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub endpoint: Option<String>,
    pub config_file: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub task: Option<String>,
    pub capture_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    base_endpoint: Option<String>,
    timeout_secs: Option<u64>,
    connect_timeout_secs: Option<u64>,
    default_task: Option<String>,
    capture_dir: Option<PathBuf>,
}

impl ClientConfig {
    /// Config with defaults for everything but the endpoint.
    pub fn new(base_endpoint: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_endpoint: normalize_endpoint(base_endpoint)?,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            default_task: TaskId::default(),
            capture_dir: default_capture_dir(),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_capture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.capture_dir = dir.into();
        self
    }

    /// Resolve against the process environment.
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    pub fn resolve_with<F>(overrides: ConfigOverrides, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match overrides
            .config_file
            .clone()
            .or_else(|| env(ENV_CONFIG_FILE).map(PathBuf::from))
        {
            Some(path) => load_file(&path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => load_file(&path)?,
                _ => FileConfig::default(),
            },
        };

        let endpoint = overrides
            .endpoint
            .or_else(|| env(ENV_API_URL).filter(|v| !v.trim().is_empty()))
            .or(file.base_endpoint)
            .ok_or(ConfigError::MissingEndpoint)?;

        let task = match overrides.task.or(file.default_task) {
            Some(task) => TaskId::new(task)?,
            None => TaskId::default(),
        };

        let config = Self {
            base_endpoint: normalize_endpoint(&endpoint)?,
            timeout: Duration::from_secs(
                overrides
                    .timeout_secs
                    .or(file.timeout_secs)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            connect_timeout: Duration::from_secs(
                file.connect_timeout_secs
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
            default_task: task,
            capture_dir: overrides
                .capture_dir
                .or(file.capture_dir)
                .unwrap_or_else(default_capture_dir),
        };

        info!(
            "Using server {} (task {}, timeout {}s)",
            config.base_endpoint,
            config.default_task,
            config.timeout.as_secs()
        );
        Ok(config)
    }

    pub fn predict_url(&self, task: &TaskId) -> String {
        format!("{}/predict/{}", self.base_endpoint, task)
    }

    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_endpoint)
    }
}

/// `<config_dir>/healthguard/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("healthguard").join("config.toml"))
}

fn default_capture_dir() -> PathBuf {
    std::env::temp_dir().join("healthguard").join("captures")
}

fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
    debug!("Loading config file {}", path.display());
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn normalize_endpoint(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let invalid = |reason: &str| ConfigError::InvalidEndpoint {
        endpoint: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = reqwest::Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("query and fragment are not allowed"));
    }
    Ok(trimmed.to_string())
}
