//! Worker configuration

use crate::error::{IngestError, Result};
use crate::types::{DEFAULT_CHUNK_SIZE, DEFAULT_SAMPLE_LINES};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_INGEST_PATH: &str = "/fusebase/loadfilefromclient";
pub const DEFAULT_LOAD_PATH: &str = "/loadtodb";

/// Log level used by the command-line front end
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

fn default_ingest_path() -> String {
    DEFAULT_INGEST_PATH.to_string()
}

fn default_load_path() -> String {
    DEFAULT_LOAD_PATH.to_string()
}

fn default_window() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_sample_lines() -> usize {
    DEFAULT_SAMPLE_LINES
}

/// Configuration of a worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IngestConfig {
    /// Base URL of the receiver; required for uploads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Path chunks are posted to (default: /fusebase/loadfilefromclient)
    #[serde(default = "default_ingest_path")]
    pub ingest_path: String,

    /// Path of the table load request (default: /loadtodb)
    #[serde(default = "default_load_path")]
    pub load_path: String,

    /// Bytes per uploaded chunk (default: 600000)
    #[serde(default = "default_window")]
    pub chunk_size: usize,

    /// Bytes per sampler read (default: 600000)
    #[serde(default = "default_window")]
    pub sample_window: usize,

    /// Lines collected by the sampler (default: 200)
    #[serde(default = "default_sample_lines")]
    pub sample_lines: usize,

    #[serde(default)]
    pub log_level: LogLevel,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            ingest_path: default_ingest_path(),
            load_path: default_load_path(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            sample_window: DEFAULT_CHUNK_SIZE,
            sample_lines: DEFAULT_SAMPLE_LINES,
            log_level: LogLevel::Info,
        }
    }
}

impl IngestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn ingest_path(mut self, path: impl Into<String>) -> Self {
        self.ingest_path = path.into();
        self
    }

    pub fn load_path(mut self, path: impl Into<String>) -> Self {
        self.load_path = path.into();
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn sample_window(mut self, size: usize) -> Self {
        self.sample_window = size;
        self
    }

    pub fn sample_lines(mut self, lines: usize) -> Self {
        self.sample_lines = lines;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(IngestError::config_error("chunk-size must be greater than 0"));
        }
        if self.sample_window == 0 {
            return Err(IngestError::config_error("sample-window must be greater than 0"));
        }
        if self.sample_lines == 0 {
            return Err(IngestError::config_error("sample-lines must be greater than 0"));
        }
        if let Some(ref endpoint) = self.endpoint {
            reqwest::Url::parse(endpoint).map_err(|e| {
                IngestError::config_error(format!("Invalid endpoint {:?}: {}", endpoint, e))
            })?;
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(IngestError::from)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| IngestError::config_error(format!("Invalid configuration: {}", e)))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            IngestError::config_error(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }
}
