//! Settings file management

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::app::options::{AutoSaveOptions, EditorOptions, HistoryOptions};
use crate::errors::EditorError;
use crate::logs::{LogLevel, LogOptions};
use crate::models::WorkflowId;
use crate::utils::RetryOptions;

/// Editor settings, as stored in a JSON file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON logs
    #[serde(default)]
    pub log_json: bool,

    /// Workflow to edit
    #[serde(default)]
    pub workflow_id: WorkflowId,

    /// Backend configuration
    #[serde(default)]
    pub backend: BackendSettings,

    /// Save pipeline configuration
    #[serde(default)]
    pub autosave: AutoSaveSettings,

    /// Undo/redo configuration
    #[serde(default)]
    pub history: HistorySettings,
}

fn default_true() -> bool {
    true
}

/// Backend API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Base URL for the backend API
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Bearer token
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_backend_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            auth_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Save pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoSaveSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First retry delay in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_debounce_ms() -> u64 {
    2000
}

fn default_throttle_ms() -> u64 {
    10000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for AutoSaveSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: default_debounce_ms(),
            throttle_ms: default_throttle_ms(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// Undo/redo settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_stack_size")]
    pub stack_size: usize,
}

fn default_stack_size() -> usize {
    50
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            stack_size: default_stack_size(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file
    pub async fn load(path: &Path) -> Result<Self, EditorError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading settings file {}", path.display()))
            .map_err(|e| EditorError::ConfigError(format!("{:#}", e)))?;
        Self::parse(&raw).map_err(|e| match e {
            EditorError::ConfigError(msg) => {
                EditorError::ConfigError(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Parse settings from JSON text
    pub fn parse(raw: &str) -> Result<Self, EditorError> {
        serde_json::from_str(raw)
            .context("parsing settings")
            .map_err(|e| EditorError::ConfigError(format!("{:#}", e)))
    }

    /// Editor options described by these settings
    pub fn editor_options(&self) -> EditorOptions {
        let retry_base = Duration::from_millis(self.autosave.retry_delay_ms);
        EditorOptions {
            workflow_id: self.workflow_id,
            backend_base_url: self.backend.base_url.clone(),
            auth_token: self.backend.auth_token.clone(),
            http_timeout: Duration::from_secs(self.backend.timeout_secs),
            autosave: AutoSaveOptions {
                enabled: self.autosave.enabled,
                debounce: Duration::from_millis(self.autosave.debounce_ms),
                throttle: Duration::from_millis(self.autosave.throttle_ms),
                max_retries: self.autosave.max_retries,
                retry: RetryOptions {
                    base_delay: retry_base,
                    ..RetryOptions::default()
                },
            },
            history: HistoryOptions {
                enabled: self.history.enabled,
                stack_size: self.history.stack_size,
            },
        }
    }

    /// Logging options described by these settings
    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            log_level: self.log_level,
            json_format: self.log_json,
            ..LogOptions::default()
        }
    }
}
