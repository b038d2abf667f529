//! Editor configuration options

use std::time::Duration;

use crate::models::WorkflowId;
use crate::utils::RetryOptions;

/// Main editor options
#[derive(Debug, Clone)]
pub struct EditorOptions {
    /// Workflow being edited
    pub workflow_id: WorkflowId,

    /// Backend API base URL
    pub backend_base_url: String,

    /// Bearer token sent with every backend call
    pub auth_token: Option<String>,

    /// Per-request HTTP timeout
    pub http_timeout: Duration,

    /// Save and autosave behavior
    pub autosave: AutoSaveOptions,

    /// Undo/redo behavior
    pub history: HistoryOptions,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            workflow_id: 0,
            backend_base_url: "http://localhost:8080".to_string(),
            auth_token: None,
            http_timeout: Duration::from_secs(30),
            autosave: AutoSaveOptions::default(),
            history: HistoryOptions::default(),
        }
    }
}

/// Save pipeline options
#[derive(Debug, Clone, PartialEq)]
pub struct AutoSaveOptions {
    /// Run the background autosave worker
    pub enabled: bool,

    /// Quiet period after node updates and edge changes
    pub debounce: Duration,

    /// Delay after node additions, deletions and batches
    pub throttle: Duration,

    /// Retries after the first failed attempt
    pub max_retries: u32,

    /// Delay between attempts
    pub retry: RetryOptions,
}

impl Default for AutoSaveOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce: Duration::from_millis(2000),
            throttle: Duration::from_millis(10000),
            max_retries: 3,
            retry: RetryOptions::default(),
        }
    }
}

/// Undo/redo options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryOptions {
    /// Record history entries at all
    pub enabled: bool,

    /// Maximum undo depth
    pub stack_size: usize,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            stack_size: 50,
        }
    }
}
