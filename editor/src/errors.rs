//! Error types for the workflow editor core

use thiserror::Error;

use crate::models::NodeId;

/// Main error type for the workflow editor core
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Backend error [{code}]: {message}")]
    ApiError { code: String, message: String },

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Duplicate node id: {0}")]
    DuplicateNode(NodeId),

    #[error("Invalid node: {0}")]
    InvalidNode(String),

    #[error("Invalid edge: {0}")]
    InvalidEdge(String),

    #[error("Node {id} is a {expected} node, patch carries a {actual} config")]
    KindMismatch {
        id: NodeId,
        expected: String,
        actual: String,
    },

    #[error("Save failed after {attempts} attempt(s): {source}")]
    SaveFailed {
        attempts: u32,
        #[source]
        source: Box<EditorError>,
    },

    #[error("Save cancelled")]
    SaveCancelled,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EditorError {
    /// Whether the error comes from the network or the backend
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            EditorError::HttpError(_) | EditorError::ApiError { .. } | EditorError::JsonError(_)
        )
    }
}

impl From<anyhow::Error> for EditorError {
    fn from(err: anyhow::Error) -> Self {
        EditorError::Internal(err.to_string())
    }
}
