//! API models

use serde::{Deserialize, Serialize};

/// Response code the backend uses for a successful call
pub const SUCCESS_CODE: &str = "0000";

/// Standard response envelope: `{ code, data, message }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: String,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Whether the backend reported success
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// Message attached by the backend, or a fallback
    pub fn message_or(&self, fallback: &str) -> String {
        self.message
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Workflow-level canvas extension
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExtension {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
}

/// Full workflow snapshot returned by `GET /api/workflow/{id}`
///
/// Generic over the node representation so the editor crate owns the
/// node model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "N: Deserialize<'de>"))]
pub struct WorkflowDetails<N> {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub space_id: i64,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default = "Vec::new")]
    pub nodes: Vec<N>,
    #[serde(default)]
    pub start_node: Option<N>,
    #[serde(default)]
    pub end_node: Option<N>,
    #[serde(default)]
    pub extension: Option<WorkflowExtension>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub publish_status: Option<String>,
}

/// Workflow configuration sent on a full save
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowConfig<N, A> {
    pub id: i64,
    pub space_id: i64,
    pub name: String,
    pub function_name: Option<String>,
    pub description: Option<String>,
    pub icon: String,
    pub start_node: Option<N>,
    pub end_node: Option<N>,
    pub input_args: Vec<A>,
    pub output_args: Vec<A>,
    pub nodes: Vec<N>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<WorkflowExtension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Body of `POST /api/workflow/v2/save`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveWorkflowRequest<N, A> {
    pub workflow_config: WorkflowConfig<N, A>,
}

/// Result of a full save
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveWorkflowResponse {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Per-node result of `GET /api/workflow/valid/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub node_id: i64,
    pub success: bool,
    pub messages: Vec<String>,
}

/// Body of `POST /api/workflow/publish`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishWorkflowRequest {
    pub workflow_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}
