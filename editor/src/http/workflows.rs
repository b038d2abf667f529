//! Workflow API client

use async_trait::async_trait;
use openapi_client::{
    PublishWorkflowRequest, SaveWorkflowResponse, ValidationResult, WorkflowDetails,
};
use serde_json::Value;

use crate::errors::EditorError;
use crate::http::client::{unwrap_envelope, HttpClient};
use crate::models::{Node, WorkflowId};
use crate::persist::{SavePayload, WorkflowBackend};

/// Version token from a save response body; numbers are accepted too
fn version_of(data: Option<&Value>) -> Option<String> {
    match data? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => version_of(map.get("version")),
        _ => None,
    }
}

impl HttpClient {
    /// Get a workflow with its full graph
    pub async fn get_workflow_details(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<WorkflowDetails<Node>, EditorError> {
        let path = format!("/api/workflow/{}", workflow_id);
        unwrap_envelope(self.get(&path).await?)
    }

    /// Replace the stored graph of a workflow
    ///
    /// A rejected envelope is reported as an unsuccessful response, not an
    /// error, so the caller decides whether to retry.
    pub async fn save_workflow_full(
        &self,
        payload: &SavePayload,
    ) -> Result<SaveWorkflowResponse, EditorError> {
        let response = self.post::<Value, _>("/api/workflow/v2/save", payload).await?;
        Ok(SaveWorkflowResponse {
            success: response.is_success(),
            version: version_of(response.data.as_ref()),
            message: response.message,
        })
    }

    /// Run backend validation of a stored workflow
    pub async fn validate_workflow(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<Vec<ValidationResult>, EditorError> {
        let path = format!("/api/workflow/valid/{}", workflow_id);
        unwrap_envelope(self.get(&path).await?)
    }

    /// Publish a workflow
    pub async fn publish_workflow(&self, request: &PublishWorkflowRequest) -> Result<(), EditorError> {
        let response = self.post::<Value, _>("/api/workflow/publish", request).await?;
        if !response.is_success() {
            return Err(EditorError::ApiError {
                message: response.message_or("publish failed"),
                code: response.code,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl WorkflowBackend for HttpClient {
    async fn get_workflow_details(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<WorkflowDetails<Node>, EditorError> {
        HttpClient::get_workflow_details(self, workflow_id).await
    }

    async fn save_workflow_full(
        &self,
        _workflow_id: WorkflowId,
        payload: &SavePayload,
    ) -> Result<SaveWorkflowResponse, EditorError> {
        HttpClient::save_workflow_full(self, payload).await
    }
}
