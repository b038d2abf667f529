//! Backend and clock seams of the save pipeline

use std::time::Duration;

use async_trait::async_trait;
use openapi_client::{SaveWorkflowRequest, SaveWorkflowResponse, WorkflowDetails};

use crate::errors::EditorError;
use crate::models::{Argument, Node, WorkflowId};

/// Body of a full save
pub type SavePayload = SaveWorkflowRequest<Node, Argument>;

/// Backend operations the editor core depends on
#[async_trait]
pub trait WorkflowBackend: Send + Sync {
    /// Load the full graph of a workflow
    async fn get_workflow_details(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<WorkflowDetails<Node>, EditorError>;

    /// Replace the stored graph of a workflow
    async fn save_workflow_full(
        &self,
        workflow_id: WorkflowId,
        payload: &SavePayload,
    ) -> Result<SaveWorkflowResponse, EditorError>;
}

/// Delay source for retries
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
