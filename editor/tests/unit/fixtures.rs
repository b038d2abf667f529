//! Shared builders and test doubles

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nuwax_editor::errors::EditorError;
use nuwax_editor::models::{
    BranchType, ConditionBranch, ConditionConfig, EndConfig, GenericConfig, Node, NodeId,
    NodeKind, WorkflowId,
};
use nuwax_editor::persist::{SavePayload, Sleeper, WorkflowBackend};
use openapi_client::{SaveWorkflowResponse, WorkflowDetails};
use tokio::sync::Notify;

pub fn start(id: NodeId) -> Node {
    Node::new(id, "Start", NodeKind::Start(GenericConfig::default()))
}

pub fn end(id: NodeId) -> Node {
    Node::new(id, "End", NodeKind::End(EndConfig::default()))
}

pub fn code(id: NodeId) -> Node {
    Node::new(id, format!("code{}", id), NodeKind::Code(Default::default()))
}

pub fn variable(id: NodeId) -> Node {
    Node::new(id, format!("var{}", id), NodeKind::Variable(GenericConfig::default()))
}

pub fn looped(id: NodeId) -> Node {
    Node::new(id, format!("loop{}", id), NodeKind::Loop(Default::default()))
}

pub fn condition(id: NodeId, uuids: &[&str]) -> Node {
    let branches = uuids
        .iter()
        .enumerate()
        .map(|(i, uuid)| ConditionBranch {
            uuid: uuid.to_string(),
            branch_type: if i == 0 { BranchType::If } else { BranchType::Else },
            condition_type: None,
            condition_args: Vec::new(),
            next_node_ids: Vec::new(),
        })
        .collect();
    Node::new(
        id,
        format!("cond{}", id),
        NodeKind::Condition(ConditionConfig {
            condition_branch_configs: branches,
            common: Default::default(),
        }),
    )
}

/// Node inside the body of `loop_id`
pub fn inner(node: Node, loop_id: NodeId) -> Node {
    Node {
        loop_node_id: Some(loop_id),
        ..node
    }
}

pub fn transport_error(message: &str) -> EditorError {
    EditorError::ApiError {
        code: "503".to_string(),
        message: message.to_string(),
    }
}

/// Scriptable backend that counts calls
#[derive(Default)]
pub struct MockBackend {
    details: Mutex<Option<WorkflowDetails<Node>>>,
    responses: Mutex<VecDeque<Result<SaveWorkflowResponse, EditorError>>>,
    fail_always: Mutex<Option<String>>,
    hold: Mutex<Option<Arc<Notify>>>,
    saved: Mutex<Vec<SavePayload>>,
    save_calls: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_details(details: WorkflowDetails<Node>) -> Arc<Self> {
        let backend = Self::default();
        *backend.details.lock().unwrap() = Some(details);
        Arc::new(backend)
    }

    /// Queue the result of the next save call
    pub fn push_response(&self, response: Result<SaveWorkflowResponse, EditorError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    /// Every save call fails with a transport error
    pub fn fail_always(&self, message: &str) {
        *self.fail_always.lock().unwrap() = Some(message.to_string());
    }

    /// Block the next save call until the returned handle is notified
    pub fn hold_next_save(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.hold.lock().unwrap() = Some(notify.clone());
        notify
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn saved(&self) -> Vec<SavePayload> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkflowBackend for MockBackend {
    async fn get_workflow_details(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<WorkflowDetails<Node>, EditorError> {
        self.details
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| EditorError::ApiError {
                code: "404".to_string(),
                message: format!("workflow {} not found", workflow_id),
            })
    }

    async fn save_workflow_full(
        &self,
        _workflow_id: WorkflowId,
        payload: &SavePayload,
    ) -> Result<SaveWorkflowResponse, EditorError> {
        let call = self.save_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.saved.lock().unwrap().push(payload.clone());

        let hold = self.hold.lock().unwrap().take();
        if let Some(hold) = hold {
            hold.notified().await;
        }

        if let Some(message) = self.fail_always.lock().unwrap().clone() {
            return Err(transport_error(&message));
        }
        let scripted = self.responses.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(SaveWorkflowResponse {
                success: true,
                message: None,
                version: Some(format!("v{}", call)),
            })
        })
    }
}

/// Sleeper that returns at once and remembers what it was asked
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// Sleeper that never wakes up
pub struct StuckSleeper;

#[async_trait]
impl Sleeper for StuckSleeper {
    async fn sleep(&self, _duration: Duration) {
        std::future::pending::<()>().await;
    }
}

/// Yield until `cond` holds, giving spawned tasks a chance to run
pub async fn settle<F: Fn() -> bool>(cond: F) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}
