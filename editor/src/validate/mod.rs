//! Workflow validation
//!
//! Validation never fails and never mutates: findings come back as data, in
//! node list order, so running it twice on the same graph yields the same
//! report.

pub mod rules;
pub mod structure;

use openapi_client::ValidationResult;
use serde::{Deserialize, Serialize};

use crate::models::{Node, NodeId, WorkflowData};

/// How serious a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks publishing
    Error,
    /// Shown to the user, does not block
    Warning,
}

/// Finding category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MissingStart,
    MultipleStart,
    MissingEnd,
    EndUnreachable,
    Cycle,
    Unreachable,
    ExceptionOnly,
    DuplicateTarget,
    DanglingReference,
    DeadEnd,
    MixedFlow,
    EdgeMismatch,
    MissingField,
    InvalidReference,
}

/// One validation finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    /// Node the finding is about, `None` for workflow-level findings
    pub node_id: Option<NodeId>,
    pub node_name: String,
    pub field: Option<String>,
    pub code: ErrorCode,
    pub message: String,
    pub severity: Severity,
}

impl ValidationError {
    /// Workflow-level error
    pub fn workflow(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            node_id: None,
            node_name: String::new(),
            field: None,
            code,
            message: message.into(),
            severity: Severity::Error,
        }
    }

    /// Error about one node
    pub fn for_node(node: &Node, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            node_id: Some(node.id),
            node_name: node.name.clone(),
            field: None,
            code,
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Result of validating a workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True iff no Error-severity finding exists
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self {
            valid: !errors.iter().any(ValidationError::is_error),
            errors,
        }
    }

    /// Findings for one node
    pub fn for_node(&self, id: NodeId) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(move |e| e.node_id == Some(id))
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(|e| e.severity == Severity::Warning)
    }
}

/// Validate the whole workflow
pub fn validate_workflow(data: &WorkflowData) -> ValidationReport {
    let graph = structure::FlowGraph::new(data);

    let mut errors = graph.check_workflow();
    for node in data.iter_nodes() {
        errors.extend(graph.check_node(node));
        errors.extend(rules::check_node(node));
        errors.extend(graph.check_references(node));
    }
    errors.extend(graph.check_edges());

    ValidationReport::new(errors)
}

/// Required field checks for a single node
pub fn validate_node(node: &Node) -> Vec<ValidationError> {
    rules::check_node(node)
}

/// Group a report per node in the backend's result shape
///
/// Workflow-level findings have no node and are left out.
pub fn to_api_results(report: &ValidationReport) -> Vec<ValidationResult> {
    let mut results: Vec<ValidationResult> = Vec::new();
    for error in &report.errors {
        let Some(node_id) = error.node_id else {
            continue;
        };
        let idx = match results.iter().position(|r| r.node_id == node_id) {
            Some(idx) => idx,
            None => {
                results.push(ValidationResult {
                    node_id,
                    success: true,
                    messages: Vec::new(),
                });
                results.len() - 1
            }
        };
        let entry = &mut results[idx];
        entry.success &= !error.is_error();
        entry.messages.push(error.message.clone());
    }
    results
}
