//! Per-kind required field checks

use crate::models::{AnswerType, BranchType, Node, NodeKind};

use super::{ErrorCode, Severity, ValidationError};

fn blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

fn missing(node: &Node, field: &str, message: &str) -> ValidationError {
    ValidationError::for_node(node, ErrorCode::MissingField, message).field(field)
}

/// Required field checks for one node, in field order
pub fn check_node(node: &Node) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    match &node.kind {
        NodeKind::End(cfg) => {
            if cfg.return_type.is_none() {
                errors.push(missing(node, "returnType", "End node needs a return type"));
            }
        }
        NodeKind::Llm(cfg) => {
            if cfg.model_id.is_none() {
                errors.push(missing(node, "modelId", "LLM node needs a model"));
            }
            if blank(cfg.user_prompt.as_deref()) {
                errors.push(missing(node, "userPrompt", "LLM node needs a user prompt"));
            }
        }
        NodeKind::Code(cfg) => {
            if blank(cfg.source()) {
                let field = match cfg.code_language {
                    Some(crate::models::CodeLanguage::Python) => "codePython",
                    _ => "codeJavaScript",
                };
                errors.push(missing(node, field, "Code node has no code"));
            }
        }
        NodeKind::Condition(cfg) => {
            if cfg.condition_branch_configs.is_empty() {
                errors.push(missing(
                    node,
                    "conditionBranchConfigs",
                    "Condition node needs at least one branch",
                ));
            }
            for (i, branch) in cfg.condition_branch_configs.iter().enumerate() {
                if branch.branch_type != BranchType::Else && branch.condition_args.is_empty() {
                    errors.push(missing(
                        node,
                        "conditionArgs",
                        &format!("Branch {} has no conditions", i + 1),
                    ));
                }
            }
        }
        NodeKind::Loop(cfg) => {
            if blank(cfg.loop_type.as_deref()) {
                errors.push(missing(node, "loopType", "Loop node needs a loop type"));
            }
            if node.inner_nodes.is_empty() {
                errors.push(
                    missing(node, "innerNodes", "Loop body is empty").severity(Severity::Warning),
                );
            }
            if node.inner_start_node_id.is_none() {
                errors.push(missing(
                    node,
                    "innerStartNodeId",
                    "Loop body has no start node",
                ));
            }
            if node.inner_end_node_id.is_none() {
                errors.push(missing(node, "innerEndNodeId", "Loop body has no end node"));
            }
        }
        NodeKind::Qa(cfg) => {
            if blank(cfg.question.as_deref()) {
                errors.push(missing(node, "question", "QA node needs a question"));
            }
            if cfg.answer_type == Some(AnswerType::Select) && cfg.options.is_empty() {
                errors.push(missing(node, "options", "QA node in select mode needs options"));
            }
        }
        NodeKind::HttpRequest(cfg) => {
            if blank(cfg.url.as_deref()) {
                errors.push(missing(node, "url", "HTTP request needs a URL"));
            }
            if blank(cfg.method.as_deref()) {
                errors.push(missing(node, "method", "HTTP request needs a method"));
            }
        }
        NodeKind::Knowledge(cfg) => {
            if cfg.knowledge_base_configs.is_empty() {
                errors.push(missing(
                    node,
                    "knowledgeBaseConfigs",
                    "Knowledge node needs a knowledge base",
                ));
            }
        }
        NodeKind::IntentRecognition(cfg) => {
            if cfg.intent_configs.is_empty() {
                errors.push(missing(
                    node,
                    "intentConfigs",
                    "Intent recognition needs at least one intent",
                ));
            }
        }
        _ => {}
    }

    errors
}
