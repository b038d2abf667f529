//! Workflow data model: nodes, edges and the aggregate root

pub mod edge;
pub mod node;
pub mod workflow;

use serde::{Deserialize, Deserializer};

pub use edge::{classify_port, Edge, PortKind};
pub use node::{
    AnswerType, Argument, BindValueType, BranchType, CodeConfig, CodeLanguage, CommonConfig,
    ConditionBranch, ConditionConfig, EndConfig, ExceptionHandleConfig, ExceptionHandleType,
    Extension, GenericConfig, HttpRequestConfig, IntentBranch, IntentConfig, KnowledgeConfig,
    LlmConfig, LoopConfig, Node, NodeKind, NodeType, QaConfig, QaOption, ReturnType,
};
pub use workflow::{WorkflowData, WorkflowMetadata};

/// Node identifier, unique within a workflow
pub type NodeId = i64;

/// Workflow identifier
pub type WorkflowId = i64;

/// Treat an explicit `null` like a missing field
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Loop markers use `-1` (or `0`) on the wire for "not connected"
pub(crate) fn optional_node_id<'de, D>(deserializer: D) -> Result<Option<NodeId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<NodeId>::deserialize(deserializer)?.filter(|id| *id > 0))
}
