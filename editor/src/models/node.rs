//! Workflow node model
//!
//! `nodeConfig` is keyed by the node's `type` field: every node kind has its
//! own config shape, and all of them share [`CommonConfig`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{null_as_default, optional_node_id, NodeId, WorkflowId};

/// Default exception timeout, in seconds
pub const DEFAULT_EXCEPTION_TIMEOUT: u64 = 180;

/// A node in the workflow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique node ID within the workflow
    pub id: NodeId,

    /// Display name
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    /// Display description
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,

    /// Icon URL
    #[serde(default, deserialize_with = "null_as_default")]
    pub icon: String,

    /// Owning workflow
    #[serde(default, deserialize_with = "null_as_default")]
    pub workflow_id: WorkflowId,

    /// Node kind and its config (`type` + `nodeConfig` on the wire)
    #[serde(flatten)]
    pub kind: NodeKind,

    /// Normal (success) flow targets
    #[serde(default, deserialize_with = "null_as_default")]
    pub next_node_ids: Vec<NodeId>,

    /// Enclosing loop, for inner nodes
    #[serde(
        default,
        deserialize_with = "optional_node_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub loop_node_id: Option<NodeId>,

    /// Loop body, for Loop nodes
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub inner_nodes: Vec<Node>,

    /// First node of the loop body
    #[serde(
        default,
        deserialize_with = "optional_node_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub inner_start_node_id: Option<NodeId>,

    /// Last node of the loop body
    #[serde(
        default,
        deserialize_with = "optional_node_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub inner_end_node_id: Option<NodeId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

impl Node {
    /// Create a bare node of the given kind
    pub fn new(id: NodeId, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            icon: String::new(),
            workflow_id: 0,
            kind,
            next_node_ids: Vec::new(),
            loop_node_id: None,
            inner_nodes: Vec::new(),
            inner_start_node_id: None,
            inner_end_node_id: None,
            created: None,
            modified: None,
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    pub fn is_loop(&self) -> bool {
        matches!(self.kind, NodeKind::Loop(_))
    }

    /// Exception flow targets, empty when no exception config exists
    pub fn exception_targets(&self) -> &[NodeId] {
        self.kind
            .common()
            .exception_handle_config
            .as_ref()
            .map(|c| c.exception_handle_node_ids.as_slice())
            .unwrap_or(&[])
    }

    /// Exception config, created in exception-flow mode on first use
    pub fn exception_config_mut(&mut self) -> &mut ExceptionHandleConfig {
        self.kind
            .common_mut()
            .exception_handle_config
            .get_or_insert_with(|| ExceptionHandleConfig {
                exception_handle_type: ExceptionHandleType::ExecuteExceptionFlow,
                ..Default::default()
            })
    }

    /// Canvas geometry
    pub fn extension(&self) -> Option<&Extension> {
        self.kind.common().extension.as_ref()
    }

    /// Remove every reference to `id` from this node's adjacency fields
    ///
    /// Returns true if anything changed.
    pub fn prune_target(&mut self, id: NodeId) -> bool {
        let mut changed = remove_id(&mut self.next_node_ids, id);
        if let Some(cfg) = self.kind.common_mut().exception_handle_config.as_mut() {
            changed |= remove_id(&mut cfg.exception_handle_node_ids, id);
        }
        for targets in self.kind.branch_targets_mut() {
            changed |= remove_id(targets, id);
        }
        if self.inner_start_node_id == Some(id) {
            self.inner_start_node_id = None;
            changed = true;
        }
        if self.inner_end_node_id == Some(id) {
            self.inner_end_node_id = None;
            changed = true;
        }
        changed
    }
}

/// Remove every occurrence of `id`, returning true if one was present
pub(crate) fn remove_id(ids: &mut Vec<NodeId>, id: NodeId) -> bool {
    let before = ids.len();
    ids.retain(|x| *x != id);
    ids.len() != before
}

/// Append `id` unless already present, returning true if it was added
pub(crate) fn push_unique(ids: &mut Vec<NodeId>, id: NodeId) -> bool {
    if ids.contains(&id) {
        return false;
    }
    ids.push(id);
    true
}

/// Declares the node kind enum, its fieldless twin, and the accessors both need
macro_rules! node_kinds {
    ($( $variant:ident => $wire:literal ($config:ty) ),+ $(,)?) => {
        /// Node kind with its kind-specific config
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "type", content = "nodeConfig")]
        pub enum NodeKind {
            $( #[serde(rename = $wire)] $variant($config), )+
        }

        /// Node kind without its config
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum NodeType {
            $( #[serde(rename = $wire)] $variant, )+
        }

        impl NodeType {
            /// Wire name of the kind
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( NodeType::$variant => $wire, )+
                }
            }
        }

        impl NodeKind {
            pub fn node_type(&self) -> NodeType {
                match self {
                    $( NodeKind::$variant(_) => NodeType::$variant, )+
                }
            }

            /// Fields every config carries
            pub fn common(&self) -> &CommonConfig {
                match self {
                    $( NodeKind::$variant(c) => &c.common, )+
                }
            }

            pub fn common_mut(&mut self) -> &mut CommonConfig {
                match self {
                    $( NodeKind::$variant(c) => &mut c.common, )+
                }
            }
        }
    };
}

node_kinds! {
    Start => "Start" (GenericConfig),
    End => "End" (EndConfig),
    Llm => "LLM" (LlmConfig),
    Code => "Code" (CodeConfig),
    Variable => "Variable" (GenericConfig),
    Loop => "Loop" (LoopConfig),
    Condition => "Condition" (ConditionConfig),
    IntentRecognition => "IntentRecognition" (IntentConfig),
    Qa => "QA" (QaConfig),
    HttpRequest => "HTTPRequest" (HttpRequestConfig),
    Knowledge => "Knowledge" (KnowledgeConfig),
    Plugin => "Plugin" (GenericConfig),
    Workflow => "Workflow" (GenericConfig),
    Mcp => "Mcp" (GenericConfig),
    TextProcessing => "TextProcessing" (GenericConfig),
    DocumentExtraction => "DocumentExtraction" (GenericConfig),
    Output => "Output" (GenericConfig),
    LongTermMemory => "LongTermMemory" (GenericConfig),
    LoopStart => "LoopStart" (GenericConfig),
    LoopEnd => "LoopEnd" (GenericConfig),
    LoopBreak => "LoopBreak" (GenericConfig),
    LoopContinue => "LoopContinue" (GenericConfig),
    LoopCondition => "LoopCondition" (GenericConfig),
    Interval => "Interval" (GenericConfig),
    TableDataAdd => "TableDataAdd" (GenericConfig),
    TableDataDelete => "TableDataDelete" (GenericConfig),
    TableDataUpdate => "TableDataUpdate" (GenericConfig),
    TableDataQuery => "TableDataQuery" (GenericConfig),
    TableSql => "TableSQL" (GenericConfig),
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl NodeKind {
    /// Branch uuids with their targets, in declaration order
    ///
    /// QA nodes only branch in SELECT mode.
    pub fn branches(&self) -> Vec<(&str, &[NodeId])> {
        match self {
            NodeKind::Condition(c) => c
                .condition_branch_configs
                .iter()
                .map(|b| (b.uuid.as_str(), b.next_node_ids.as_slice()))
                .collect(),
            NodeKind::IntentRecognition(c) => c
                .intent_configs
                .iter()
                .map(|b| (b.uuid.as_str(), b.next_node_ids.as_slice()))
                .collect(),
            NodeKind::Qa(c) if c.answer_type == Some(AnswerType::Select) => c
                .options
                .iter()
                .map(|o| (o.uuid.as_str(), o.next_node_ids.as_slice()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Whether this kind routes only through its branches
    pub fn routes_by_branch(&self) -> bool {
        match self {
            NodeKind::Condition(_) | NodeKind::IntentRecognition(_) => true,
            NodeKind::Qa(c) => c.answer_type == Some(AnswerType::Select),
            _ => false,
        }
    }

    /// Targets of the branch with the given uuid
    pub fn branch_mut(&mut self, uuid: &str) -> Option<&mut Vec<NodeId>> {
        match self {
            NodeKind::Condition(c) => c
                .condition_branch_configs
                .iter_mut()
                .find(|b| b.uuid == uuid)
                .map(|b| &mut b.next_node_ids),
            NodeKind::IntentRecognition(c) => c
                .intent_configs
                .iter_mut()
                .find(|b| b.uuid == uuid)
                .map(|b| &mut b.next_node_ids),
            NodeKind::Qa(c) if c.answer_type == Some(AnswerType::Select) => c
                .options
                .iter_mut()
                .find(|o| o.uuid == uuid)
                .map(|o| &mut o.next_node_ids),
            _ => None,
        }
    }

    /// Every branch target list
    pub fn branch_targets_mut(&mut self) -> Vec<&mut Vec<NodeId>> {
        match self {
            NodeKind::Condition(c) => c
                .condition_branch_configs
                .iter_mut()
                .map(|b| &mut b.next_node_ids)
                .collect(),
            NodeKind::IntentRecognition(c) => c
                .intent_configs
                .iter_mut()
                .map(|b| &mut b.next_node_ids)
                .collect(),
            NodeKind::Qa(c) => c.options.iter_mut().map(|o| &mut o.next_node_ids).collect(),
            _ => Vec::new(),
        }
    }
}

/// Fields shared by every node config
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonConfig {
    /// Canvas geometry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<Extension>,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub input_args: Vec<Argument>,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub output_args: Vec<Argument>,

    /// Exception handling, including the exception flow targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_handle_config: Option<ExceptionHandleConfig>,

    /// Backend fields this crate does not model
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Canvas geometry of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

/// What a node does when it fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExceptionHandleType {
    #[default]
    Interrupt,
    SpecificContent,
    ExecuteExceptionFlow,
}

/// Exception handling config of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionHandleConfig {
    #[serde(default)]
    pub exception_handle_type: ExceptionHandleType,

    /// Timeout in seconds
    #[serde(default = "default_exception_timeout")]
    pub timeout: u64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub retry_count: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_content: Option<String>,

    /// Exception flow targets
    #[serde(default, deserialize_with = "null_as_default")]
    pub exception_handle_node_ids: Vec<NodeId>,
}

impl Default for ExceptionHandleConfig {
    fn default() -> Self {
        Self {
            exception_handle_type: ExceptionHandleType::Interrupt,
            timeout: DEFAULT_EXCEPTION_TIMEOUT,
            retry_count: 0,
            specific_content: None,
            exception_handle_node_ids: Vec::new(),
        }
    }
}

fn default_exception_timeout() -> u64 {
    DEFAULT_EXCEPTION_TIMEOUT
}

/// How an argument gets its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindValueType {
    Input,
    Reference,
}

/// Input or output argument of a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Argument {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub require: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub system_variable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_value_type: Option<BindValueType>,

    /// Literal value, or `nodeId.path` for references
    #[serde(default, deserialize_with = "null_as_default")]
    pub bind_value: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Argument {
    /// Node id named by a `nodeId.path` reference
    pub fn referenced_node(&self) -> Option<NodeId> {
        if self.bind_value_type != Some(BindValueType::Reference) {
            return None;
        }
        self.bind_value.split('.').next()?.parse().ok()
    }
}

/// Config for kinds with no required fields of their own
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericConfig {
    #[serde(flatten)]
    pub common: CommonConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReturnType {
    Variable,
    Text,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<ReturnType>,

    #[serde(flatten)]
    pub common: CommonConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_prompt: Option<String>,

    #[serde(flatten)]
    pub common: CommonConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeLanguage {
    #[serde(rename = "JavaScript")]
    JavaScript,
    #[serde(rename = "Python")]
    Python,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_language: Option<CodeLanguage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_java_script: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_python: Option<String>,

    #[serde(flatten)]
    pub common: CommonConfig,
}

impl CodeConfig {
    /// Source for the selected language (JavaScript when unset)
    pub fn source(&self) -> Option<&str> {
        match self.code_language {
            Some(CodeLanguage::Python) => self.code_python.as_deref(),
            _ => self.code_java_script.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopConfig {
    /// e.g. `ARRAY_LOOP`, `SPECIFY_TIMES_LOOP`, `INFINITE_LOOP`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_times: Option<u32>,

    #[serde(flatten)]
    pub common: CommonConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BranchType {
    If,
    ElseIf,
    Else,
}

/// One branch of a Condition node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionBranch {
    pub uuid: String,

    pub branch_type: BranchType,

    /// `AND` / `OR`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_type: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub condition_args: Vec<Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub next_node_ids: Vec<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionConfig {
    #[serde(default, deserialize_with = "null_as_default")]
    pub condition_branch_configs: Vec<ConditionBranch>,

    #[serde(flatten)]
    pub common: CommonConfig,
}

/// One intent of an IntentRecognition node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentBranch {
    pub uuid: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub intent: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_type: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub next_node_ids: Vec<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentConfig {
    #[serde(default, deserialize_with = "null_as_default")]
    pub intent_configs: Vec<IntentBranch>,

    #[serde(flatten)]
    pub common: CommonConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnswerType {
    Text,
    Select,
}

/// One option of a QA node in SELECT mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaOption {
    pub uuid: String,

    #[serde(default)]
    pub index: u32,

    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub next_node_ids: Vec<NodeId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_type: Option<AnswerType>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub options: Vec<QaOption>,

    #[serde(flatten)]
    pub common: CommonConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequestConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(flatten)]
    pub common: CommonConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeConfig {
    #[serde(default, deserialize_with = "null_as_default")]
    pub knowledge_base_configs: Vec<Value>,

    #[serde(flatten)]
    pub common: CommonConfig,
}
