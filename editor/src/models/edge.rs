//! Edge model and port classification

use serde::{Deserialize, Serialize};

use super::node::Node;
use super::NodeId;

/// Marker a source port carries when it starts an exception edge
pub const EXCEPTION_PORT_MARKER: &str = "exception";

/// A directed connection between two node ports
///
/// Ids are string-encoded on the wire. Identity is the
/// `(source, target, sourcePort, targetPort)` quadruple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub source_port: String,
    #[serde(default)]
    pub target_port: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
}

impl Edge {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        source_port: impl Into<String>,
        target_port: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            source_port: source_port.into(),
            target_port: target_port.into(),
            z_index: None,
        }
    }

    /// Normal flow edge `{s}-out` -> `{t}-in`
    pub fn normal(source: NodeId, target: NodeId) -> Self {
        Self::new(
            source.to_string(),
            target.to_string(),
            format!("{}-out", source),
            in_port(target),
        )
    }

    /// Exception flow edge `{s}-exception` -> `{t}-in`
    pub fn exception(source: NodeId, target: NodeId) -> Self {
        Self::new(
            source.to_string(),
            target.to_string(),
            format!("{}-{}", source, EXCEPTION_PORT_MARKER),
            in_port(target),
        )
    }

    /// Branch edge `{uuid}-out` -> `{t}-in`
    pub fn branch(source: NodeId, uuid: &str, target: NodeId) -> Self {
        Self::new(
            source.to_string(),
            target.to_string(),
            format!("{}-out", uuid),
            in_port(target),
        )
    }

    /// Same quadruple, ignoring z-index
    pub fn same_link(&self, other: &Edge) -> bool {
        self.matches(
            &other.source,
            &other.target,
            &other.source_port,
            &other.target_port,
        )
    }

    pub fn matches(&self, source: &str, target: &str, source_port: &str, target_port: &str) -> bool {
        self.source == source
            && self.target == target
            && self.source_port == source_port
            && self.target_port == target_port
    }

    pub fn source_id(&self) -> Option<NodeId> {
        self.source.trim().parse().ok()
    }

    pub fn target_id(&self) -> Option<NodeId> {
        self.target.trim().parse().ok()
    }

    /// Whether either end is the given node
    pub fn touches(&self, id: NodeId) -> bool {
        self.source_id() == Some(id) || self.target_id() == Some(id)
    }
}

fn in_port(target: NodeId) -> String {
    format!("{}-in", target)
}

/// Which adjacency field a source port maps to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PortKind {
    /// `nextNodeIds`
    Normal,
    /// `exceptionHandleConfig.exceptionHandleNodeIds`
    Exception,
    /// `nextNodeIds` of the branch with this uuid
    Branch(String),
}

/// Classify a source port against the node that owns it
pub fn classify_port(source_port: &str, source: &Node) -> PortKind {
    if source_port.contains(EXCEPTION_PORT_MARKER) {
        return PortKind::Exception;
    }
    let Some(stem) = source_port.strip_suffix("-out") else {
        return PortKind::Normal;
    };
    let prefix = format!("{}-", source.id);
    for (uuid, _) in source.kind.branches() {
        if stem == uuid || stem.strip_prefix(&prefix) == Some(uuid) {
            return PortKind::Branch(uuid.to_string());
        }
    }
    PortKind::Normal
}
