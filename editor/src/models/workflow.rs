//! Workflow aggregate root

use openapi_client::WorkflowExtension;
use serde::{Deserialize, Serialize};

use crate::errors::EditorError;
use crate::utils::sha256_hex;

use super::edge::Edge;
use super::node::{Node, NodeType};
use super::{NodeId, WorkflowId};

/// Workflow-level fields loaded with the graph and echoed back on save
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowMetadata {
    pub id: WorkflowId,
    pub name: String,
    pub description: Option<String>,
    pub space_id: i64,
    pub icon: Option<String>,
    pub extension: Option<WorkflowExtension>,
    pub category: Option<String>,
    pub version: Option<String>,
    pub publish_status: Option<String>,
    pub modified: Option<String>,
}

/// The workflow graph and its save status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowData {
    /// Top-level nodes; loop bodies live in `Node::inner_nodes`
    pub node_list: Vec<Node>,

    pub edge_list: Vec<Edge>,

    /// Version token from the last confirmed save
    #[serde(default)]
    pub last_saved_version: String,

    /// Unsaved changes exist
    #[serde(default)]
    pub is_dirty: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<WorkflowMetadata>,
}

impl WorkflowData {
    pub fn new(node_list: Vec<Node>, edge_list: Vec<Edge>) -> Self {
        Self {
            node_list,
            edge_list,
            ..Default::default()
        }
    }

    /// Every node, loop bodies included, in list order
    pub fn iter_nodes(&self) -> impl Iterator<Item = &Node> {
        self.node_list
            .iter()
            .flat_map(|n| std::iter::once(n).chain(n.inner_nodes.iter()))
    }

    /// First top-level node of the given kind
    pub fn find_by_type(&self, node_type: NodeType) -> Option<&Node> {
        self.node_list.iter().find(|n| n.node_type() == node_type)
    }

    pub fn start_node(&self) -> Option<&Node> {
        self.find_by_type(NodeType::Start)
    }

    pub fn end_node(&self) -> Option<&Node> {
        self.find_by_type(NodeType::End)
    }

    /// Largest id in use, loop bodies included
    pub fn max_node_id(&self) -> NodeId {
        self.iter_nodes().map(|n| n.id).max().unwrap_or(0)
    }

    /// Point every loop body node at its enclosing loop
    pub fn normalize_loops(&mut self) {
        for node in self.node_list.iter_mut() {
            let id = node.id;
            for inner in node.inner_nodes.iter_mut() {
                inner.loop_node_id = Some(id);
            }
        }
    }

    /// Content digest of the graph, ignoring save status
    pub fn digest(&self) -> Result<String, EditorError> {
        let bytes = serde_json::to_vec(&(&self.node_list, &self.edge_list))?;
        Ok(sha256_hex(&bytes))
    }
}
