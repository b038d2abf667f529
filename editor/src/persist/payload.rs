//! Mapping between the aggregate and backend payloads

use openapi_client::{SaveWorkflowRequest, WorkflowConfig, WorkflowDetails};

use crate::graph::edges_from_nodes;
use crate::models::{Node, WorkflowData, WorkflowId, WorkflowMetadata};

use super::backend::SavePayload;

/// Build the full-save body from the current graph
///
/// A workflow without Start or End is still saved; those fields are left
/// empty.
pub fn build_save_request(data: &WorkflowData, workflow_id: WorkflowId) -> SavePayload {
    let meta = data.metadata.clone().unwrap_or_default();
    let start = data.start_node().cloned();
    let end = data.end_node().cloned();

    let input_args = start
        .as_ref()
        .map(|n| n.kind.common().input_args.clone())
        .unwrap_or_default();
    let output_args = end
        .as_ref()
        .map(|n| n.kind.common().output_args.clone())
        .unwrap_or_default();

    SaveWorkflowRequest {
        workflow_config: WorkflowConfig {
            id: workflow_id,
            space_id: meta.space_id,
            name: meta.name,
            function_name: None,
            description: meta.description,
            icon: meta.icon.unwrap_or_default(),
            start_node: start,
            end_node: end,
            input_args,
            output_args,
            nodes: data.node_list.clone(),
            extension: meta.extension,
            category: meta.category,
            version: meta.version,
        },
    }
}

/// Hydrate an aggregate from loaded details
///
/// Start and End are added to the node list when the backend only sent them
/// separately. The edge list is rebuilt from adjacency fields.
pub fn workflow_from_details(details: WorkflowDetails<Node>) -> WorkflowData {
    let mut nodes = details.nodes;
    if let Some(start) = details.start_node {
        if !nodes.iter().any(|n| n.id == start.id) {
            nodes.insert(0, start);
        }
    }
    if let Some(end) = details.end_node {
        if !nodes.iter().any(|n| n.id == end.id) {
            nodes.push(end);
        }
    }

    let metadata = WorkflowMetadata {
        id: details.id,
        name: details.name,
        description: details.description,
        space_id: details.space_id,
        icon: details.icon,
        extension: details.extension,
        category: details.category,
        version: details.version.clone(),
        publish_status: details.publish_status,
        modified: details.modified,
    };

    let mut data = WorkflowData::new(nodes, Vec::new());
    data.normalize_loops();
    data.edge_list = edges_from_nodes(&data.node_list);
    data.last_saved_version = details.version.unwrap_or_default();
    data.metadata = Some(metadata);
    data
}
