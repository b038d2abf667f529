//! Editor facade tests

use std::sync::Arc;

use nuwax_editor::app::{EditorOptions, WorkflowEditor};
use nuwax_editor::errors::EditorError;
use nuwax_editor::graph::NodePatch;
use nuwax_editor::models::{Edge, Node};
use nuwax_editor::persist::SaveCallbacks;
use openapi_client::WorkflowDetails;

use crate::fixtures::{code, end, looped, start, variable, MockBackend, RecordingSleeper};

fn details() -> WorkflowDetails<Node> {
    let mut first = start(1);
    first.next_node_ids = vec![2];
    let mut body = looped(2);
    let mut step = variable(3);
    step.next_node_ids = vec![2];
    body.inner_nodes.push(step);
    body.inner_start_node_id = Some(3);
    body.inner_end_node_id = Some(3);
    body.next_node_ids = vec![4];
    let last = end(4);

    WorkflowDetails {
        id: 7,
        name: "digest".to_string(),
        description: Some("daily digest".to_string()),
        space_id: 3,
        icon: None,
        nodes: vec![body],
        start_node: Some(first),
        end_node: Some(last),
        extension: None,
        category: None,
        version: Some("v10".to_string()),
        modified: None,
        publish_status: None,
    }
}

fn editor(backend: Arc<MockBackend>) -> WorkflowEditor {
    let options = EditorOptions {
        workflow_id: 7,
        ..Default::default()
    };
    WorkflowEditor::new(
        options,
        backend,
        RecordingSleeper::new(),
        SaveCallbacks::default(),
    )
}

#[tokio::test]
async fn test_refresh_loads_graph() {
    let editor = editor(MockBackend::with_details(details()));

    editor.refresh_data().await.unwrap();

    assert!(!editor.is_loading());
    assert!(!editor.is_dirty());
    assert!(!editor.can_undo());
    let data = editor.workflow_data();
    let ids: Vec<_> = data.node_list.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![1, 2, 4]);
    assert_eq!(data.last_saved_version, "v10");
    assert_eq!(data.metadata.as_ref().map(|m| m.name.as_str()), Some("digest"));

    // Body nodes are indexed and know their loop
    assert_eq!(editor.get_node_by_id(3).unwrap().loop_node_id, Some(2));
    let mut edges = editor.get_edges_by_node_id(2);
    edges.sort_by(|a, b| a.source.cmp(&b.source).then(a.target.cmp(&b.target)));
    assert_eq!(
        edges,
        vec![
            Edge::normal(1, 2),
            Edge::normal(2, 3),
            Edge::normal(2, 4),
            Edge::normal(3, 2),
        ]
    );
}

#[tokio::test]
async fn test_refresh_failure_keeps_graph() {
    let editor = editor(MockBackend::new());
    editor.add_node(code(1)).unwrap();

    let err = editor.refresh_data().await.unwrap_err();
    assert!(matches!(err, EditorError::ApiError { .. }));
    assert!(!editor.is_loading());
    assert!(editor.get_node_by_id(1).is_some());
    assert!(editor.is_dirty());
}

#[tokio::test]
async fn test_edit_save_round_trip() {
    let backend = MockBackend::with_details(details());
    let editor = editor(backend.clone());
    editor.refresh_data().await.unwrap();

    let id = editor.add_node(code(0)).unwrap();
    assert_eq!(id, 5);
    editor.delete_edge("2", "4", "2-out", "4-in").unwrap();
    editor.add_edge(Edge::normal(2, id)).unwrap();
    editor.add_edge(Edge::normal(id, 4)).unwrap();
    editor
        .update_node(id, NodePatch::default().name("Summarize"))
        .unwrap();
    assert!(editor.is_dirty());

    assert!(editor.save_now().await);
    assert!(!editor.is_dirty());

    let saved = backend.saved();
    let config = &saved[0].workflow_config;
    assert_eq!(config.id, 7);
    assert_eq!(config.name, "digest");
    assert_eq!(config.space_id, 3);
    assert_eq!(config.nodes, editor.workflow_data().node_list);

    // A reload of what was saved gives back the same edges
    let reloaded = WorkflowDetails {
        nodes: config.nodes.clone(),
        ..details()
    };
    let again = self::editor(MockBackend::with_details(reloaded));
    again.refresh_data().await.unwrap();
    let mut before = editor.workflow_data().edge_list;
    let mut after = again.workflow_data().edge_list;
    before.sort_by(|a, b| a.source_port.cmp(&b.source_port).then(a.target.cmp(&b.target)));
    after.sort_by(|a, b| a.source_port.cmp(&b.source_port).then(a.target.cmp(&b.target)));
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_undo_redo_through_editor() {
    let editor = editor(MockBackend::new());
    editor.add_node(start(1)).unwrap();
    editor.add_node(end(2)).unwrap();
    editor.add_edge(Edge::normal(1, 2)).unwrap();

    assert!(editor.undo());
    assert!(editor.get_edges_by_node_id(1).is_empty());
    assert!(editor.can_redo());
    assert!(editor.redo());
    assert_eq!(editor.get_node_by_id(1).unwrap().next_node_ids, vec![2]);
}

#[tokio::test]
async fn test_clear_and_validate() {
    let editor = editor(MockBackend::with_details(details()));
    editor.refresh_data().await.unwrap();
    assert!(editor.workflow_data().node_list.len() > 1);

    editor.clear();
    assert!(editor.workflow_data().node_list.is_empty());
    assert!(!editor.is_dirty());
    assert!(!editor.validate().valid);
}

#[test]
fn test_connect_rejects_bad_url() {
    let options = EditorOptions {
        backend_base_url: "not a url".to_string(),
        ..Default::default()
    };
    let result = WorkflowEditor::connect(options, SaveCallbacks::default());
    assert!(matches!(result, Err(EditorError::ConfigError(_))));
}
