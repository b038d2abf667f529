//! Graph store unit tests

use nuwax_editor::app::options::HistoryOptions;
use nuwax_editor::errors::EditorError;
use nuwax_editor::graph::{GraphOp, GraphStore, Location, NodePatch};
use nuwax_editor::models::{Edge, Extension, WorkflowData};
use tokio_test::{assert_err, assert_ok};

use crate::fixtures::{code, end, inner, looped, start, variable};

#[test]
fn test_add_and_lookup() {
    let mut store = GraphStore::default();
    assert_eq!(assert_ok!(store.add_node(start(1))), 1);
    assert_eq!(assert_ok!(store.add_node(code(2))), 2);

    assert!(store.is_dirty());
    assert_eq!(store.get_node_by_id(2).unwrap().name, "code2");
    assert_eq!(store.location(2), Some(Location::Top(1)));
    assert!(store.get_node_by_id(99).is_none());
}

#[test]
fn test_duplicate_id_rejected() {
    let mut store = GraphStore::default();
    store.add_node(start(1)).unwrap();

    let err = assert_err!(store.add_node(code(1)));
    assert!(matches!(err, EditorError::DuplicateNode(1)));
    assert_eq!(store.data().node_list.len(), 1);
}

#[test]
fn test_add_node_materializes_its_edges() {
    let mut store = GraphStore::default();
    store.add_node(end(2)).unwrap();
    let mut first = start(1);
    first.next_node_ids = vec![2];
    store.add_node(first).unwrap();

    assert_eq!(store.data().edge_list, vec![Edge::normal(1, 2)]);
}

#[test]
fn test_update_node_merges_fields() {
    let mut store = GraphStore::default();
    store.add_node(code(1)).unwrap();

    let geometry = Extension {
        x: Some(10.0),
        y: Some(20.0),
        ..Default::default()
    };
    store
        .update_node(1, NodePatch::default().name("Transform").extension(geometry))
        .unwrap();

    let node = store.get_node_by_id(1).unwrap();
    assert_eq!(node.name, "Transform");
    assert_eq!(node.extension(), Some(&geometry));
}

#[test]
fn test_update_missing_node() {
    let mut store = GraphStore::default();
    let err = assert_err!(store.update_node(5, NodePatch::default().name("x")));
    assert!(matches!(err, EditorError::NodeNotFound(5)));
    assert!(!store.is_dirty());
}

#[test]
fn test_delete_node_cascades() {
    let mut store = GraphStore::default();
    store.add_node(start(1)).unwrap();
    store.add_node(code(2)).unwrap();
    store.add_node(end(3)).unwrap();
    store.add_edge(Edge::normal(1, 2)).unwrap();
    store.add_edge(Edge::exception(1, 3)).unwrap();
    store.add_edge(Edge::normal(2, 3)).unwrap();

    store.delete_node(3).unwrap();

    assert!(store.get_node_by_id(3).is_none());
    assert_eq!(store.data().edge_list, vec![Edge::normal(1, 2)]);
    assert!(store.get_node_by_id(1).unwrap().exception_targets().is_empty());
    assert!(store.get_node_by_id(2).unwrap().next_node_ids.is_empty());
}

#[test]
fn test_add_then_delete_restores_graph() {
    let mut store = GraphStore::default();
    store.add_node(start(1)).unwrap();
    store.add_node(code(2)).unwrap();
    store.add_node(end(3)).unwrap();
    store.add_edge(Edge::normal(1, 2)).unwrap();
    store.add_edge(Edge::normal(2, 3)).unwrap();
    let nodes = store.data().node_list.clone();
    let edges = store.data().edge_list.clone();

    let mut extra = code(4);
    extra.next_node_ids = vec![3];
    extra.exception_config_mut().exception_handle_node_ids = vec![2];
    store.add_node(extra).unwrap();
    assert_eq!(store.data().edge_list.len(), edges.len() + 2);

    store.delete_node(4).unwrap();
    assert_eq!(store.data().node_list, nodes);
    assert_eq!(store.data().edge_list, edges);
    assert!(store.get_node_by_id(4).is_none());
}

#[test]
fn test_delete_loop_removes_body() {
    let mut store = GraphStore::default();
    store.add_node(start(1)).unwrap();
    store.add_node(looped(2)).unwrap();
    store.add_node(inner(variable(3), 2)).unwrap();
    store.add_edge(Edge::normal(1, 2)).unwrap();
    store.add_edge(Edge::normal(2, 3)).unwrap();

    store.delete_node(2).unwrap();

    assert!(store.get_node_by_id(3).is_none());
    assert!(store.data().edge_list.is_empty());
    assert!(store.get_node_by_id(1).unwrap().next_node_ids.is_empty());
}

#[test]
fn test_nested_loop_rejected() {
    let mut store = GraphStore::default();
    store.add_node(looped(1)).unwrap();

    let err = assert_err!(store.add_node(inner(looped(2), 1)));
    assert!(matches!(err, EditorError::InvalidNode(_)));
    assert!(store.get_node_by_id(1).unwrap().inner_nodes.is_empty());
}

#[test]
fn test_get_edges_by_node_id() {
    let mut store = GraphStore::default();
    store.add_node(start(1)).unwrap();
    store.add_node(code(2)).unwrap();
    store.add_node(end(3)).unwrap();
    store.add_edge(Edge::normal(1, 2)).unwrap();
    store.add_edge(Edge::normal(2, 3)).unwrap();

    assert_eq!(store.get_edges_by_node_id(2).len(), 2);
    assert_eq!(store.get_edges_by_node_id(3), vec![Edge::normal(2, 3)]);
}

#[test]
fn test_batch_is_all_or_nothing() {
    let mut store = GraphStore::default();
    store.add_node(start(1)).unwrap();
    let before = store.data().clone();

    let err = assert_err!(store.batch_update(vec![
        GraphOp::AddNode(code(2)),
        GraphOp::AddEdge(Edge::normal(1, 2)),
        GraphOp::AddEdge(Edge::normal(2, 9)),
    ]));
    assert!(matches!(err, EditorError::NodeNotFound(9)));
    assert_eq!(store.data(), &before);
    assert_eq!(store.history().undo_len(), 1);
}

#[test]
fn test_batch_is_one_undo_step() {
    let mut store = GraphStore::default();
    store.add_node(start(1)).unwrap();

    store
        .batch_update(vec![
            GraphOp::AddNode(code(2)),
            GraphOp::AddNode(end(3)),
            GraphOp::AddEdge(Edge::normal(1, 2)),
            GraphOp::AddEdge(Edge::normal(2, 3)),
        ])
        .unwrap();
    assert_eq!(store.data().node_list.len(), 3);

    assert!(store.undo());
    assert_eq!(store.data().node_list.len(), 1);
    assert!(store.data().edge_list.is_empty());
}

#[test]
fn test_reset_clears_dirty_and_history() {
    let mut store = GraphStore::default();
    store.add_node(code(1)).unwrap();
    assert!(store.can_undo());

    let mut lp = looped(5);
    lp.inner_nodes.push(variable(6));
    store.reset(WorkflowData::new(vec![start(1), lp], Vec::new()));

    assert!(!store.is_dirty());
    assert!(!store.can_undo());
    // Body nodes learn their loop on load
    assert_eq!(store.get_node_by_id(6).unwrap().loop_node_id, Some(5));
}

#[test]
fn test_mark_saved_checks_digest() {
    let mut store = GraphStore::new(HistoryOptions::default());
    store.add_node(code(1)).unwrap();
    let digest = store.digest().unwrap();

    store.add_node(code(2)).unwrap();
    assert!(!store.mark_saved("v1".to_string(), &digest).unwrap());
    assert!(store.is_dirty());
    assert_eq!(store.last_saved_version(), "v1");

    let digest = store.digest().unwrap();
    assert!(store.mark_saved("v2".to_string(), &digest).unwrap());
    assert!(!store.is_dirty());
}
