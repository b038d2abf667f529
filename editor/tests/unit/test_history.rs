//! Undo/redo tests

use nuwax_editor::app::options::HistoryOptions;
use nuwax_editor::graph::{GraphStore, NodePatch};
use nuwax_editor::history::HistoryAction;
use nuwax_editor::models::Edge;

use crate::fixtures::{code, start};

#[test]
fn test_undo_then_redo_round_trips() {
    let mut store = GraphStore::default();
    store.add_node(start(1)).unwrap();
    store.add_node(code(2)).unwrap();
    let after_second = store.data().node_list.clone();

    assert!(store.undo());
    assert_eq!(store.data().node_list.len(), 1);
    assert!(store.can_redo());

    assert!(store.redo());
    assert_eq!(store.data().node_list, after_second);
    assert!(!store.can_redo());
}

#[test]
fn test_new_mutation_clears_redo() {
    let mut store = GraphStore::default();
    store.add_node(start(1)).unwrap();
    store.add_node(code(2)).unwrap();
    store.undo();
    assert!(store.can_redo());

    store.update_node(1, NodePatch::default().name("Begin")).unwrap();
    assert!(!store.can_redo());
    assert!(!store.redo());
}

#[test]
fn test_undo_on_empty_history() {
    let mut store = GraphStore::default();
    assert!(!store.can_undo());
    assert!(!store.undo());
    assert!(!store.is_dirty());
}

#[test]
fn test_undo_marks_dirty() {
    let mut store = GraphStore::default();
    store.add_node(start(1)).unwrap();
    let digest = store.digest().unwrap();
    store.mark_saved("v1".to_string(), &digest).unwrap();
    assert!(!store.is_dirty());

    store.undo();
    assert!(store.is_dirty());
}

#[test]
fn test_stack_is_bounded() {
    let mut store = GraphStore::new(HistoryOptions {
        enabled: true,
        stack_size: 3,
    });
    for id in 1..=5 {
        store.add_node(code(id)).unwrap();
    }
    assert_eq!(store.history().undo_len(), 3);

    while store.undo() {}
    // The two oldest additions fell off the stack
    assert_eq!(store.data().node_list.len(), 2);
}

#[test]
fn test_disabled_history_records_nothing() {
    let mut store = GraphStore::new(HistoryOptions {
        enabled: false,
        stack_size: 50,
    });
    store.add_node(code(1)).unwrap();

    assert!(store.is_dirty());
    assert!(!store.can_undo());
}

#[test]
fn test_entries_name_their_action() {
    let mut store = GraphStore::default();
    store.add_node(start(1)).unwrap();
    store.add_node(code(2)).unwrap();
    store.add_edge(Edge::normal(1, 2)).unwrap();

    let entry = store.history().last_entry().unwrap();
    assert_eq!(
        entry.action,
        HistoryAction::AddEdge {
            source: "1".to_string(),
            target: "2".to_string(),
        }
    );
    assert!(entry.before.edges.is_empty());
    assert_eq!(entry.after.edges.len(), 1);
}
