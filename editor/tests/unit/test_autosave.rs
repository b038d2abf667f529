//! Autosave worker tests, on a paused clock

use std::sync::Arc;
use std::time::Duration;

use nuwax_editor::app::{AutoSaveOptions, EditorOptions, WorkflowEditor};
use nuwax_editor::graph::NodePatch;
use nuwax_editor::models::WorkflowData;
use nuwax_editor::persist::SaveCallbacks;
use tokio::time::sleep;

use crate::fixtures::{code, MockBackend, RecordingSleeper};

fn editor(backend: Arc<MockBackend>, enabled: bool) -> WorkflowEditor {
    let options = EditorOptions {
        workflow_id: 1,
        autosave: AutoSaveOptions {
            enabled,
            debounce: Duration::from_secs(2),
            throttle: Duration::from_secs(10),
            ..Default::default()
        },
        ..Default::default()
    };
    WorkflowEditor::new(
        options,
        backend,
        RecordingSleeper::new(),
        SaveCallbacks::default(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_structural_edits_are_throttled() {
    let backend = MockBackend::new();
    let editor = editor(backend.clone(), true);
    editor.start_autosave();

    editor.add_node(code(1)).unwrap();
    sleep(Duration::from_secs(6)).await;
    // Later additions do not push the save back
    editor.add_node(code(2)).unwrap();
    sleep(Duration::from_secs(3)).await;
    assert_eq!(backend.save_calls(), 0);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(backend.save_calls(), 1);
    assert!(!editor.is_dirty());

    editor.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_updates_are_debounced() {
    let backend = MockBackend::new();
    let editor = editor(backend.clone(), true);
    editor.reset(WorkflowData::new(vec![code(1)], Vec::new()));
    editor.start_autosave();

    editor
        .update_node(1, NodePatch::default().name("a"))
        .unwrap();
    sleep(Duration::from_millis(1500)).await;
    editor
        .update_node(1, NodePatch::default().name("b"))
        .unwrap();
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(backend.save_calls(), 0);

    sleep(Duration::from_secs(1)).await;
    assert_eq!(backend.save_calls(), 1);
    assert_eq!(backend.saved()[0].workflow_config.nodes[0].name, "b");

    editor.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_disabled_autosave_never_saves() {
    let backend = MockBackend::new();
    let editor = editor(backend.clone(), false);
    editor.start_autosave();

    editor.add_node(code(1)).unwrap();
    sleep(Duration::from_secs(60)).await;

    assert_eq!(backend.save_calls(), 0);
    assert!(editor.is_dirty());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_worker() {
    let backend = MockBackend::new();
    let editor = editor(backend.clone(), true);
    editor.start_autosave();

    editor.shutdown().await;
    editor.add_node(code(1)).unwrap();
    sleep(Duration::from_secs(60)).await;

    assert_eq!(backend.save_calls(), 0);
}
