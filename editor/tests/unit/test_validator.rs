//! Validator tests

use nuwax_editor::graph::GraphStore;
use nuwax_editor::models::{
    Argument, BindValueType, CodeConfig, Edge, EndConfig, Node, NodeKind, ReturnType, WorkflowData,
};
use nuwax_editor::validate::{
    to_api_results, validate_node, validate_workflow, ErrorCode, Severity,
};

use crate::fixtures::{code, end, start, variable};

fn script(id: i64) -> Node {
    Node::new(
        id,
        format!("script{}", id),
        NodeKind::Code(CodeConfig {
            code_java_script: Some("return { ok: true };".to_string()),
            ..Default::default()
        }),
    )
}

fn finish(id: i64) -> Node {
    Node::new(
        id,
        "End",
        NodeKind::End(EndConfig {
            return_type: Some(ReturnType::Variable),
            ..Default::default()
        }),
    )
}

/// Start -> script -> End
fn linear() -> GraphStore {
    let mut store = GraphStore::default();
    store.add_node(start(1)).unwrap();
    store.add_node(script(2)).unwrap();
    store.add_node(finish(3)).unwrap();
    store.add_edge(Edge::normal(1, 2)).unwrap();
    store.add_edge(Edge::normal(2, 3)).unwrap();
    store
}

fn codes(data: &WorkflowData) -> Vec<ErrorCode> {
    validate_workflow(data).errors.iter().map(|e| e.code).collect()
}

#[test]
fn test_empty_workflow_is_invalid() {
    let report = validate_workflow(&WorkflowData::default());

    assert!(!report.valid);
    assert!(report
        .errors
        .iter()
        .any(|e| e.code == ErrorCode::MissingStart && e.message.contains("Start")));
}

#[test]
fn test_linear_workflow_is_valid() {
    let store = linear();
    let report = validate_workflow(store.data());
    assert!(report.valid, "unexpected findings: {:?}", report.errors);
    assert!(report.errors.is_empty());
}

#[test]
fn test_validation_is_pure_and_repeatable() {
    let mut store = linear();
    store.add_node(variable(4)).unwrap();
    let before = store.data().clone();

    let first = validate_workflow(store.data());
    let second = validate_workflow(store.data());

    assert_eq!(first, second);
    assert_eq!(store.data(), &before);
}

#[test]
fn test_unreachable_node() {
    let mut store = linear();
    store.add_node(script(4)).unwrap();

    let report = validate_workflow(store.data());
    assert!(!report.valid);
    let found: Vec<_> = report.for_node(4).map(|e| e.code).collect();
    assert!(found.contains(&ErrorCode::Unreachable));
}

#[test]
fn test_exception_only_node_is_a_warning() {
    let mut store = linear();
    store.add_node(script(4)).unwrap();
    store.add_edge(Edge::exception(2, 4)).unwrap();
    store.add_edge(Edge::normal(4, 3)).unwrap();

    let report = validate_workflow(store.data());
    let finding = report
        .for_node(4)
        .find(|e| e.code == ErrorCode::ExceptionOnly)
        .expect("exception-only finding");
    assert_eq!(finding.severity, Severity::Warning);
    assert!(report.valid);
}

#[test]
fn test_cycle_detected() {
    let mut store = linear();
    store.add_node(script(4)).unwrap();
    store.add_edge(Edge::normal(2, 4)).unwrap();
    store.add_edge(Edge::normal(4, 2)).unwrap();

    assert!(codes(store.data()).contains(&ErrorCode::Cycle));
}

#[test]
fn test_end_must_be_reachable() {
    let mut store = GraphStore::default();
    store.add_node(start(1)).unwrap();
    store.add_node(script(2)).unwrap();
    store.add_node(finish(3)).unwrap();
    store.add_edge(Edge::normal(1, 2)).unwrap();

    assert!(codes(store.data()).contains(&ErrorCode::EndUnreachable));
}

#[test]
fn test_dangling_and_out_of_sync_adjacency() {
    let store = linear();
    let mut data = store.data().clone();
    // Adjacency without an edge, pointing at a node that does not exist
    data.node_list[1].next_node_ids.push(9);
    // Adjacency without an edge between existing nodes
    data.node_list[0].next_node_ids.push(3);

    let found = codes(&data);
    assert!(found.contains(&ErrorCode::DanglingReference));
    assert!(found.contains(&ErrorCode::EdgeMismatch));
}

#[test]
fn test_duplicate_targets() {
    let store = linear();
    let mut data = store.data().clone();
    data.node_list[0].next_node_ids.push(2);

    let report = validate_workflow(&data);
    let dup = report
        .for_node(1)
        .find(|e| e.code == ErrorCode::DuplicateTarget)
        .expect("duplicate target finding");
    assert_eq!(dup.field.as_deref(), Some("nextNodeIds"));
}

#[test]
fn test_required_fields() {
    let found: Vec<_> = validate_node(&code(5)).into_iter().map(|e| e.code).collect();
    assert_eq!(found, vec![ErrorCode::MissingField]);

    let found = validate_node(&end(6));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].field.as_deref(), Some("returnType"));

    assert!(validate_node(&script(7)).is_empty());
}

#[test]
fn test_reference_must_name_existing_node() {
    let mut store = linear();
    let mut data = store.data().clone();
    data.node_list[1].kind.common_mut().input_args.push(Argument {
        name: "input".into(),
        bind_value_type: Some(BindValueType::Reference),
        bind_value: "42.output".into(),
        ..Default::default()
    });
    store.reset(data);

    let report = validate_workflow(store.data());
    assert!(report
        .for_node(2)
        .any(|e| e.code == ErrorCode::InvalidReference));
}

#[test]
fn test_api_results_group_by_node() {
    let mut store = linear();
    store.add_node(code(4)).unwrap();

    let results = to_api_results(&validate_workflow(store.data()));
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].node_id, 4);
    assert!(!results[0].success);
    assert!(results[0].messages.len() >= 2);
}
