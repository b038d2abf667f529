//! Structural checks over the flow graph

use std::collections::{HashMap, HashSet, VecDeque};

use crate::graph::sync::{adjacency_links, edge_link, Link};
use crate::models::{Node, NodeId, NodeType, WorkflowData};

use super::{ErrorCode, Severity, ValidationError};

/// Read-only view of a workflow for traversal
pub struct FlowGraph<'a> {
    data: &'a WorkflowData,
    nodes: HashMap<NodeId, &'a Node>,
    top_ids: HashSet<NodeId>,
    start: Option<&'a Node>,
    /// Reached from Start over normal and branch flow
    reached: HashSet<NodeId>,
    /// Reached from Start when exception flow is followed too
    reached_any: HashSet<NodeId>,
    /// Loop body nodes reached from their loop's start marker
    inner_reached: HashSet<NodeId>,
    /// Targets of back edges in the top-level normal flow
    cycle_entries: HashSet<NodeId>,
}

/// Normal and branch targets of a node
fn flow_targets(node: &Node) -> Vec<NodeId> {
    let mut targets = node.next_node_ids.clone();
    for (_, ids) in node.kind.branches() {
        targets.extend_from_slice(ids);
    }
    targets
}

fn duplicates(ids: &[NodeId]) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    let mut dups = Vec::new();
    for id in ids {
        if !seen.insert(*id) && !dups.contains(id) {
            dups.push(*id);
        }
    }
    dups
}

impl<'a> FlowGraph<'a> {
    pub fn new(data: &'a WorkflowData) -> Self {
        let nodes: HashMap<NodeId, &Node> = data.iter_nodes().map(|n| (n.id, n)).collect();
        let top_ids: HashSet<NodeId> = data.node_list.iter().map(|n| n.id).collect();
        let start = data.start_node();

        let mut graph = Self {
            data,
            nodes,
            top_ids,
            start,
            reached: HashSet::new(),
            reached_any: HashSet::new(),
            inner_reached: HashSet::new(),
            cycle_entries: HashSet::new(),
        };

        if let Some(start) = start {
            graph.reached = graph.walk_top(start.id, false);
            graph.reached_any = graph.walk_top(start.id, true);
        }
        for node in data.node_list.iter().filter(|n| n.is_loop()) {
            let body = graph.walk_body(node);
            graph.inner_reached.extend(body);
        }
        graph.cycle_entries = graph.find_cycles();
        graph
    }

    /// Breadth-first walk over top-level nodes
    fn walk_top(&self, from: NodeId, with_exceptions: bool) -> HashSet<NodeId> {
        let mut seen = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);
        while let Some(id) = queue.pop_front() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            let mut next = flow_targets(node);
            if with_exceptions {
                next.extend_from_slice(node.exception_targets());
            }
            for target in next {
                if self.top_ids.contains(&target) && seen.insert(target) {
                    queue.push_back(target);
                }
            }
        }
        seen
    }

    /// Loop body nodes reachable from the body's start marker
    fn walk_body(&self, lp: &Node) -> HashSet<NodeId> {
        let body: HashSet<NodeId> = lp.inner_nodes.iter().map(|n| n.id).collect();
        let Some(start) = lp.inner_start_node_id.filter(|id| body.contains(id)) else {
            return HashSet::new();
        };
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(id) = queue.pop_front() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            let mut next = flow_targets(node);
            next.extend_from_slice(node.exception_targets());
            for target in next {
                if body.contains(&target) && seen.insert(target) {
                    queue.push_back(target);
                }
            }
        }
        seen
    }

    /// Depth-first search for back edges in the top-level normal flow
    fn find_cycles(&self) -> HashSet<NodeId> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Active,
            Done,
        }

        let mut marks: HashMap<NodeId, Mark> = HashMap::new();
        let mut entries = HashSet::new();
        for root in &self.data.node_list {
            if marks.contains_key(&root.id) {
                continue;
            }
            // Stack of (node, index of next child to visit)
            let mut stack = vec![(root.id, 0usize)];
            marks.insert(root.id, Mark::Active);
            while let Some((id, child)) = stack.pop() {
                let targets: Vec<NodeId> = self
                    .nodes
                    .get(&id)
                    .map(|n| flow_targets(n))
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|t| self.top_ids.contains(t))
                    .collect();
                if child >= targets.len() {
                    marks.insert(id, Mark::Done);
                    continue;
                }
                stack.push((id, child + 1));
                let target = targets[child];
                match marks.get(&target) {
                    Some(Mark::Active) => {
                        entries.insert(target);
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(target, Mark::Active);
                        stack.push((target, 0));
                    }
                }
            }
        }
        entries
    }

    /// Workflow-level checks: Start and End presence and connection
    pub fn check_workflow(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        let starts: Vec<&Node> = self
            .data
            .node_list
            .iter()
            .filter(|n| n.node_type() == NodeType::Start)
            .collect();
        if starts.is_empty() {
            errors.push(ValidationError::workflow(
                ErrorCode::MissingStart,
                "Workflow is missing a Start node",
            ));
        }
        for extra in starts.iter().skip(1) {
            errors.push(ValidationError::for_node(
                extra,
                ErrorCode::MultipleStart,
                "Workflow has more than one Start node",
            ));
        }

        let ends: Vec<&Node> = self
            .data
            .node_list
            .iter()
            .filter(|n| n.node_type() == NodeType::End)
            .collect();
        if ends.is_empty() {
            errors.push(ValidationError::workflow(
                ErrorCode::MissingEnd,
                "Workflow is missing an End node",
            ));
        } else if let Some(start) = self.start {
            if !ends.iter().any(|e| self.reached.contains(&e.id)) {
                errors.push(ValidationError::for_node(
                    start,
                    ErrorCode::EndUnreachable,
                    "No path leads from Start to an End node",
                ));
            }
        }

        errors
    }

    /// Ids a node may point at
    fn scope_of(&self, node: &Node) -> HashSet<NodeId> {
        match node.loop_node_id.and_then(|l| self.nodes.get(&l)) {
            Some(lp) => {
                let mut scope: HashSet<NodeId> = lp.inner_nodes.iter().map(|n| n.id).collect();
                scope.insert(lp.id);
                scope
            }
            None => self.top_ids.clone(),
        }
    }

    fn check_target(
        &self,
        node: &Node,
        field: &str,
        target: NodeId,
        scope: &HashSet<NodeId>,
        errors: &mut Vec<ValidationError>,
    ) {
        let message = if !self.nodes.contains_key(&target) {
            format!("References missing node {}", target)
        } else if !scope.contains(&target) {
            format!("References node {} outside its scope", target)
        } else {
            return;
        };
        errors.push(ValidationError::for_node(node, ErrorCode::DanglingReference, message).field(field));
    }

    /// Reachability and adjacency checks for one node
    pub fn check_node(&self, node: &Node) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let is_inner = node.loop_node_id.is_some();

        // Reachability
        if !is_inner && self.start.is_some() && node.node_type() != NodeType::Start {
            if self.reached_any.contains(&node.id) && !self.reached.contains(&node.id) {
                errors.push(
                    ValidationError::for_node(
                        node,
                        ErrorCode::ExceptionOnly,
                        "Node is only reachable through exception flow",
                    )
                    .severity(Severity::Warning),
                );
            } else if !self.reached.contains(&node.id) {
                errors.push(ValidationError::for_node(
                    node,
                    ErrorCode::Unreachable,
                    "Node is not reachable from Start",
                ));
            }
        }
        if is_inner && !self.inner_reached.contains(&node.id) {
            errors.push(
                ValidationError::for_node(
                    node,
                    ErrorCode::Unreachable,
                    "Node is not reachable from the loop body start",
                )
                .severity(Severity::Warning),
            );
        }

        if self.cycle_entries.contains(&node.id) {
            errors.push(ValidationError::for_node(
                node,
                ErrorCode::Cycle,
                "Node is part of a cycle",
            ));
        }

        // Duplicate targets
        let mut lists: Vec<(String, Vec<NodeId>)> = vec![
            ("nextNodeIds".to_string(), node.next_node_ids.clone()),
            (
                "exceptionHandleNodeIds".to_string(),
                node.exception_targets().to_vec(),
            ),
        ];
        for (uuid, ids) in node.kind.branches() {
            lists.push((format!("branch {}", uuid), ids.to_vec()));
        }
        for (field, ids) in &lists {
            for dup in duplicates(ids) {
                errors.push(
                    ValidationError::for_node(
                        node,
                        ErrorCode::DuplicateTarget,
                        format!("Target {} is listed more than once", dup),
                    )
                    .field(field.as_str()),
                );
            }
        }

        // Dangling references
        let scope = self.scope_of(node);
        for (field, ids) in &lists {
            for target in ids {
                self.check_target(node, field, *target, &scope, &mut errors);
            }
        }
        if node.is_loop() {
            let body: HashSet<NodeId> = node.inner_nodes.iter().map(|n| n.id).collect();
            if let Some(id) = node.inner_start_node_id {
                self.check_target(node, "innerStartNodeId", id, &body, &mut errors);
            }
            if let Some(id) = node.inner_end_node_id {
                self.check_target(node, "innerEndNodeId", id, &body, &mut errors);
            }
        }

        // Dead ends
        let terminal = matches!(
            node.node_type(),
            NodeType::End | NodeType::LoopEnd | NodeType::LoopBreak | NodeType::LoopContinue
        );
        let closes_loop = node
            .loop_node_id
            .and_then(|l| self.nodes.get(&l))
            .is_some_and(|lp| lp.inner_end_node_id == Some(node.id));
        if !terminal && !closes_loop && flow_targets(node).is_empty() {
            errors.push(
                ValidationError::for_node(node, ErrorCode::DeadEnd, "Node has no next node")
                    .severity(Severity::Warning),
            );
        }

        // Same target on both flows
        for target in &node.next_node_ids {
            if node.exception_targets().contains(target) {
                errors.push(
                    ValidationError::for_node(
                        node,
                        ErrorCode::MixedFlow,
                        format!("Node {} is both the normal and the exception target", target),
                    )
                    .severity(Severity::Warning),
                );
            }
        }

        errors
    }

    /// Input arguments bound by reference must name an existing node
    pub fn check_references(&self, node: &Node) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for arg in &node.kind.common().input_args {
            if arg.bind_value_type != Some(crate::models::BindValueType::Reference) {
                continue;
            }
            match arg.referenced_node() {
                Some(id) if self.nodes.contains_key(&id) => {}
                _ => errors.push(
                    ValidationError::for_node(
                        node,
                        ErrorCode::InvalidReference,
                        format!("Argument {} references an unknown value", arg.name),
                    )
                    .field("inputArgs"),
                ),
            }
        }
        errors
    }

    /// Edge list and adjacency fields must describe the same links
    pub fn check_edges(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let nodes = &self.data.node_list;
        let adjacency = adjacency_links(nodes);

        let mut edge_links: Vec<Link> = Vec::new();
        for edge in &self.data.edge_list {
            let source = edge.source_id().and_then(|id| self.nodes.get(&id));
            match edge_link(nodes, edge) {
                Some(link) => {
                    if !adjacency.contains(&link) {
                        if let Some(source) = source {
                            errors.push(ValidationError::for_node(
                                source,
                                ErrorCode::EdgeMismatch,
                                format!(
                                    "Edge {} -> {} has no matching adjacency entry",
                                    edge.source, edge.target
                                ),
                            ));
                        }
                    }
                    edge_links.push(link);
                }
                None => {
                    let message = format!(
                        "Edge {} -> {} points at a missing node",
                        edge.source, edge.target
                    );
                    errors.push(match source {
                        Some(source) => {
                            ValidationError::for_node(source, ErrorCode::DanglingReference, message)
                        }
                        None => ValidationError::workflow(ErrorCode::DanglingReference, message),
                    });
                }
            }
        }

        for (source, target, slot) in &adjacency {
            // Missing targets are reported per node
            if !self.nodes.contains_key(target) {
                continue;
            }
            let link = (*source, *target, slot.clone());
            if edge_links.contains(&link) {
                continue;
            }
            if let Some(node) = self.nodes.get(source) {
                errors.push(ValidationError::for_node(
                    node,
                    ErrorCode::EdgeMismatch,
                    format!("Link {} -> {} has no edge", source, target),
                ));
            }
        }

        errors
    }
}
