//! Edge synchronizer
//!
//! The edge list and the node adjacency fields are two views of one relation.
//! The functions here are the only writers of adjacency fields, and they
//! update both views in the same step.

use tracing::debug;

use crate::errors::EditorError;
use crate::models::node::{push_unique, remove_id};
use crate::models::{classify_port, Edge, ExceptionHandleType, Node, NodeId, PortKind};

use super::store::GraphStore;

/// Adjacency slot an edge occupies on its source node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    /// `nextNodeIds`
    Next,
    /// Exception flow targets
    Exception,
    /// A branch's `nextNodeIds`
    Branch(String),
    /// Loop to its first body node
    LoopStart,
    /// Last body node back to its loop (stored on the loop)
    LoopEnd,
}

/// Semantic form of an edge: `(source, target, slot)`
pub type Link = (NodeId, NodeId, Slot);

impl GraphStore {
    fn endpoints(&self, edge: &Edge) -> Result<(NodeId, NodeId), EditorError> {
        let source = edge
            .source_id()
            .ok_or_else(|| EditorError::InvalidEdge(format!("bad source id: {:?}", edge.source)))?;
        let target = edge
            .target_id()
            .ok_or_else(|| EditorError::InvalidEdge(format!("bad target id: {:?}", edge.target)))?;
        Ok((source, target))
    }

    /// Add an edge and its adjacency entry
    pub(super) fn link(&mut self, edge: Edge) -> Result<bool, EditorError> {
        let (source_id, target_id) = self.endpoints(&edge)?;
        if source_id == target_id {
            return Err(EditorError::InvalidEdge(format!(
                "node {} cannot connect to itself",
                source_id
            )));
        }
        let source = self
            .get_node_by_id(source_id)
            .ok_or(EditorError::NodeNotFound(source_id))?;
        let target = self
            .get_node_by_id(target_id)
            .ok_or(EditorError::NodeNotFound(target_id))?;

        if self.data.edge_list.iter().any(|e| e.same_link(&edge)) {
            debug!("Edge already present: {} -> {}", edge.source, edge.target);
            return Ok(false);
        }

        let slot = resolve_slot(source, target, &edge.source_port);
        if slot == Slot::Next && source.kind.routes_by_branch() {
            return Err(EditorError::InvalidEdge(format!(
                "{} is not a branch port of node {}",
                edge.source_port, source_id
            )));
        }

        // Loop markers hold one node; the edge behind the old one goes
        let displaced = match &slot {
            Slot::LoopStart => source
                .inner_start_node_id
                .filter(|old| *old != target_id)
                .map(|old| (source_id, old)),
            Slot::LoopEnd => target
                .inner_end_node_id
                .filter(|old| *old != source_id)
                .map(|old| (old, target_id)),
            _ => None,
        };
        if let Some((from, to)) = displaced {
            self.drop_slot_edges(from, to, &slot);
        }

        match &slot {
            Slot::LoopEnd => {
                let owner = self
                    .node_mut(target_id)
                    .ok_or(EditorError::NodeNotFound(target_id))?;
                owner.inner_end_node_id = Some(source_id);
            }
            _ => {
                let node = self
                    .node_mut(source_id)
                    .ok_or(EditorError::NodeNotFound(source_id))?;
                match &slot {
                    Slot::Next => {
                        push_unique(&mut node.next_node_ids, target_id);
                    }
                    Slot::Exception => {
                        let cfg = node.exception_config_mut();
                        if cfg.exception_handle_type != ExceptionHandleType::SpecificContent {
                            cfg.specific_content = None;
                        }
                        push_unique(&mut cfg.exception_handle_node_ids, target_id);
                    }
                    Slot::Branch(uuid) => {
                        let targets = node.kind.branch_mut(uuid).ok_or_else(|| {
                            EditorError::InvalidEdge(format!("no branch {} on {}", uuid, source_id))
                        })?;
                        push_unique(targets, target_id);
                    }
                    Slot::LoopStart => node.inner_start_node_id = Some(target_id),
                    Slot::LoopEnd => {}
                }
            }
        }

        debug!(
            "Linked {} -> {} via {:?}",
            edge.source, edge.target, slot
        );
        self.data.edge_list.push(edge);
        Ok(true)
    }

    /// Remove the edges from `source` to `target` that fill `slot`
    fn drop_slot_edges(&mut self, source: NodeId, target: NodeId, slot: &Slot) {
        let (Some(source_node), Some(target_node)) =
            (self.get_node_by_id(source), self.get_node_by_id(target))
        else {
            return;
        };
        let stale: Vec<usize> = self
            .data
            .edge_list
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                e.source_id() == Some(source)
                    && e.target_id() == Some(target)
                    && resolve_slot(source_node, target_node, &e.source_port) == *slot
            })
            .map(|(i, _)| i)
            .collect();
        for i in stale.into_iter().rev() {
            let edge = self.data.edge_list.remove(i);
            debug!("Replaced loop marker edge {} -> {}", edge.source, edge.target);
        }
    }

    /// Remove an edge and its adjacency entry
    pub(super) fn unlink(
        &mut self,
        source: &str,
        target: &str,
        source_port: &str,
        target_port: &str,
    ) -> Result<bool, EditorError> {
        let Some(pos) = self
            .data
            .edge_list
            .iter()
            .position(|e| e.matches(source, target, source_port, target_port))
        else {
            return Ok(false);
        };
        let edge = self.data.edge_list.remove(pos);

        let Ok((source_id, target_id)) = self.endpoints(&edge) else {
            return Ok(true);
        };
        let (Some(source_node), Some(target_node)) =
            (self.get_node_by_id(source_id), self.get_node_by_id(target_id))
        else {
            return Ok(true);
        };
        let slot = resolve_slot(source_node, target_node, source_port);

        // Another edge may still back the same adjacency entry
        let still_backed = self.data.edge_list.iter().any(|e| {
            e.source_id() == Some(source_id)
                && e.target_id() == Some(target_id)
                && resolve_slot(source_node, target_node, &e.source_port) == slot
        });
        if still_backed {
            return Ok(true);
        }

        match &slot {
            Slot::LoopEnd => {
                if let Some(owner) = self.node_mut(target_id) {
                    if owner.inner_end_node_id == Some(source_id) {
                        owner.inner_end_node_id = None;
                    }
                }
            }
            _ => {
                let Some(node) = self.node_mut(source_id) else {
                    return Ok(true);
                };
                match &slot {
                    Slot::Next => {
                        remove_id(&mut node.next_node_ids, target_id);
                    }
                    Slot::Exception => {
                        if let Some(cfg) = node.kind.common_mut().exception_handle_config.as_mut() {
                            remove_id(&mut cfg.exception_handle_node_ids, target_id);
                        }
                    }
                    Slot::Branch(uuid) => {
                        if let Some(targets) = node.kind.branch_mut(uuid) {
                            remove_id(targets, target_id);
                        }
                    }
                    Slot::LoopStart => {
                        if node.inner_start_node_id == Some(target_id) {
                            node.inner_start_node_id = None;
                        }
                    }
                    Slot::LoopEnd => {}
                }
            }
        }

        debug!("Unlinked {} -> {} via {:?}", source, target, slot);
        Ok(true)
    }
}

/// Resolve which slot an edge from `source` to `target` fills
pub fn resolve_slot(source: &Node, target: &Node, source_port: &str) -> Slot {
    match classify_port(source_port, source) {
        PortKind::Exception => Slot::Exception,
        PortKind::Branch(uuid) => Slot::Branch(uuid),
        PortKind::Normal if source.is_loop() && target.loop_node_id == Some(source.id) => {
            Slot::LoopStart
        }
        PortKind::Normal if target.is_loop() && source.loop_node_id == Some(target.id) => {
            Slot::LoopEnd
        }
        PortKind::Normal => Slot::Next,
    }
}

/// Edges implied by one node's adjacency fields, loop body included
pub fn edges_for_node(node: &Node) -> Vec<Edge> {
    let mut edges = Vec::new();
    collect_node_edges(node, &mut edges);
    edges
}

/// Rebuild the edge list from node adjacency fields
///
/// Used to hydrate a freshly loaded workflow. Self edges are skipped.
pub fn edges_from_nodes(nodes: &[Node]) -> Vec<Edge> {
    let mut edges = Vec::new();
    for node in nodes {
        collect_node_edges(node, &mut edges);
    }
    edges
}

fn collect_node_edges(node: &Node, edges: &mut Vec<Edge>) {
    let mut push = |edge: Edge| {
        if edge.source != edge.target && !edges.iter().any(|e| e.same_link(&edge)) {
            edges.push(edge);
        }
    };

    for target in &node.next_node_ids {
        // Returning to the enclosing loop is carried by the loop's end marker
        if node.loop_node_id == Some(*target) {
            continue;
        }
        push(Edge::normal(node.id, *target));
    }
    for target in node.exception_targets() {
        push(Edge::exception(node.id, *target));
    }
    for (uuid, targets) in node.kind.branches() {
        for target in targets {
            push(Edge::branch(node.id, uuid, *target));
        }
    }
    if node.is_loop() {
        if let Some(start) = node.inner_start_node_id {
            push(Edge::normal(node.id, start));
        }
        if let Some(end) = node.inner_end_node_id {
            push(Edge::normal(end, node.id));
        }
        for inner in &node.inner_nodes {
            collect_node_edges(inner, edges);
        }
    }
}

/// Links implied by the adjacency fields of every node, in node order
pub fn adjacency_links(nodes: &[Node]) -> Vec<Link> {
    let mut links = Vec::new();
    let mut push = |link: Link| {
        if !links.contains(&link) {
            links.push(link);
        }
    };
    let all = nodes
        .iter()
        .flat_map(|n| std::iter::once(n).chain(n.inner_nodes.iter()));
    for node in all {
        for target in &node.next_node_ids {
            if node.loop_node_id != Some(*target) {
                push((node.id, *target, Slot::Next));
            }
        }
        for target in node.exception_targets() {
            push((node.id, *target, Slot::Exception));
        }
        for (uuid, targets) in node.kind.branches() {
            for target in targets {
                push((node.id, *target, Slot::Branch(uuid.to_string())));
            }
        }
        if let Some(start) = node.inner_start_node_id {
            push((node.id, start, Slot::LoopStart));
        }
        if let Some(end) = node.inner_end_node_id {
            push((end, node.id, Slot::LoopEnd));
        }
    }
    links
}

/// Link an edge stands for, if both ends exist
pub fn edge_link(store_nodes: &[Node], edge: &Edge) -> Option<Link> {
    let find = |id: NodeId| {
        store_nodes
            .iter()
            .flat_map(|n| std::iter::once(n).chain(n.inner_nodes.iter()))
            .find(|n| n.id == id)
    };
    let (source_id, target_id) = (edge.source_id()?, edge.target_id()?);
    let source = find(source_id)?;
    let target = find(target_id)?;
    let slot = resolve_slot(source, target, &edge.source_port);
    Some((source_id, target_id, slot))
}
