//! Graph store
//!
//! Owns the workflow aggregate. Every mutation runs as one transaction: it
//! either applies completely (dirty flag set, one history entry recorded) or
//! leaves the graph exactly as it was.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::app::options::HistoryOptions;
use crate::errors::EditorError;
use crate::history::{GraphSnapshot, HistoryAction, HistoryManager};
use crate::models::{classify_port, Edge, Extension, Node, NodeId, NodeKind, PortKind, WorkflowData};

use super::sync::edges_for_node;

/// Where a node lives in the aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Index into `node_list`
    Top(usize),
    /// Index into `node_list[parent].inner_nodes`
    Inner { parent: usize, index: usize },
}

/// Partial node update
///
/// Adjacency fields are owned by the edge operations and cannot be patched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    /// Replacement config; must be the node's own kind
    pub config: Option<NodeKind>,
    /// Canvas geometry, applied after `config`
    pub extension: Option<Extension>,
}

impl NodePatch {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn config(mut self, config: NodeKind) -> Self {
        self.config = Some(config);
        self
    }

    pub fn extension(mut self, extension: Extension) -> Self {
        self.extension = Some(extension);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &NodePatch::default()
    }
}

/// One operation of a batch
#[derive(Debug, Clone, PartialEq)]
pub enum GraphOp {
    AddNode(Node),
    UpdateNode { id: NodeId, patch: NodePatch },
    DeleteNode(NodeId),
    AddEdge(Edge),
    DeleteEdge(Edge),
}

/// In-memory workflow graph with undo/redo
#[derive(Debug)]
pub struct GraphStore {
    pub(super) data: WorkflowData,
    pub(super) index: HashMap<NodeId, Location>,
    history: HistoryManager,
}

impl GraphStore {
    /// Create an empty store
    pub fn new(history: HistoryOptions) -> Self {
        Self {
            data: WorkflowData::default(),
            index: HashMap::new(),
            history: HistoryManager::new(history),
        }
    }

    /// Create a store holding `data`
    pub fn with_data(data: WorkflowData, history: HistoryOptions) -> Self {
        let mut store = Self::new(history);
        store.reset(data);
        store
    }

    /// Read access to the aggregate
    pub fn data(&self) -> &WorkflowData {
        &self.data
    }

    pub fn is_dirty(&self) -> bool {
        self.data.is_dirty
    }

    pub fn last_saved_version(&self) -> &str {
        &self.data.last_saved_version
    }

    pub fn get_node_by_id(&self, id: NodeId) -> Option<&Node> {
        match *self.index.get(&id)? {
            Location::Top(i) => self.data.node_list.get(i),
            Location::Inner { parent, index } => {
                self.data.node_list.get(parent)?.inner_nodes.get(index)
            }
        }
    }

    pub(super) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        match *self.index.get(&id)? {
            Location::Top(i) => self.data.node_list.get_mut(i),
            Location::Inner { parent, index } => {
                self.data.node_list.get_mut(parent)?.inner_nodes.get_mut(index)
            }
        }
    }

    pub fn location(&self, id: NodeId) -> Option<Location> {
        self.index.get(&id).copied()
    }

    /// Edges with `id` at either end
    pub fn get_edges_by_node_id(&self, id: NodeId) -> Vec<Edge> {
        self.data
            .edge_list
            .iter()
            .filter(|e| e.touches(id))
            .cloned()
            .collect()
    }

    /// Content digest of the current graph
    pub fn digest(&self) -> Result<String, EditorError> {
        self.data.digest()
    }

    /// Add a node, returning its id
    ///
    /// Id `0` asks the store to assign one. A node with `loop_node_id` is
    /// placed in that loop's body.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId, EditorError> {
        let mut assigned = 0;
        self.transact(|store| {
            assigned = store.insert_node(node)?;
            Ok(Some(HistoryAction::AddNode(assigned)))
        })?;
        info!("Added node: {}", assigned);
        Ok(assigned)
    }

    /// Merge a patch into a node
    pub fn update_node(&mut self, id: NodeId, patch: NodePatch) -> Result<(), EditorError> {
        self.transact(|store| store.patch_node(id, patch))?;
        debug!("Updated node: {}", id);
        Ok(())
    }

    /// Delete a node and everything that points at it
    pub fn delete_node(&mut self, id: NodeId) -> Result<(), EditorError> {
        self.transact(|store| store.remove_node(id))?;
        info!("Deleted node: {}", id);
        Ok(())
    }

    /// Connect two ports; false if the identical edge already exists
    pub fn add_edge(&mut self, edge: Edge) -> Result<bool, EditorError> {
        let action = HistoryAction::AddEdge {
            source: edge.source.clone(),
            target: edge.target.clone(),
        };
        let added = self.transact(|store| Ok(store.link(edge)?.then_some(action)))?;
        Ok(added)
    }

    /// Disconnect two ports; false if no such edge exists
    pub fn delete_edge(
        &mut self,
        source: &str,
        target: &str,
        source_port: &str,
        target_port: &str,
    ) -> Result<bool, EditorError> {
        let action = HistoryAction::DeleteEdge {
            source: source.to_string(),
            target: target.to_string(),
        };
        let removed = self.transact(|store| {
            Ok(store
                .unlink(source, target, source_port, target_port)?
                .then_some(action))
        })?;
        Ok(removed)
    }

    /// Apply several operations as one undo step
    ///
    /// If any operation fails the graph is left untouched and the error is
    /// returned.
    pub fn batch_update(&mut self, ops: Vec<GraphOp>) -> Result<(), EditorError> {
        let count = ops.len();
        self.transact(|store| {
            let mut changed = false;
            for op in ops {
                changed |= store.apply(op)?;
            }
            Ok(changed.then_some(HistoryAction::Batch(count)))
        })?;
        info!("Applied batch of {} operation(s)", count);
        Ok(())
    }

    /// Replace the whole aggregate, clearing dirty state and history
    pub fn reset(&mut self, data: WorkflowData) {
        self.data = data;
        self.data.normalize_loops();
        self.data.is_dirty = false;
        self.history.clear();
        self.rebuild_index();
    }

    /// Reset to an empty workflow
    pub fn clear(&mut self) {
        self.reset(WorkflowData::default());
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Restore the state before the last mutation
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.restore(snapshot);
                self.data.is_dirty = true;
                true
            }
            None => false,
        }
    }

    /// Re-apply the last undone mutation
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.restore(snapshot);
                self.data.is_dirty = true;
                true
            }
            None => false,
        }
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    /// Record a confirmed save
    ///
    /// The dirty flag is only cleared when the graph still matches the
    /// digest of what was saved. Returns whether it was cleared.
    pub fn mark_saved(&mut self, version: String, saved_digest: &str) -> Result<bool, EditorError> {
        self.data.last_saved_version = version;
        if self.digest()? == saved_digest {
            self.data.is_dirty = false;
            return Ok(true);
        }
        Ok(false)
    }

    fn transact<F>(&mut self, op: F) -> Result<bool, EditorError>
    where
        F: FnOnce(&mut Self) -> Result<Option<HistoryAction>, EditorError>,
    {
        let before = self.graph_snapshot();
        match op(self) {
            Ok(Some(action)) => {
                self.data.is_dirty = true;
                let after = self.graph_snapshot();
                self.history.record(action, before, after);
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(err) => {
                // Roll back partial work
                self.restore(before);
                Err(err)
            }
        }
    }

    fn apply(&mut self, op: GraphOp) -> Result<bool, EditorError> {
        match op {
            GraphOp::AddNode(node) => self.insert_node(node).map(|_| true),
            GraphOp::UpdateNode { id, patch } => Ok(self.patch_node(id, patch)?.is_some()),
            GraphOp::DeleteNode(id) => Ok(self.remove_node(id)?.is_some()),
            GraphOp::AddEdge(edge) => self.link(edge),
            GraphOp::DeleteEdge(edge) => self.unlink(
                &edge.source,
                &edge.target,
                &edge.source_port,
                &edge.target_port,
            ),
        }
    }

    fn graph_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.data.node_list.clone(),
            edges: self.data.edge_list.clone(),
        }
    }

    fn restore(&mut self, snapshot: GraphSnapshot) {
        self.data.node_list = snapshot.nodes;
        self.data.edge_list = snapshot.edges;
        self.rebuild_index();
    }

    pub(super) fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, node) in self.data.node_list.iter().enumerate() {
            if self.index.insert(node.id, Location::Top(i)).is_some() {
                warn!("Duplicate node id in workflow: {}", node.id);
            }
            for (j, inner) in node.inner_nodes.iter().enumerate() {
                let location = Location::Inner {
                    parent: i,
                    index: j,
                };
                if self.index.insert(inner.id, location).is_some() {
                    warn!("Duplicate node id in workflow: {}", inner.id);
                }
            }
        }
    }

    fn insert_node(&mut self, mut node: Node) -> Result<NodeId, EditorError> {
        if node.id < 0 {
            return Err(EditorError::InvalidNode(format!(
                "node id must not be negative: {}",
                node.id
            )));
        }
        if node.id == 0 {
            node.id = self.data.max_node_id() + 1;
        }
        let id = node.id;

        // Check ids, loop body included
        if self.index.contains_key(&id) {
            return Err(EditorError::DuplicateNode(id));
        }
        let mut seen = vec![id];
        for inner in &mut node.inner_nodes {
            if inner.id <= 0 {
                return Err(EditorError::InvalidNode(format!(
                    "inner node of {} has no id",
                    id
                )));
            }
            if seen.contains(&inner.id) || self.index.contains_key(&inner.id) {
                return Err(EditorError::DuplicateNode(inner.id));
            }
            seen.push(inner.id);
            inner.loop_node_id = Some(id);
        }

        let edges = edges_for_node(&node);

        match node.loop_node_id {
            Some(loop_id) => {
                if node.is_loop() {
                    return Err(EditorError::InvalidNode(format!(
                        "loop {} cannot be nested in loop {}",
                        id, loop_id
                    )));
                }
                let parent = match self.index.get(&loop_id) {
                    Some(Location::Top(i)) => *i,
                    Some(Location::Inner { .. }) => {
                        return Err(EditorError::InvalidNode(format!(
                            "node {} is not a loop",
                            loop_id
                        )))
                    }
                    None => return Err(EditorError::NodeNotFound(loop_id)),
                };
                let owner = &mut self.data.node_list[parent];
                if !owner.is_loop() {
                    return Err(EditorError::InvalidNode(format!(
                        "node {} is not a loop",
                        loop_id
                    )));
                }
                owner.inner_nodes.push(node);
            }
            None => self.data.node_list.push(node),
        }

        for edge in edges {
            if !self.data.edge_list.iter().any(|e| e.same_link(&edge)) {
                self.data.edge_list.push(edge);
            }
        }
        self.rebuild_index();
        Ok(id)
    }

    fn patch_node(
        &mut self,
        id: NodeId,
        patch: NodePatch,
    ) -> Result<Option<HistoryAction>, EditorError> {
        let current = self
            .get_node_by_id(id)
            .ok_or(EditorError::NodeNotFound(id))?;
        if patch.is_empty() {
            return Ok(None);
        }

        let mut stale_edges = Vec::new();
        if let Some(config) = &patch.config {
            if config.node_type() != current.node_type() {
                return Err(EditorError::KindMismatch {
                    id,
                    expected: current.node_type().to_string(),
                    actual: config.node_type().to_string(),
                });
            }

            // Edges leaving branches the new config drops
            let kept: Vec<&str> = config.branches().into_iter().map(|(u, _)| u).collect();
            for (i, edge) in self.data.edge_list.iter().enumerate() {
                if edge.source_id() != Some(id) {
                    continue;
                }
                if let PortKind::Branch(uuid) = classify_port(&edge.source_port, current) {
                    if !kept.contains(&uuid.as_str()) {
                        stale_edges.push(i);
                    }
                }
            }
        }

        for i in stale_edges.into_iter().rev() {
            self.data.edge_list.remove(i);
        }

        let node = self.node_mut(id).ok_or(EditorError::NodeNotFound(id))?;
        if let Some(name) = patch.name {
            node.name = name;
        }
        if let Some(description) = patch.description {
            node.description = description;
        }
        if let Some(icon) = patch.icon {
            node.icon = icon;
        }
        if let Some(mut config) = patch.config {
            carry_adjacency(&node.kind, &mut config);
            node.kind = config;
        }
        if let Some(extension) = patch.extension {
            node.kind.common_mut().extension = Some(extension);
        }
        Ok(Some(HistoryAction::UpdateNode(id)))
    }

    fn remove_node(&mut self, id: NodeId) -> Result<Option<HistoryAction>, EditorError> {
        let location = self.location(id).ok_or(EditorError::NodeNotFound(id))?;

        let removed = match location {
            Location::Top(i) => self.data.node_list.remove(i),
            Location::Inner { parent, index } => {
                self.data.node_list[parent].inner_nodes.remove(index)
            }
        };

        // A loop takes its body with it
        let mut gone = vec![removed.id];
        gone.extend(removed.inner_nodes.iter().map(|n| n.id));

        self.data
            .edge_list
            .retain(|e| !gone.iter().any(|g| e.touches(*g)));
        for node in self.data.node_list.iter_mut() {
            for g in &gone {
                node.prune_target(*g);
            }
            for inner in node.inner_nodes.iter_mut() {
                for g in &gone {
                    inner.prune_target(*g);
                }
            }
        }

        self.rebuild_index();
        Ok(Some(HistoryAction::DeleteNode(id)))
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(HistoryOptions::default())
    }
}

/// Keep the adjacency of `old` in a replacement config
fn carry_adjacency(old: &NodeKind, new: &mut NodeKind) {
    let targets = old
        .common()
        .exception_handle_config
        .as_ref()
        .map(|c| c.exception_handle_node_ids.clone())
        .unwrap_or_default();
    match new.common_mut().exception_handle_config.as_mut() {
        Some(cfg) => cfg.exception_handle_node_ids = targets,
        None if !targets.is_empty() => {
            new.common_mut()
                .exception_handle_config
                .get_or_insert_with(Default::default)
                .exception_handle_node_ids = targets;
        }
        None => {}
    }

    for list in new.branch_targets_mut() {
        list.clear();
    }
    for (uuid, ids) in old.branches() {
        if let Some(list) = new.branch_mut(uuid) {
            list.extend_from_slice(ids);
        }
    }
}
