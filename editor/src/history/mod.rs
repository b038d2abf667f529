//! Undo/redo history
//!
//! Each entry stores the graph before and after one mutation. Undo restores
//! `before`, redo restores `after`.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::options::HistoryOptions;
use crate::models::{Edge, Node, NodeId};
use crate::utils::generate_uuid;

/// Node and edge lists at one point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// What produced a history entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum HistoryAction {
    AddNode(NodeId),
    UpdateNode(NodeId),
    DeleteNode(NodeId),
    AddEdge { source: String, target: String },
    DeleteEdge { source: String, target: String },
    /// Number of operations in the batch
    Batch(usize),
}

/// One undoable step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub action: HistoryAction,
    pub timestamp: DateTime<Utc>,
    pub before: GraphSnapshot,
    pub after: GraphSnapshot,
}

/// Bounded undo/redo stacks
#[derive(Debug)]
pub struct HistoryManager {
    options: HistoryOptions,
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
}

impl HistoryManager {
    pub fn new(options: HistoryOptions) -> Self {
        Self {
            options,
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
        }
    }

    /// Record a new mutation and drop the redo stack
    pub fn record(&mut self, action: HistoryAction, before: GraphSnapshot, after: GraphSnapshot) {
        if !self.options.enabled || self.options.stack_size == 0 {
            return;
        }

        debug!("History: recording {:?}", action);
        self.undo_stack.push_back(HistoryEntry {
            id: generate_uuid(),
            action,
            timestamp: Utc::now(),
            before,
            after,
        });
        self.redo_stack.clear();

        // Drop the oldest entry past capacity
        while self.undo_stack.len() > self.options.stack_size {
            self.undo_stack.pop_front();
        }
    }

    /// Move the latest entry to the redo stack, returning the state to restore
    pub fn undo(&mut self) -> Option<GraphSnapshot> {
        let entry = self.undo_stack.pop_back()?;
        let snapshot = entry.before.clone();
        self.redo_stack.push(entry);
        Some(snapshot)
    }

    /// Move the latest undone entry back, returning the state to restore
    pub fn redo(&mut self) -> Option<GraphSnapshot> {
        let entry = self.redo_stack.pop()?;
        let snapshot = entry.after.clone();
        self.undo_stack.push_back(entry);
        Some(snapshot)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Most recent undoable entry
    pub fn last_entry(&self) -> Option<&HistoryEntry> {
        self.undo_stack.back()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(HistoryOptions::default())
    }
}
