//! Workflow editor facade
//!
//! Wires the graph store, the persistence coordinator and the autosave
//! worker behind one handle. Every method takes `&self`; the graph lock is
//! never held across an await point.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::app::options::EditorOptions;
use crate::errors::EditorError;
use crate::graph::{GraphOp, GraphStore, NodePatch};
use crate::http::HttpClient;
use crate::models::{Edge, Node, NodeId, WorkflowData, WorkflowId};
use crate::persist::{
    workflow_from_details, PersistenceCoordinator, SaveCallbacks, SaveState, Sleeper,
    TokioSleeper, WorkflowBackend,
};
use crate::utils::wait_for_shutdown;
use crate::validate::{validate_workflow, ValidationReport};
use crate::workers::autosave::{self, SaveTrigger};

struct AutoSaveHandle {
    triggers: mpsc::UnboundedSender<SaveTrigger>,
    task: JoinHandle<()>,
}

/// Editing session for one workflow
pub struct WorkflowEditor {
    workflow_id: WorkflowId,
    options: EditorOptions,
    store: Arc<Mutex<GraphStore>>,
    backend: Arc<dyn WorkflowBackend>,
    coordinator: Arc<PersistenceCoordinator>,
    loading: AtomicBool,
    autosave: Mutex<Option<AutoSaveHandle>>,
    shutdown_tx: watch::Sender<bool>,
}

impl WorkflowEditor {
    /// Create an editor over the given backend
    pub fn new(
        options: EditorOptions,
        backend: Arc<dyn WorkflowBackend>,
        sleeper: Arc<dyn Sleeper>,
        callbacks: SaveCallbacks,
    ) -> Self {
        let store = Arc::new(Mutex::new(GraphStore::new(options.history)));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let coordinator = Arc::new(PersistenceCoordinator::new(
            options.workflow_id,
            store.clone(),
            backend.clone(),
            sleeper,
            options.autosave.clone(),
            callbacks,
            shutdown_rx,
        ));

        Self {
            workflow_id: options.workflow_id,
            options,
            store,
            backend,
            coordinator,
            loading: AtomicBool::new(false),
            autosave: Mutex::new(None),
            shutdown_tx,
        }
    }

    /// Create an editor talking to the HTTP backend named in `options`
    pub fn connect(options: EditorOptions, callbacks: SaveCallbacks) -> Result<Self, EditorError> {
        let client = match &options.auth_token {
            Some(token) => HttpClient::with_token(
                &options.backend_base_url,
                options.http_timeout,
                token.clone(),
            )?,
            None => HttpClient::new(&options.backend_base_url, options.http_timeout)?,
        };
        info!(
            "Editing workflow {} on {}",
            options.workflow_id,
            client.base_url()
        );
        Ok(Self::new(
            options,
            Arc::new(client),
            Arc::new(TokioSleeper),
            callbacks,
        ))
    }

    fn lock_store(&self) -> MutexGuard<'_, GraphStore> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn notify(&self, trigger: SaveTrigger) {
        let autosave = self.autosave.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = autosave.as_ref() {
            if handle.triggers.send(trigger).is_err() {
                debug!("Autosave worker gone, dropping {:?}", trigger);
            }
        }
    }

    pub fn workflow_id(&self) -> WorkflowId {
        self.workflow_id
    }

    /// Add a node, returning its id
    pub fn add_node(&self, node: Node) -> Result<NodeId, EditorError> {
        let id = self.lock_store().add_node(node)?;
        self.notify(SaveTrigger::Throttled);
        Ok(id)
    }

    /// Merge a patch into a node
    pub fn update_node(&self, id: NodeId, patch: NodePatch) -> Result<(), EditorError> {
        self.lock_store().update_node(id, patch)?;
        self.notify(SaveTrigger::Debounced);
        Ok(())
    }

    /// Delete a node with its edges and references
    pub fn delete_node(&self, id: NodeId) -> Result<(), EditorError> {
        self.lock_store().delete_node(id)?;
        self.notify(SaveTrigger::Throttled);
        Ok(())
    }

    /// Connect two ports
    pub fn add_edge(&self, edge: Edge) -> Result<bool, EditorError> {
        let added = self.lock_store().add_edge(edge)?;
        if added {
            self.notify(SaveTrigger::Debounced);
        }
        Ok(added)
    }

    /// Disconnect two ports
    pub fn delete_edge(
        &self,
        source: &str,
        target: &str,
        source_port: &str,
        target_port: &str,
    ) -> Result<bool, EditorError> {
        let removed = self
            .lock_store()
            .delete_edge(source, target, source_port, target_port)?;
        if removed {
            self.notify(SaveTrigger::Debounced);
        }
        Ok(removed)
    }

    /// Apply several operations as one undo step
    pub fn batch_update(&self, ops: Vec<GraphOp>) -> Result<(), EditorError> {
        self.lock_store().batch_update(ops)?;
        self.notify(SaveTrigger::Throttled);
        Ok(())
    }

    pub fn get_node_by_id(&self, id: NodeId) -> Option<Node> {
        self.lock_store().get_node_by_id(id).cloned()
    }

    pub fn get_edges_by_node_id(&self, id: NodeId) -> Vec<Edge> {
        self.lock_store().get_edges_by_node_id(id)
    }

    /// Reload the workflow from the backend
    ///
    /// Replaces the graph and clears dirty state and history. On failure the
    /// current graph is kept.
    pub async fn refresh_data(&self) -> Result<(), EditorError> {
        self.loading.store(true, Ordering::SeqCst);
        let result = self.backend.get_workflow_details(self.workflow_id).await;
        self.loading.store(false, Ordering::SeqCst);

        let details = result?;
        let data = workflow_from_details(details);
        info!(
            "Loaded workflow {}: {} node(s), {} edge(s)",
            self.workflow_id,
            data.node_list.len(),
            data.edge_list.len()
        );
        self.lock_store().reset(data);
        Ok(())
    }

    /// Save now if there are unsaved changes
    pub async fn save_now(&self) -> bool {
        self.coordinator.save_now().await
    }

    pub fn can_undo(&self) -> bool {
        self.lock_store().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.lock_store().can_redo()
    }

    pub fn undo(&self) -> bool {
        let undone = self.lock_store().undo();
        if undone {
            self.notify(SaveTrigger::Debounced);
        }
        undone
    }

    pub fn redo(&self) -> bool {
        let redone = self.lock_store().redo();
        if redone {
            self.notify(SaveTrigger::Debounced);
        }
        redone
    }

    /// Replace the graph, clearing dirty state and history
    pub fn reset(&self, data: WorkflowData) {
        self.lock_store().reset(data);
    }

    /// Reset to an empty workflow
    pub fn clear(&self) {
        self.lock_store().clear();
    }

    /// Snapshot of the aggregate
    pub fn workflow_data(&self) -> WorkflowData {
        self.lock_store().data().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn is_saving(&self) -> bool {
        self.coordinator.is_saving()
    }

    pub fn is_dirty(&self) -> bool {
        self.lock_store().is_dirty()
    }

    pub async fn save_state(&self) -> SaveState {
        self.coordinator.get_state().await
    }

    /// Validate the current graph
    pub fn validate(&self) -> ValidationReport {
        let store = self.lock_store();
        validate_workflow(store.data())
    }

    /// Start the autosave worker; no-op if disabled or already running
    pub fn start_autosave(&self) {
        if !self.options.autosave.enabled {
            debug!("Autosave disabled");
            return;
        }
        let mut autosave = self.autosave.lock().unwrap_or_else(|e| e.into_inner());
        if autosave.is_some() {
            return;
        }

        let (triggers, rx) = mpsc::unbounded_channel();
        let options = self.options.autosave.clone();
        let coordinator = self.coordinator.clone();
        let shutdown = Box::pin(wait_for_shutdown(self.shutdown_tx.subscribe()));
        let task = tokio::spawn(async move {
            autosave::run(&options, &coordinator, rx, tokio::time::sleep, shutdown).await;
        });

        *autosave = Some(AutoSaveHandle { triggers, task });
    }

    /// Stop the autosave worker and abandon pending save retries
    pub async fn shutdown(&self) {
        info!("Shutting down editor for workflow {}...", self.workflow_id);
        let _ = self.shutdown_tx.send(true);

        let handle = self
            .autosave
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            drop(handle.triggers);
            if let Err(e) = handle.task.await {
                warn!("Autosave worker ended abnormally: {}", e);
            }
        }
    }
}
