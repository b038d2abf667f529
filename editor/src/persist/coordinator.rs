//! Persistence coordinator
//!
//! Owns the save lifecycle: skips clean graphs, serializes saves, retries
//! with backoff, and reconciles the dirty flag with what was actually saved.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, warn};

use crate::app::options::AutoSaveOptions;
use crate::errors::EditorError;
use crate::graph::GraphStore;
use crate::models::WorkflowId;
use crate::utils::{calc_exp_backoff, now_millis_token, wait_for_shutdown};

use super::backend::{Sleeper, WorkflowBackend};
use super::payload::build_save_request;

/// Called with the new version after a confirmed save
pub type SaveSuccessCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Called once with the terminal error when every attempt failed
pub type SaveErrorCallback = Arc<dyn Fn(&EditorError) + Send + Sync>;

/// Save observers
#[derive(Clone, Default)]
pub struct SaveCallbacks {
    pub on_success: Option<SaveSuccessCallback>,
    pub on_error: Option<SaveErrorCallback>,
}

impl std::fmt::Debug for SaveCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveCallbacks")
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Save state
#[derive(Debug, Clone, Default)]
pub struct SaveState {
    pub last_attempted_at: Option<DateTime<Utc>>,
    pub last_saved_at: Option<DateTime<Utc>>,
    /// Failed attempts since the last success
    pub err_streak: u32,
    pub last_error: Option<String>,
}

/// Raises the saving flag and lowers it on drop, even if the save is abandoned
struct SavingFlag<'a>(&'a AtomicBool);

impl<'a> SavingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for SavingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Persistence coordinator
pub struct PersistenceCoordinator {
    workflow_id: WorkflowId,
    store: Arc<Mutex<GraphStore>>,
    backend: Arc<dyn WorkflowBackend>,
    sleeper: Arc<dyn Sleeper>,
    options: AutoSaveOptions,
    callbacks: SaveCallbacks,
    /// Held for the whole save so writes never overlap
    save_lock: tokio::sync::Mutex<()>,
    saving: AtomicBool,
    state: RwLock<SaveState>,
    shutdown: watch::Receiver<bool>,
}

impl PersistenceCoordinator {
    /// Create a new coordinator
    pub fn new(
        workflow_id: WorkflowId,
        store: Arc<Mutex<GraphStore>>,
        backend: Arc<dyn WorkflowBackend>,
        sleeper: Arc<dyn Sleeper>,
        options: AutoSaveOptions,
        callbacks: SaveCallbacks,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            workflow_id,
            store,
            backend,
            sleeper,
            options,
            callbacks,
            save_lock: tokio::sync::Mutex::new(()),
            saving: AtomicBool::new(false),
            state: RwLock::new(SaveState::default()),
            shutdown,
        }
    }

    fn lock_store(&self) -> MutexGuard<'_, GraphStore> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_dirty(&self) -> bool {
        self.lock_store().is_dirty()
    }

    /// A save is in flight
    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::SeqCst)
    }

    /// Get save state
    pub async fn get_state(&self) -> SaveState {
        self.state.read().await.clone()
    }

    /// Save the graph if it has unsaved changes
    ///
    /// Returns true when the graph is saved (or was already clean). A call
    /// made while another save runs waits for it, then only saves what that
    /// save did not cover.
    pub async fn save_now(&self) -> bool {
        if !self.is_dirty() {
            debug!("Workflow {} is clean, skipping save", self.workflow_id);
            return true;
        }

        let _guard = self.save_lock.lock().await;

        // The save we waited on may have covered our changes
        if !self.is_dirty() {
            debug!("Workflow {} saved by a previous call", self.workflow_id);
            return true;
        }

        let result = {
            let _saving = SavingFlag::raise(&self.saving);
            self.save_with_retry().await
        };

        match result {
            Ok(version) => {
                if let Some(on_success) = &self.callbacks.on_success {
                    on_success(&version);
                }
                true
            }
            Err(EditorError::SaveCancelled) => {
                info!("Save of workflow {} cancelled", self.workflow_id);
                false
            }
            Err(e) => {
                error!("Save of workflow {} failed: {}", self.workflow_id, e);
                self.state.write().await.last_error = Some(e.to_string());
                if let Some(on_error) = &self.callbacks.on_error {
                    on_error(&e);
                }
                false
            }
        }
    }

    async fn save_with_retry(&self) -> Result<String, EditorError> {
        // Snapshot the graph; the store lock is released before any await
        let (payload, digest) = {
            let store = self.lock_store();
            (
                build_save_request(store.data(), self.workflow_id),
                store.digest()?,
            )
        };

        let max_attempts = self.options.max_retries.saturating_add(1);
        let mut last_err = EditorError::Internal("save was never attempted".to_string());

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let delay = calc_exp_backoff(&self.options.retry, attempt - 1);
                debug!("Retrying save in {:?} (attempt {})", delay, attempt + 1);
                tokio::select! {
                    _ = wait_for_shutdown(self.shutdown.clone()) => {
                        return Err(EditorError::SaveCancelled);
                    }
                    _ = self.sleeper.sleep(delay) => {}
                }
            }
            let stopped = *self.shutdown.borrow();
            if stopped {
                return Err(EditorError::SaveCancelled);
            }

            self.state.write().await.last_attempted_at = Some(Utc::now());

            let err = match self.backend.save_workflow_full(self.workflow_id, &payload).await {
                Ok(response) if response.success => {
                    let version = response
                        .version
                        .filter(|v| !v.is_empty())
                        .unwrap_or_else(now_millis_token);
                    self.record_success(&version, &digest).await;
                    return Ok(version);
                }
                Ok(response) => EditorError::ApiError {
                    code: "SAVE_REJECTED".to_string(),
                    message: response
                        .message
                        .unwrap_or_else(|| "save rejected".to_string()),
                },
                Err(e) => e,
            };

            warn!(
                "Save attempt {}/{} for workflow {} failed: {}",
                attempt + 1,
                max_attempts,
                self.workflow_id,
                err
            );
            self.state.write().await.err_streak += 1;

            // Only transport failures are worth retrying
            if !err.is_transport() {
                return Err(EditorError::SaveFailed {
                    attempts: attempt + 1,
                    source: Box::new(err),
                });
            }
            last_err = err;
        }

        Err(EditorError::SaveFailed {
            attempts: max_attempts,
            source: Box::new(last_err),
        })
    }

    async fn record_success(&self, version: &str, digest: &str) {
        let cleared = {
            let mut store = self.lock_store();
            match store.mark_saved(version.to_string(), digest) {
                Ok(cleared) => cleared,
                Err(e) => {
                    warn!("Could not compare saved graph: {}", e);
                    false
                }
            }
        };
        if cleared {
            info!("Saved workflow {} (version {})", self.workflow_id, version);
        } else {
            info!(
                "Saved workflow {} (version {}), newer edits still pending",
                self.workflow_id, version
            );
        }

        let mut state = self.state.write().await;
        state.last_saved_at = Some(Utc::now());
        state.err_streak = 0;
        state.last_error = None;
    }
}
