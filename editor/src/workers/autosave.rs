//! Autosave worker
//!
//! Turns edit notifications into saves. Node updates and edge changes are
//! debounced: each one pushes the save back. Structural changes are
//! throttled: the first one starts a window and later ones do not extend it.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::app::options::AutoSaveOptions;
use crate::persist::PersistenceCoordinator;

/// Kind of edit that asks for a save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTrigger {
    /// Node update or edge change
    Debounced,
    /// Node add/delete or batch
    Throttled,
}

/// Pending save deadlines
#[derive(Debug, Default, Clone, Copy)]
struct Schedule {
    debounce_at: Option<Instant>,
    throttle_at: Option<Instant>,
}

impl Schedule {
    fn push(&mut self, trigger: SaveTrigger, options: &AutoSaveOptions, now: Instant) {
        match trigger {
            SaveTrigger::Debounced => self.debounce_at = Some(now + options.debounce),
            SaveTrigger::Throttled => {
                self.throttle_at.get_or_insert(now + options.throttle);
            }
        }
    }

    fn deadline(&self) -> Option<Instant> {
        match (self.debounce_at, self.throttle_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

/// Run the autosave worker
pub async fn run<S, F>(
    options: &AutoSaveOptions,
    coordinator: &PersistenceCoordinator,
    mut triggers: mpsc::UnboundedReceiver<SaveTrigger>,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Autosave worker starting...");

    let mut schedule = Schedule::default();

    loop {
        let wait = schedule
            .deadline()
            .map(|at| at.saturating_duration_since(Instant::now()));
        let timer = async {
            match wait {
                Some(duration) => sleep_fn(duration).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Autosave worker shutting down...");
                return;
            }
            trigger = triggers.recv() => {
                match trigger {
                    Some(trigger) => {
                        debug!("Autosave trigger: {:?}", trigger);
                        schedule.push(trigger, options, Instant::now());
                    }
                    None => {
                        info!("Autosave channel closed, worker stopping...");
                        return;
                    }
                }
            }
            _ = timer => {
                schedule = Schedule::default();
                debug!("Autosave deadline reached");
                if !coordinator.save_now().await {
                    warn!("Autosave did not complete");
                }
            }
        }
    }
}
