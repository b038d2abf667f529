//! Save pipeline: backend contract, payload mapping and the coordinator

pub mod backend;
pub mod coordinator;
pub mod payload;

pub use backend::{SavePayload, Sleeper, TokioSleeper, WorkflowBackend};
pub use coordinator::{PersistenceCoordinator, SaveCallbacks, SaveState};
pub use payload::{build_save_request, workflow_from_details};
