//! Editor wiring and configuration

pub mod editor;
pub mod options;

pub use editor::WorkflowEditor;
pub use options::{AutoSaveOptions, EditorOptions, HistoryOptions};
