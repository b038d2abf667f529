//! Integration tests for the workflow editor core

mod fixtures;

mod test_autosave;
mod test_editor;
mod test_graph_store;
mod test_history;
mod test_validator;
