//! Nuwax workflow editor core
//!
//! In-memory workflow graph with edge synchronization, validation,
//! undo/redo and a retrying save pipeline.

pub mod app;
pub mod errors;
pub mod graph;
pub mod history;
pub mod http;
pub mod logs;
pub mod models;
pub mod persist;
pub mod storage;
pub mod utils;
pub mod validate;
pub mod workers;
