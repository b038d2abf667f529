//! In-memory workflow graph: store and edge synchronizer

pub mod store;
pub mod sync;

pub use store::{GraphOp, GraphStore, Location, NodePatch};
pub use sync::{edges_from_nodes, Link, Slot};
