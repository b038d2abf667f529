//! Wire models shared with the nuwax workflow backend.

pub mod models;

pub use models::*;
