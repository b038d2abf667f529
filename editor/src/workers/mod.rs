//! Background workers

pub mod autosave;
