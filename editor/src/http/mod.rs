//! HTTP client for the workflow backend

pub mod client;
pub mod workflows;

pub use client::HttpClient;
