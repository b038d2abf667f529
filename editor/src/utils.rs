//! Utility functions

use std::time::Duration;

/// Backoff options for save retries
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOptions {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Delay before the given zero-based retry, capped at `max_delay`
pub fn calc_exp_backoff(options: &RetryOptions, retry: u32) -> Duration {
    let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
    let secs = options.base_delay.as_secs_f64() * options.multiplier.powi(exponent);
    Duration::try_from_secs_f64(secs).map_or(options.max_delay, |d| d.min(options.max_delay))
}

/// Generate a random UUID v4
pub fn generate_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current UTC time in milliseconds, as a version token
pub fn now_millis_token() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

/// Resolves once `true` is sent; never if the sender is gone
pub async fn wait_for_shutdown(mut shutdown: tokio::sync::watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Lowercase hex SHA-256 of `data`
pub fn sha256_hex(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    format!("{:x}", Sha256::digest(data))
}
