//! Retryable, rate-limited HTTP clients and a pool for sharing them.

mod client;
mod pool;
mod rate_limit;

pub use client::create_retryable_http_client;
pub use pool::{HttpClientPool, HttpClientPoolError};
pub use rate_limit::RateLimiter;
