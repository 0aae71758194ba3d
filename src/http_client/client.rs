//! This module provides functionality to create a retryable HTTP client with
//! middleware for handling transient errors, such as network issues or rate
//! limiting.

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{Jitter, RetryTransientMiddleware, policies::ExponentialBackoff};

use super::RateLimiter;
use crate::config::{HttpRetryConfig, JitterSetting};

/// Creates a retryable HTTP client.
///
/// # Parameters:
/// - `config`: Configuration for retry policies
/// - `base_client`: The base HTTP client to use
/// - `rate_limiter`: When set, every attempt (retries included) waits for a
///   free slot before it is sent
///
/// # Returns
/// A `ClientWithMiddleware` that includes retry capabilities
pub fn create_retryable_http_client(
    config: &HttpRetryConfig,
    base_client: reqwest::Client,
    rate_limiter: Option<RateLimiter>,
) -> ClientWithMiddleware {
    let policy_builder = match config.jitter {
        JitterSetting::None => ExponentialBackoff::builder().jitter(Jitter::None),
        JitterSetting::Full => ExponentialBackoff::builder().jitter(Jitter::Full),
    };

    // `retry_bounds` panics when the lower bound exceeds the upper one.
    let max_backoff = config.max_backoff_secs.max(config.initial_backoff_ms);
    let retry_policy = policy_builder
        .base(config.base_for_backoff)
        .retry_bounds(config.initial_backoff_ms, max_backoff)
        .build_with_max_retries(config.max_retries);

    let builder = ClientBuilder::new(base_client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy));

    match rate_limiter {
        Some(limiter) => builder.with(limiter).build(),
        None => builder.build(),
    }
}
