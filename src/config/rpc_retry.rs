use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{
    HttpRetryConfig, JitterSetting, deserialize_duration_from_ms,
    deserialize_duration_from_seconds, serialize_duration_to_ms, serialize_duration_to_seconds,
};

/// Retry, backoff and rate-limit policy applied to every JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RpcRetryConfig {
    /// Total attempts per request, including the first one.
    pub max_attempts: u32,
    /// Base of the exponential backoff.
    pub base_for_backoff: u32,
    /// Delay before the first retry.
    #[serde(
        deserialize_with = "deserialize_duration_from_ms",
        serialize_with = "serialize_duration_to_ms"
    )]
    pub initial_backoff_ms: Duration,
    /// Upper bound of any single backoff delay.
    #[serde(
        deserialize_with = "deserialize_duration_from_seconds",
        serialize_with = "serialize_duration_to_seconds"
    )]
    pub max_backoff_secs: Duration,
    /// Jitter applied to backoff delays.
    pub jitter: JitterSetting,
    /// Ceiling on outbound requests per second. `0` disables rate limiting.
    pub requests_per_second: u32,
    /// Timeout of a single HTTP attempt.
    #[serde(
        deserialize_with = "deserialize_duration_from_seconds",
        serialize_with = "serialize_duration_to_seconds"
    )]
    pub request_timeout_secs: Duration,
}

impl Default for RpcRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_for_backoff: 2,
            initial_backoff_ms: Duration::from_millis(500),
            max_backoff_secs: Duration::from_secs(10),
            jitter: JitterSetting::Full,
            requests_per_second: 25,
            request_timeout_secs: Duration::from_secs(30),
        }
    }
}

impl RpcRetryConfig {
    /// The HTTP retry policy equivalent to this configuration.
    pub fn http_retry(&self) -> HttpRetryConfig {
        HttpRetryConfig {
            max_retries: self.max_attempts.saturating_sub(1),
            base_for_backoff: self.base_for_backoff,
            initial_backoff_ms: self.initial_backoff_ms,
            max_backoff_secs: self.max_backoff_secs.max(self.initial_backoff_ms),
            jitter: self.jitter,
        }
    }

    /// Minimum spacing between two outbound requests.
    pub fn min_request_interval(&self) -> Duration {
        if self.requests_per_second == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / self.requests_per_second
        }
    }
}

#[cfg(test)]
mod tests {
    use config::Config;

    use super::*;

    #[test]
    fn test_rpc_retry_config_with_custom_values() {
        let yaml = "
            max_attempts: 5
            initial_backoff_ms: 100
            max_backoff_secs: 2
            requests_per_second: 10
        ";

        let builder =
            Config::builder().add_source(config::File::from_str(yaml, config::FileFormat::Yaml));
        let config: RpcRetryConfig = builder.build().unwrap().try_deserialize().unwrap();

        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.initial_backoff_ms, Duration::from_millis(100));
        assert_eq!(config.max_backoff_secs, Duration::from_secs(2));
        assert_eq!(config.requests_per_second, 10);
        assert_eq!(config.request_timeout_secs, Duration::from_secs(30));
    }

    #[test]
    fn test_rpc_retry_config_without_custom_values_uses_default() {
        let builder =
            Config::builder().add_source(config::File::from_str("", config::FileFormat::Yaml));
        let config: RpcRetryConfig = builder.build().unwrap().try_deserialize().unwrap();
        assert_eq!(config, RpcRetryConfig::default());
    }

    #[test]
    fn test_http_retry_counts_retries_after_first_attempt() {
        let config = RpcRetryConfig { max_attempts: 3, ..Default::default() };
        assert_eq!(config.http_retry().max_retries, 2);

        let single = RpcRetryConfig { max_attempts: 1, ..Default::default() };
        assert_eq!(single.http_retry().max_retries, 0);
    }

    #[test]
    fn test_min_request_interval() {
        let config = RpcRetryConfig { requests_per_second: 4, ..Default::default() };
        assert_eq!(config.min_request_interval(), Duration::from_millis(250));

        let unlimited = RpcRetryConfig { requests_per_second: 0, ..Default::default() };
        assert_eq!(unlimited.min_request_interval(), Duration::ZERO);
    }
}
