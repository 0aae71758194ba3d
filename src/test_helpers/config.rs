use std::time::Duration;

use alloy::primitives::{Address, B256};

use crate::{
    config::{AlertPolicyKind, HttpRetryConfig, JitterSetting, RpcRetryConfig},
    engine::ScanSettings,
};

/// An RPC policy with millisecond backoff and no rate limit.
pub fn fast_rpc_retry(max_attempts: u32) -> RpcRetryConfig {
    RpcRetryConfig {
        max_attempts,
        initial_backoff_ms: Duration::from_millis(1),
        max_backoff_secs: Duration::from_millis(5),
        jitter: JitterSetting::None,
        requests_per_second: 0,
        request_timeout_secs: Duration::from_secs(5),
        ..Default::default()
    }
}

/// A webhook/metrics retry policy with millisecond backoff.
pub fn fast_http_retry(max_retries: u32) -> HttpRetryConfig {
    HttpRetryConfig {
        max_retries,
        initial_backoff_ms: Duration::from_millis(1),
        max_backoff_secs: Duration::from_millis(5),
        jitter: JitterSetting::None,
        ..Default::default()
    }
}

/// Scan settings for a 10-block window with the given policy.
pub fn test_scan_settings(policy: AlertPolicyKind) -> ScanSettings {
    ScanSettings {
        sequencer_address: Address::repeat_byte(0x5e),
        network: B256::with_last_byte(1),
        block_window: 10,
        alert_policy: policy,
        chunk_delay: Duration::ZERO,
        metrics_namespace: "SequencerMonitorTest".to_string(),
    }
}
