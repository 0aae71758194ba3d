use std::{path::Path, time::Duration};

use alloy::primitives::{Address, B256, b256};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::{
    BaseHttpClientConfig, HttpRetryConfig, RpcRetryConfig, deserialize_duration_from_ms,
    deserialize_duration_from_seconds, serialize_duration_to_ms, serialize_duration_to_seconds,
};

/// `"MAINNET"` right-padded to 32 bytes.
pub const MAINNET_NETWORK: B256 =
    b256!("4d41494e4e455400000000000000000000000000000000000000000000000000");

/// Smallest accepted block window.
const MIN_BLOCK_WINDOW: u64 = 1;

/// Largest accepted block window.
const MAX_BLOCK_WINDOW: u64 = 100;

/// Prefix of environment variables overriding file settings.
const ENV_PREFIX: &str = "SEQUENCER_MONITOR";

fn default_network() -> B256 {
    MAINNET_NETWORK
}

fn default_block_window() -> u64 {
    10
}

fn default_chunk_delay() -> Duration {
    Duration::from_millis(200)
}

fn default_polling_interval() -> Duration {
    Duration::from_secs(300)
}

fn default_scan_timeout() -> Duration {
    Duration::from_secs(240)
}

fn default_metrics_namespace() -> String {
    "SequencerMonitor".to_string()
}

/// Errors raised while loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The configuration could not be read or deserialized.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// A setting is present but out of bounds or malformed.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which alerting policy a scan applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPolicyKind {
    /// Alert when no work was executed in the window.
    #[default]
    Activity,
    /// Always send a per-job stale/workable summary.
    StaleJobs,
}

impl AlertPolicyKind {
    /// The configuration name of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertPolicyKind::Activity => "activity",
            AlertPolicyKind::StaleJobs => "stale_jobs",
        }
    }
}

/// Where execution metrics are pushed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Namespace attached to every metric.
    #[serde(default = "default_metrics_namespace")]
    pub namespace: String,

    /// Ingestion endpoint. Metrics are only logged when unset.
    #[serde(default)]
    pub endpoint: Option<Url>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { namespace: default_metrics_namespace(), endpoint: None }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// JSON-RPC endpoint of an Ethereum-compatible node.
    pub rpc_url: Url,

    /// Webhook receiving alerts.
    pub webhook_url: Url,

    /// Optional secret used to sign webhook payloads.
    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// Address of the Sequencer contract.
    pub sequencer_address: Address,

    /// Network identifier passed to `workable(network)`.
    #[serde(default = "default_network")]
    pub network: B256,

    /// Number of recent blocks analyzed per scan.
    #[serde(default = "default_block_window")]
    pub block_window: u64,

    /// Alerting policy.
    #[serde(default)]
    pub alert_policy: AlertPolicyKind,

    /// Pause between chunks of a chunked analysis.
    #[serde(
        default = "default_chunk_delay",
        deserialize_with = "deserialize_duration_from_ms",
        serialize_with = "serialize_duration_to_ms"
    )]
    pub chunk_delay_ms: Duration,

    /// Interval between scheduled scans.
    #[serde(
        default = "default_polling_interval",
        deserialize_with = "deserialize_duration_from_seconds",
        serialize_with = "serialize_duration_to_seconds"
    )]
    pub polling_interval_secs: Duration,

    /// Upper bound on the duration of one scan.
    #[serde(
        default = "default_scan_timeout",
        deserialize_with = "deserialize_duration_from_seconds",
        serialize_with = "serialize_duration_to_seconds"
    )]
    pub scan_timeout_secs: Duration,

    /// Retry and rate-limit policy for JSON-RPC requests.
    #[serde(default)]
    pub rpc_retry: RpcRetryConfig,

    /// Retry policy for webhook and metrics delivery.
    #[serde(default)]
    pub http_retry_config: HttpRetryConfig,

    /// Connection pool settings.
    #[serde(default)]
    pub http_base_config: BaseHttpClientConfig,

    /// Metrics settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl AppConfig {
    /// Loads `app.yaml` from the configuration directory, applies environment
    /// overrides and validates the result.
    pub fn new(config_dir: Option<&str>) -> Result<Self, ConfigurationError> {
        let config_dir = config_dir.unwrap_or("configs");
        let app_file = Path::new(config_dir).join("app.yaml");
        let s = Config::builder()
            .add_source(File::from(app_file))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;
        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks bounds that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(MIN_BLOCK_WINDOW..=MAX_BLOCK_WINDOW).contains(&self.block_window) {
            return Err(ConfigurationError::Invalid(format!(
                "block_window must be between {MIN_BLOCK_WINDOW} and {MAX_BLOCK_WINDOW}, got {}",
                self.block_window
            )));
        }
        if self.sequencer_address == Address::ZERO {
            return Err(ConfigurationError::Invalid(
                "sequencer_address must not be the zero address".into(),
            ));
        }
        for (name, url) in [("rpc_url", &self.rpc_url), ("webhook_url", &self.webhook_url)] {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigurationError::Invalid(format!(
                    "{name} must be an http(s) URL, got {url}"
                )));
            }
        }
        if self.rpc_retry.max_attempts == 0 {
            return Err(ConfigurationError::Invalid("rpc_retry.max_attempts must be at least 1".into()));
        }
        if self.rpc_retry.initial_backoff_ms > self.rpc_retry.max_backoff_secs {
            return Err(ConfigurationError::Invalid(
                "rpc_retry.initial_backoff_ms must not exceed rpc_retry.max_backoff_secs".into(),
            ));
        }
        if self.polling_interval_secs.is_zero() {
            return Err(ConfigurationError::Invalid("polling_interval_secs must be positive".into()));
        }
        if self.webhook_secret.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigurationError::Invalid("webhook_secret must not be empty".into()));
        }
        Ok(())
    }
}
