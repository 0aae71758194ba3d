//! Configuration module for the Sequencer monitor.

mod app_config;
mod helpers;
mod http_base;
mod http_retry;
mod rpc_retry;

pub use app_config::{
    AlertPolicyKind, AppConfig, ConfigurationError, MAINNET_NETWORK, MetricsConfig,
};
pub use helpers::{
    deserialize_duration_from_ms, deserialize_duration_from_seconds, serialize_duration_to_ms,
    serialize_duration_to_seconds,
};
pub use http_base::BaseHttpClientConfig;
pub use http_retry::{HttpRetryConfig, JitterSetting};
pub use rpc_retry::RpcRetryConfig;
