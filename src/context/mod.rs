//! Builds every collaborator of a scan from the application configuration.

mod error;

use std::sync::Arc;

pub use error::AppContextError;
use tokio_util::sync::CancellationToken;

use crate::{
    config::AppConfig,
    engine::{ActivityAnalyzer, JobDirectory, ScanSettings, Scanner},
    http_client::HttpClientPool,
    metrics::{HttpMetricsSink, LogMetricsSink, MetricsSink},
    notification::{Notifier, WebhookNotifier},
    providers::RpcGateway,
};

/// Fully wired application components.
pub struct AppContext {
    /// The loaded configuration.
    pub config: AppConfig,
    /// The JSON-RPC gateway.
    pub gateway: Arc<RpcGateway>,
    /// Alert delivery.
    pub notifier: Arc<dyn Notifier>,
    /// Metric publication.
    pub metrics: Arc<dyn MetricsSink>,
}

impl AppContext {
    /// Scan settings derived from the configuration.
    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            sequencer_address: self.config.sequencer_address,
            network: self.config.network,
            block_window: self.config.block_window,
            alert_policy: self.config.alert_policy,
            chunk_delay: self.config.chunk_delay_ms,
            metrics_namespace: self.config.metrics.namespace.clone(),
        }
    }

    /// A scanner sharing this context's collaborators.
    pub fn scanner(&self, cancellation: CancellationToken) -> Scanner<RpcGateway> {
        Scanner::new(
            self.gateway.clone(),
            self.notifier.clone(),
            self.metrics.clone(),
            self.scan_settings(),
            cancellation,
        )
    }

    /// A job resolver over the gateway.
    pub fn directory(&self) -> JobDirectory<RpcGateway> {
        JobDirectory::new(self.gateway.clone())
    }

    /// A standalone analyzer over the gateway.
    pub fn analyzer(&self, cancellation: CancellationToken) -> ActivityAnalyzer<RpcGateway> {
        ActivityAnalyzer::new(self.gateway.clone(), self.config.chunk_delay_ms, cancellation)
    }
}

/// Loads the configuration and builds an [`AppContext`].
pub struct AppContextBuilder {
    config_dir: Option<String>,
}

impl AppContextBuilder {
    /// Creates a builder reading configuration from `config_dir`, or from
    /// the default `configs` directory when `None`.
    pub fn new(config_dir: Option<String>) -> Self {
        Self { config_dir }
    }

    /// Loads the configuration and wires the gateway, notifier and metrics
    /// sink.
    pub async fn build(self) -> Result<AppContext, AppContextError> {
        tracing::debug!(config_dir = ?self.config_dir, "Loading application configuration...");
        let config = AppConfig::new(self.config_dir.as_deref())?;
        tracing::info!(
            sequencer = %config.sequencer_address,
            block_window = config.block_window,
            policy = config.alert_policy.as_str(),
            "Configuration loaded."
        );

        tracing::debug!(rpc_url = %config.rpc_url, "Initializing RPC gateway...");
        let gateway = Arc::new(RpcGateway::from_config(
            config.rpc_url.clone(),
            &config.rpc_retry,
            &config.http_base_config,
        )?);
        tracing::info!(retry_policy = ?config.rpc_retry, "RPC gateway initialized.");

        let pool = HttpClientPool::new(config.http_base_config.clone());
        let client = pool.get_or_create(&config.http_retry_config).await?;

        let notifier: Arc<dyn Notifier> = Arc::new(WebhookNotifier::new(
            config.webhook_url.clone(),
            client.clone(),
            config.webhook_secret.clone(),
        )?);

        let metrics: Arc<dyn MetricsSink> = match &config.metrics.endpoint {
            Some(endpoint) => {
                tracing::info!(%endpoint, "Publishing metrics over HTTP.");
                Arc::new(HttpMetricsSink::new(endpoint.clone(), client))
            }
            None => {
                tracing::info!("No metrics endpoint configured, logging metrics instead.");
                Arc::new(LogMetricsSink)
            }
        };

        Ok(AppContext { config, gateway, notifier, metrics })
    }
}
