//! Execution metrics published after every scan.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use serde::Serialize;
use thiserror::Error;

use crate::http_client::HttpClientPoolError;

mod http_sink;
mod log_sink;

pub use http_sink::HttpMetricsSink;
pub use log_sink::LogMetricsSink;

/// Metric names published by the scanner.
pub mod names {
    /// Wall-clock duration of the invocation.
    pub const EXECUTION_DURATION: &str = "ExecutionDuration";
    /// Failed RPC requests and batch items.
    pub const RPC_FAILURES: &str = "RpcFailures";
    /// Remote calls consumed by the activity analysis.
    pub const RPC_CALLS: &str = "RpcCalls";
    /// Alerts delivered.
    pub const ALERTS_SENT: &str = "AlertsSent";
    /// Work executions found in the window.
    pub const WORK_TRANSACTIONS: &str = "WorkTransactions";
    /// Jobs resolved from the Sequencer.
    pub const JOBS_MONITORED: &str = "JobsMonitored";
    /// Jobs that did not work in the window.
    pub const STALE_JOBS: &str = "StaleJobs";
    /// `1` for a successful scan, `0` for a failed one.
    pub const SCAN_HEALTH: &str = "ScanHealth";
    /// Published by the connectivity test.
    pub const CONNECTIVITY_TEST: &str = "ConnectivityTest";
}

/// Errors that can occur while publishing metrics.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// No HTTP client could be built.
    #[error("HTTP client error: {0}")]
    Client(#[from] HttpClientPoolError),

    /// The request could not be sent.
    #[error("Request error: {0}")]
    Request(#[from] reqwest_middleware::Error),

    /// The ingestion endpoint answered with an error status.
    #[error("Metrics endpoint rejected the batch: {0}")]
    Rejected(String),
}

/// Unit of a metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MetricUnit {
    /// Milliseconds.
    Milliseconds,
    /// A plain count.
    Count,
}

/// One measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDatum {
    /// Metric name.
    pub name: String,
    /// Measured value.
    pub value: f64,
    /// Unit of `value`.
    pub unit: MetricUnit,
}

/// The measurements of one invocation, sharing a namespace and dimensions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricBatch {
    /// Namespace attached to every datum.
    pub namespace: String,
    /// Dimension tags attached to every datum.
    pub dimensions: BTreeMap<String, String>,
    /// The measurements.
    pub data: Vec<MetricDatum>,
    /// When the batch was assembled.
    pub timestamp: DateTime<Utc>,
}

impl MetricBatch {
    /// Creates an empty batch.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            dimensions: BTreeMap::new(),
            data: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Adds a dimension tag.
    pub fn with_dimension(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.dimensions.insert(name.into(), value.to_string());
        self
    }

    /// Adds a count.
    pub fn count(&mut self, name: &str, value: u64) {
        self.push(name, value as f64, MetricUnit::Count);
    }

    /// Adds a measurement.
    pub fn push(&mut self, name: &str, value: f64, unit: MetricUnit) {
        self.data.push(MetricDatum { name: name.to_string(), value, unit });
    }

    /// The value of the first datum called `name`.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.data.iter().find(|datum| datum.name == name).map(|datum| datum.value)
    }
}

/// A destination for execution metrics.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Publishes one batch.
    async fn publish(&self, batch: &MetricBatch) -> Result<(), MetricsError>;
}
