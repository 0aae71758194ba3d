use async_trait::async_trait;

use super::{MetricBatch, MetricsError, MetricsSink};

/// Writes every datum as a structured log line. Used when no ingestion
/// endpoint is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMetricsSink;

#[async_trait]
impl MetricsSink for LogMetricsSink {
    async fn publish(&self, batch: &MetricBatch) -> Result<(), MetricsError> {
        for datum in &batch.data {
            tracing::info!(
                target: "metrics",
                namespace = %batch.namespace,
                dimensions = ?batch.dimensions,
                metric = %datum.name,
                value = datum.value,
                unit = ?datum.unit,
                "Metric"
            );
        }
        Ok(())
    }
}
