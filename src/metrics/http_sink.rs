use std::sync::Arc;

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use url::Url;

use super::{MetricBatch, MetricsError, MetricsSink};

/// Posts metric batches as JSON to an ingestion endpoint.
pub struct HttpMetricsSink {
    endpoint: Url,
    client: Arc<ClientWithMiddleware>,
}

impl HttpMetricsSink {
    /// Creates a sink posting to `endpoint`.
    pub fn new(endpoint: Url, client: Arc<ClientWithMiddleware>) -> Self {
        Self { endpoint, client }
    }
}

#[async_trait]
impl MetricsSink for HttpMetricsSink {
    #[tracing::instrument(skip_all, fields(namespace = %batch.namespace, data = batch.data.len()), level = "debug")]
    async fn publish(&self, batch: &MetricBatch) -> Result<(), MetricsError> {
        let response = self.client.post(self.endpoint.clone()).json(batch).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MetricsError::Rejected(format!("status {status}")));
        }
        tracing::debug!("Metrics published.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;
    use crate::metrics::names;

    fn sink(server: &mockito::Server) -> HttpMetricsSink {
        let client = Arc::new(reqwest_middleware::ClientBuilder::new(reqwest::Client::new()).build());
        HttpMetricsSink::new(Url::parse(&server.url()).unwrap().join("/metrics").unwrap(), client)
    }

    #[tokio::test]
    async fn test_publish_posts_batch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/metrics")
            .match_body(Matcher::PartialJson(json!({
                "namespace": "SequencerMonitor",
                "dimensions": {"Policy": "activity"},
                "data": [{"name": "ScanHealth", "value": 1.0, "unit": "Count"}]
            })))
            .with_status(200)
            .create_async()
            .await;

        let mut batch = MetricBatch::new("SequencerMonitor").with_dimension("Policy", "activity");
        batch.count(names::SCAN_HEALTH, 1);
        sink(&server).publish(&batch).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_publish_reports_rejection() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("POST", "/metrics").with_status(403).create_async().await;

        let err = sink(&server).publish(&MetricBatch::new("ns")).await.unwrap_err();
        assert!(matches!(err, MetricsError::Rejected(_)));
    }
}
