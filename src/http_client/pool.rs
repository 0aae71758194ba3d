//! A reusable, thread-safe pool for managing HTTP clients.
//!
//! Webhook and metrics delivery request clients from the pool by retry
//! policy; all clients share the pool's connection settings.

use std::{collections::HashMap, sync::Arc};

use reqwest_middleware::ClientWithMiddleware;
use thiserror::Error;
use tokio::sync::RwLock;

use super::client::create_retryable_http_client;
use crate::config::{BaseHttpClientConfig, HttpRetryConfig};

/// Errors that can occur within the `HttpClientPool`.
#[derive(Debug, Error)]
pub enum HttpClientPoolError {
    /// An error occurred while building the underlying `reqwest::Client`.
    #[error("Failed to create HTTP client: {0}")]
    HttpClientBuildError(String),
}

/// A pool of retryable HTTP clients keyed by retry policy.
pub struct HttpClientPool {
    base_config: BaseHttpClientConfig,
    clients: Arc<RwLock<HashMap<HttpRetryConfig, Arc<ClientWithMiddleware>>>>,
}

impl HttpClientPool {
    /// Creates a new, empty pool using the given connection settings.
    pub fn new(base_config: BaseHttpClientConfig) -> Self {
        Self { base_config, clients: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Gets the client for `retry_policy`, creating it on first use.
    ///
    /// Only one client per policy is ever created so that keep-alive
    /// connections are reused.
    pub async fn get_or_create(
        &self,
        retry_policy: &HttpRetryConfig,
    ) -> Result<Arc<ClientWithMiddleware>, HttpClientPoolError> {
        if let Some(client) = self.clients.read().await.get(retry_policy) {
            return Ok(client.clone());
        }

        let mut clients = self.clients.write().await;
        // Another task may have created the client while we waited for the lock.
        if let Some(client) = clients.get(retry_policy) {
            return Ok(client.clone());
        }

        let base_client = self
            .base_config
            .build_client(None)
            .map_err(|e| HttpClientPoolError::HttpClientBuildError(e.to_string()))?;

        let new_client = Arc::new(create_retryable_http_client(retry_policy, base_client, None));
        clients.insert(retry_policy.clone(), new_client.clone());

        Ok(new_client)
    }

    /// Returns the number of active HTTP clients in the pool.
    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Returns `true` when no client has been created yet.
    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }
}

impl Default for HttpClientPool {
    fn default() -> Self {
        Self::new(BaseHttpClientConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pool_returns_same_client_for_same_policy() {
        let pool = HttpClientPool::default();
        assert!(pool.is_empty().await);

        let retry_config = HttpRetryConfig::default();
        let client1 = pool.get_or_create(&retry_config).await.unwrap();
        let client2 = pool.get_or_create(&retry_config).await.unwrap();

        assert!(Arc::ptr_eq(&client1, &client2));
        assert_eq!(pool.len().await, 1);
    }

    #[tokio::test]
    async fn test_pool_separates_policies() {
        let pool = HttpClientPool::default();
        let default_policy = HttpRetryConfig::default();
        let patient_policy = HttpRetryConfig { max_retries: 5, ..Default::default() };

        let client1 = pool.get_or_create(&default_policy).await.unwrap();
        let client2 = pool.get_or_create(&patient_policy).await.unwrap();

        assert!(!Arc::ptr_eq(&client1, &client2));
        assert_eq!(pool.len().await, 2);
    }

    #[tokio::test]
    async fn test_pool_concurrent_access() {
        let pool = Arc::new(HttpClientPool::default());
        let mut tasks = Vec::new();
        for _ in 0..10 {
            let pool = Arc::clone(&pool);
            tasks.push(tokio::spawn(async move {
                pool.get_or_create(&HttpRetryConfig::default()).await.is_ok()
            }));
        }
        for task in tasks {
            assert!(task.await.unwrap());
        }
        assert_eq!(pool.len().await, 1);
    }
}
