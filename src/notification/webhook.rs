//! Webhook notification implementation.
//!
//! Posts alerts as embed payloads, optionally signed with HMAC-SHA256.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest_middleware::ClientWithMiddleware;
use sha2::Sha256;
use url::Url;

use super::{Notifier, error::NotificationError, payload_builder::EmbedPayload};
use crate::models::Alert;

/// HMAC SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

/// Delivers alerts to a single webhook endpoint.
#[derive(Debug)]
pub struct WebhookNotifier {
    /// Webhook URL for message delivery
    url: Url,
    /// Configured HTTP client for webhook requests with retry capabilities
    client: Arc<ClientWithMiddleware>,
    /// Secret used to sign the request body
    secret: Option<String>,
}

impl WebhookNotifier {
    /// Creates a new webhook notifier.
    ///
    /// Fails when `secret` is set but empty.
    pub fn new(
        url: Url,
        client: Arc<ClientWithMiddleware>,
        secret: Option<String>,
    ) -> Result<Self, NotificationError> {
        if secret.as_deref().is_some_and(str::is_empty) {
            return Err(NotificationError::ConfigError(
                "Invalid secret: cannot be empty.".to_string(),
            ));
        }
        Ok(Self { url, client, secret })
    }

    /// Signs `body` with `secret`, returning the hex signature and the
    /// millisecond timestamp that was signed along with it.
    pub fn sign_payload(secret: &str, body: &str) -> Result<(String, String), NotificationError> {
        // `new_from_slice` accepts empty keys.
        if secret.is_empty() {
            return Err(NotificationError::NotifyFailed(
                "Invalid secret: cannot be empty.".to_string(),
            ));
        }

        let timestamp = Utc::now().timestamp_millis();
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| NotificationError::ConfigError(format!("Invalid secret: {e}")))?;
        mac.update(format!("{body}{timestamp}").as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok((signature, timestamp.to_string()))
    }

    /// Sends a JSON payload to the webhook.
    pub async fn notify_json(&self, payload: &serde_json::Value) -> Result<(), NotificationError> {
        let body = serde_json::to_string(payload).map_err(|e| {
            NotificationError::InternalError(format!("Failed to serialize payload: {e}"))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(secret) = &self.secret {
            let (signature, timestamp) = Self::sign_payload(secret, &body)?;
            headers.insert(
                HeaderName::from_static("x-signature"),
                HeaderValue::from_str(&signature).map_err(|e| {
                    NotificationError::NotifyFailed(format!("Invalid signature value: {e}"))
                })?,
            );
            headers.insert(
                HeaderName::from_static("x-timestamp"),
                HeaderValue::from_str(&timestamp).map_err(|e| {
                    NotificationError::NotifyFailed(format!("Invalid timestamp value: {e}"))
                })?,
            );
        }

        let response =
            self.client.post(self.url.clone()).headers(headers).body(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::NotifyFailed(format!(
                "Webhook request failed with status: {status}"
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    #[tracing::instrument(skip_all, fields(title = %alert.title, severity = ?alert.severity))]
    async fn notify(&self, alert: &Alert) -> Result<(), NotificationError> {
        let payload = serde_json::to_value(EmbedPayload::from(alert)).map_err(|e| {
            NotificationError::InternalError(format!("Failed to build payload: {e}"))
        })?;
        self.notify_json(&payload).await?;
        tracing::info!("Alert delivered.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Mock};
    use serde_json::json;

    use super::*;
    use crate::{
        http_client::create_retryable_http_client, models::Severity,
        test_helpers::fast_http_retry,
    };

    fn create_test_http_client() -> Arc<ClientWithMiddleware> {
        Arc::new(reqwest_middleware::ClientBuilder::new(reqwest::Client::new()).build())
    }

    fn create_test_notifier(url: &str, secret: Option<&str>) -> WebhookNotifier {
        WebhookNotifier::new(
            Url::parse(url).unwrap(),
            create_test_http_client(),
            secret.map(str::to_string),
        )
        .unwrap()
    }

    #[test]
    fn test_sign_payload() {
        let (signature, timestamp) =
            WebhookNotifier::sign_payload("test-secret", r#"{"title":"Test"}"#).unwrap();

        assert!(hex::decode(&signature).is_ok(), "Signature should be valid hex");
        assert_eq!(signature.len(), 64);
        assert!(timestamp.parse::<i64>().is_ok(), "Timestamp should be valid i64");
    }

    #[test]
    fn test_sign_payload_fails_empty_secret() {
        let error = WebhookNotifier::sign_payload("", "{}").unwrap_err();
        assert!(matches!(error, NotificationError::NotifyFailed(_)));
    }

    #[test]
    fn test_new_rejects_empty_secret() {
        let result = WebhookNotifier::new(
            Url::parse("https://webhook.example.com").unwrap(),
            create_test_http_client(),
            Some(String::new()),
        );
        assert!(matches!(result, Err(NotificationError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_notify_posts_embed_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock: Mock = server
            .mock("POST", "/")
            .match_header("Content-Type", "application/json")
            .match_body(Matcher::PartialJson(json!({
                "embeds": [{"title": "No activity", "color": 0xE74C3C}]
            })))
            .with_status(204)
            .create_async()
            .await;

        let notifier = create_test_notifier(&server.url(), None);
        notifier.notify(&Alert::new("No activity", "Nothing worked", Severity::High)).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_notify_includes_signature_and_timestamp() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("X-Signature", Matcher::Regex("^[0-9a-f]{64}$".to_string()))
            .match_header("X-Timestamp", Matcher::Regex("^[0-9]+$".to_string()))
            .with_status(200)
            .create_async()
            .await;

        let notifier = create_test_notifier(&server.url(), Some("top-secret"));
        notifier.notify(&Alert::new("t", "d", Severity::Info)).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_notify_without_secret_is_unsigned() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("X-Signature", Matcher::Missing)
            .with_status(200)
            .create_async()
            .await;

        let notifier = create_test_notifier(&server.url(), None);
        notifier.notify(&Alert::new("t", "d", Severity::Info)).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_notify_fails_on_error_status_after_retries() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/").with_status(502).expect(3).create_async().await;

        let client =
            Arc::new(create_retryable_http_client(&fast_http_retry(2), reqwest::Client::new(), None));
        let notifier = WebhookNotifier::new(Url::parse(&server.url()).unwrap(), client, None).unwrap();
        let err = notifier.notify(&Alert::new("t", "d", Severity::High)).await.unwrap_err();

        assert!(err.to_string().contains("502"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_notify_unreachable_endpoint_fails() {
        let notifier = create_test_notifier("http://127.0.0.1:1", None);
        let result = notifier.notify(&Alert::new("t", "d", Severity::High)).await;
        assert!(result.is_err());
    }
}
