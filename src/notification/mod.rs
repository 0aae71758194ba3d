//! # Notification Service
//!
//! Delivers alerts produced by the alert policies. The [`Notifier`] trait is
//! the seam the scanner talks to; [`WebhookNotifier`] posts an embed payload
//! (see [`payload_builder`]) to the configured webhook using a retryable
//! client from the shared `HttpClientPool`.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::models::Alert;

pub mod error;
pub mod payload_builder;
mod webhook;

pub use error::NotificationError;
pub use webhook::WebhookNotifier;

/// Delivers alerts to operators.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one alert.
    async fn notify(&self, alert: &Alert) -> Result<(), NotificationError>;
}
