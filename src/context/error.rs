use thiserror::Error;

use crate::{
    config::ConfigurationError, http_client::HttpClientPoolError,
    notification::NotificationError,
};

/// Errors that can occur during application context initialization.
#[derive(Debug, Error)]
pub enum AppContextError {
    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigurationError),

    /// The RPC client could not be built.
    #[error("RPC client error: {0}")]
    Http(#[from] reqwest::Error),

    /// A pooled HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(#[from] HttpClientPoolError),

    /// The notifier could not be created.
    #[error("Notifier error: {0}")]
    Notification(#[from] NotificationError),
}
