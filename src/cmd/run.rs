//! `run`: scans on a schedule until interrupted.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::Error;
use crate::{context::AppContextBuilder, supervisor::Supervisor};

/// Builds the application and hands control to the supervisor.
pub async fn execute(config_dir: Option<String>) -> Result<(), Error> {
    let context = AppContextBuilder::new(config_dir).build().await?;

    let cancellation_token = CancellationToken::new();
    let scanner = Arc::new(context.scanner(cancellation_token.clone()));
    let supervisor = Supervisor::builder()
        .scanner(scanner)
        .polling_interval(context.config.polling_interval_secs)
        .scan_timeout(context.config.scan_timeout_secs)
        .cancellation_token(cancellation_token)
        .build()?;

    tracing::info!("Supervisor initialized, starting monitoring...");
    supervisor.run().await?;
    Ok(())
}
