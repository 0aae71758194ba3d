//! `invoke`: serves a single invocation and prints its JSON response.

use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use super::Error;
use crate::{context::AppContextBuilder, models::ScanRequest};

/// Arguments of the `invoke` subcommand.
#[derive(Parser, Debug, Default)]
pub struct InvokeArgs {
    /// Probe every collaborator instead of scanning.
    #[arg(long)]
    pub test_connection: bool,
    /// Report the job count and the current block instead of scanning.
    #[arg(long)]
    pub status: bool,
    /// A raw invocation event, e.g. `{"testConnection":true}`.
    #[arg(long)]
    pub event: Option<String>,
}

impl InvokeArgs {
    /// The request described by the event and the flags. Flags only ever
    /// switch a variant on.
    pub fn request(&self) -> Result<ScanRequest, Error> {
        let mut request = match &self.event {
            Some(event) => serde_json::from_str::<ScanRequest>(event)?,
            None => ScanRequest::default(),
        };
        request.test_connection |= self.test_connection;
        request.status |= self.status;
        Ok(request)
    }
}

/// Runs one invocation. The exit code is non-zero when it did not succeed.
pub async fn execute(config_dir: Option<String>, args: InvokeArgs) -> Result<ExitCode, Error> {
    let request = args.request()?;
    let context = AppContextBuilder::new(config_dir).build().await?;
    let scanner = context.scanner(CancellationToken::new());

    tracing::debug!(?request, "Handling invocation.");
    let response = scanner.handle(request).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(if response.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flags_is_a_full_scan() {
        assert_eq!(InvokeArgs::default().request().unwrap(), ScanRequest::default());
    }

    #[test]
    fn test_event_and_flags_combine() {
        let args = InvokeArgs {
            status: true,
            event: Some(r#"{"testConnection":true}"#.into()),
            ..Default::default()
        };
        assert_eq!(
            args.request().unwrap(),
            ScanRequest { test_connection: true, status: true }
        );
    }

    #[test]
    fn test_malformed_event_is_rejected() {
        let args = InvokeArgs { event: Some("{not json".into()), ..Default::default() };
        assert!(matches!(args.request(), Err(Error::Json(_))));
    }
}
