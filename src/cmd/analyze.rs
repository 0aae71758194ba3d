//! `analyze`: runs the activity analysis over an arbitrary window and prints
//! the result without alerting.

use clap::Parser;
use tokio_util::sync::CancellationToken;

use super::Error;
use crate::context::AppContextBuilder;

/// Arguments of the `analyze` subcommand.
#[derive(Parser, Debug)]
pub struct AnalyzeArgs {
    /// Number of blocks to analyze, ending at the latest block.
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub blocks: u64,
}

/// Resolves the configured Sequencer's jobs and analyzes the last
/// `args.blocks` blocks. Ctrl+C cancels a running chunked analysis.
pub async fn execute(config_dir: Option<String>, args: AnalyzeArgs) -> Result<(), Error> {
    let context = AppContextBuilder::new(config_dir).build().await?;

    let cancellation_token = CancellationToken::new();
    let interrupt = cancellation_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling analysis.");
            interrupt.cancel();
        }
    });

    let jobs = context.directory().get_job_addresses(context.config.sequencer_address).await?;
    tracing::info!(jobs = jobs.len(), blocks = args.blocks, "Starting analysis...");

    let result = context.analyzer(cancellation_token).analyze(&jobs, args.blocks).await?;
    tracing::info!(
        method = %result.method,
        work_transactions = result.total_work_transactions,
        rpc_calls = result.rpc_calls_count,
        "Analysis finished."
    );

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
