use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sequencer_monitor::cmd::{AnalyzeArgs, InvokeArgs, analyze, invoke, run};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding `app.yaml`. Defaults to `configs`.
    #[arg(long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scans on a schedule until interrupted.
    Run,
    /// Serves a single scan, connectivity test or status query.
    Invoke(InvokeArgs),
    /// Analyzes job activity over the last N blocks without alerting.
    Analyze(AnalyzeArgs),
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let subscriber =
        FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env()).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Run => {
            run::execute(cli.config_dir).await?;
            ExitCode::SUCCESS
        }
        Commands::Invoke(args) => invoke::execute(cli.config_dir, args).await?,
        Commands::Analyze(args) => {
            analyze::execute(cli.config_dir, args).await?;
            ExitCode::SUCCESS
        }
    };

    Ok(exit_code)
}
