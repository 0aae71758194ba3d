//! The scanner runs one invocation: resolve jobs, analyze their activity,
//! apply the alert policy and publish metrics.

use std::{sync::Arc, time::Duration};

use alloy::primitives::{Address, B256};
use chrono::Utc;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{
    activity_analyzer::{ActivityAnalyzer, AnalyzerError},
    alert_policy::{AlertPolicy, PolicyError, create_alert_policy},
    job_directory::{DirectoryError, JobDirectory},
};
use crate::{
    config::AlertPolicyKind,
    metrics::{MetricBatch, MetricUnit, MetricsError, MetricsSink, names},
    models::{
        ActivityResult, Alert, AlertField, AnalysisMethod, BlockWindow, ConnectivityCheck,
        ScanPhase, ScanReport, ScanRequest, ScanResponse, Severity, StatusReport,
    },
    notification::{NotificationError, Notifier},
    providers::{ChainSource, RpcError, RpcStats},
};

/// What a scan looks at and how it alerts.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    /// The Sequencer registry.
    pub sequencer_address: Address,
    /// Network identifier passed to `workable`.
    pub network: B256,
    /// Number of recent blocks analyzed.
    pub block_window: u64,
    /// The alert policy.
    pub alert_policy: AlertPolicyKind,
    /// Pause between chunks of a chunked analysis.
    pub chunk_delay: Duration,
    /// Namespace of published metrics.
    pub metrics_namespace: String,
}

/// Errors that abort a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Job resolution failed.
    #[error("Job resolution failed: {0}")]
    Directory(#[from] DirectoryError),

    /// Activity analysis failed.
    #[error("Activity analysis failed: {0}")]
    Analyzer(#[from] AnalyzerError),

    /// A direct chain read failed.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// The alert policy failed.
    #[error("Alert policy failed: {0}")]
    Policy(#[from] PolicyError),

    /// The alert could not be delivered.
    #[error("Alert delivery failed: {0}")]
    Notification(#[from] NotificationError),

    /// Metrics could not be published.
    #[error("Metrics publishing failed: {0}")]
    Metrics(#[from] MetricsError),
}

/// Progress of one scan, kept so a failure can still be reported.
struct ScanState {
    phase: ScanPhase,
    started: Instant,
    rpc_before: RpcStats,
    invocation_id: String,
    jobs_monitored: usize,
    activity: Option<ActivityResult>,
    stale_jobs: Option<usize>,
    alerts_sent: u64,
}

/// Runs scans, connectivity tests and status queries.
pub struct Scanner<C: ?Sized> {
    chain: Arc<C>,
    directory: Arc<JobDirectory<C>>,
    analyzer: ActivityAnalyzer<C>,
    policy: Arc<dyn AlertPolicy>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<dyn MetricsSink>,
    settings: ScanSettings,
}

impl<C: ChainSource + ?Sized + 'static> Scanner<C> {
    /// Creates a scanner. The policy is built from `settings.alert_policy`.
    pub fn new(
        chain: Arc<C>,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<dyn MetricsSink>,
        settings: ScanSettings,
        cancellation: CancellationToken,
    ) -> Self {
        let directory = Arc::new(JobDirectory::new(chain.clone()));
        let analyzer = ActivityAnalyzer::new(chain.clone(), settings.chunk_delay, cancellation);
        let policy = create_alert_policy(settings.alert_policy, directory.clone(), settings.network);
        Self { chain, directory, analyzer, policy, notifier, metrics, settings }
    }

    /// Serves one invocation.
    pub async fn handle(&self, request: ScanRequest) -> ScanResponse {
        if request.test_connection {
            self.test_connectivity().await
        } else if request.status {
            self.status().await
        } else {
            ScanResponse::Scan(self.run_scan().await)
        }
    }

    /// Runs a full scan. Failures are reported in the returned report.
    #[tracing::instrument(skip(self), fields(policy = self.settings.alert_policy.as_str()))]
    pub async fn run_scan(&self) -> ScanReport {
        let started = Instant::now();
        let mut state = ScanState {
            phase: ScanPhase::Idle,
            started,
            rpc_before: self.chain.stats(),
            invocation_id: format!("{}-{}", Utc::now().timestamp_millis(), std::process::id()),
            jobs_monitored: 0,
            activity: None,
            stale_jobs: None,
            alerts_sent: 0,
        };

        match self.execute(&mut state).await {
            Ok(()) => {
                tracing::info!(
                    jobs = state.jobs_monitored,
                    alerts_sent = state.alerts_sent,
                    "Scan complete."
                );
                self.report(state, None)
            }
            Err(error) => {
                let failed_phase = state.phase;
                tracing::error!(phase = ?failed_phase, %error, "Scan failed.");
                self.report_failure(&mut state, &error).await;
                self.report(state, Some((failed_phase, error)))
            }
        }
    }

    async fn execute(&self, state: &mut ScanState) -> Result<(), ScanError> {
        state.phase = ScanPhase::ResolvingJobs;
        let jobs = self.directory.get_job_addresses(self.settings.sequencer_address).await?;
        state.jobs_monitored = jobs.len();

        if jobs.is_empty() {
            let latest_block = self.chain.get_latest_block_number().await?;
            let window_size = self.settings.block_window;
            state.activity = Some(ActivityResult {
                total_work_transactions: 0,
                last_analyzed_block: latest_block,
                rpc_calls_count: 1,
                method: AnalysisMethod::for_window(window_size),
                window: BlockWindow::ending_at(latest_block, window_size),
                blocks: Vec::new(),
                fallback_from: None,
            });
            state.stale_jobs = Some(0);
        } else {
            state.phase = ScanPhase::AnalyzingActivity;
            let activity = self.analyzer.analyze(&jobs, self.settings.block_window).await?;

            state.phase = ScanPhase::Notifying;
            let outcome = self.policy.evaluate(&jobs, &activity).await?;
            state.activity = Some(activity);
            state.stale_jobs = outcome.stale_jobs;
            if let Some(alert) = outcome.alert {
                self.notifier.notify(&alert).await?;
                state.alerts_sent += 1;
            }
        }

        state.phase = ScanPhase::PublishingMetrics;
        self.metrics.publish(&self.metric_batch(state, true)).await?;

        state.phase = ScanPhase::Done;
        Ok(())
    }

    /// Best-effort error alert and failure metrics.
    async fn report_failure(&self, state: &mut ScanState, error: &ScanError) {
        let alert = Alert::new("Sequencer monitor scan failed", error.to_string(), Severity::High)
            .with_field(AlertField::inline("Phase", format!("{:?}", state.phase)))
            .with_field(AlertField::inline("Invocation", &state.invocation_id));
        match self.notifier.notify(&alert).await {
            Ok(()) => state.alerts_sent += 1,
            Err(e) => tracing::warn!(error = %e, "Failed to deliver scan failure alert."),
        }

        if let Err(e) = self.metrics.publish(&self.metric_batch(state, false)).await {
            tracing::warn!(error = %e, "Failed to publish failure metrics.");
        }
    }

    fn metric_batch(&self, state: &ScanState, healthy: bool) -> MetricBatch {
        let rpc = self.chain.stats().since(&state.rpc_before);
        let mut batch = MetricBatch::new(&self.settings.metrics_namespace)
            .with_dimension("Network", network_label(&self.settings.network))
            .with_dimension("Policy", self.settings.alert_policy.as_str())
            .with_dimension("InvocationId", &state.invocation_id);

        batch.push(
            names::EXECUTION_DURATION,
            state.started.elapsed().as_secs_f64() * 1000.0,
            MetricUnit::Milliseconds,
        );
        batch.count(names::RPC_FAILURES, rpc.failures);
        batch.count(
            names::RPC_CALLS,
            state.activity.as_ref().map_or(rpc.requests, |a| a.rpc_calls_count),
        );
        batch.count(names::ALERTS_SENT, state.alerts_sent);
        batch.count(names::JOBS_MONITORED, state.jobs_monitored as u64);
        if let Some(activity) = &state.activity {
            batch.count(names::WORK_TRANSACTIONS, activity.total_work_transactions);
        }
        if let Some(stale) = state.stale_jobs {
            batch.count(names::STALE_JOBS, stale as u64);
        }
        batch.count(names::SCAN_HEALTH, u64::from(healthy));
        batch
    }

    fn report(&self, state: ScanState, failure: Option<(ScanPhase, ScanError)>) -> ScanReport {
        let duration_ms = state.started.elapsed().as_millis() as u64;
        let (phase, failed_phase, error) = match failure {
            None => (ScanPhase::Done, None, None),
            Some((phase, error)) => (ScanPhase::Failed, Some(phase), Some(error.to_string())),
        };
        ScanReport {
            success: failed_phase.is_none(),
            phase,
            failed_phase,
            jobs_monitored: state.jobs_monitored,
            activity: state.activity,
            stale_jobs: state.stale_jobs,
            alerts_sent: state.alerts_sent,
            duration_ms,
            error,
        }
    }

    /// Probes the node, the Sequencer, the notifier and the metrics sink.
    #[tracing::instrument(skip(self))]
    pub async fn test_connectivity(&self) -> ScanResponse {
        let mut checks = Vec::with_capacity(4);

        checks.push(match self.chain.get_latest_block_number().await {
            Ok(block) => check("rpc", true, format!("latest block {block}")),
            Err(e) => check("rpc", false, e.to_string()),
        });
        checks.push(match self.directory.num_jobs(self.settings.sequencer_address).await {
            Ok(count) => check("sequencer", true, format!("{count} jobs registered")),
            Err(e) => check("sequencer", false, e.to_string()),
        });

        let alert = Alert::new(
            "Sequencer monitor connectivity test",
            "The monitor can reach this channel.",
            Severity::Info,
        );
        checks.push(match self.notifier.notify(&alert).await {
            Ok(()) => check("notifier", true, "test alert delivered"),
            Err(e) => check("notifier", false, e.to_string()),
        });

        let mut batch = MetricBatch::new(&self.settings.metrics_namespace)
            .with_dimension("Network", network_label(&self.settings.network));
        batch.count(names::CONNECTIVITY_TEST, 1);
        checks.push(match self.metrics.publish(&batch).await {
            Ok(()) => check("metrics", true, "test metric published"),
            Err(e) => check("metrics", false, e.to_string()),
        });

        for c in &checks {
            tracing::info!(check = %c.name, ok = c.ok, detail = %c.detail, "Connectivity check.");
        }
        ScanResponse::ConnectivityTest { success: checks.iter().all(|c| c.ok), checks }
    }

    /// Reads the job count and the chain head without analyzing activity.
    #[tracing::instrument(skip(self))]
    pub async fn status(&self) -> ScanResponse {
        let status = async {
            let job_count = self.directory.num_jobs(self.settings.sequencer_address).await?;
            let current_block = self.chain.get_latest_block_number().await?;
            Ok::<_, ScanError>(StatusReport { job_count, current_block })
        };
        match status.await {
            Ok(status) => ScanResponse::Status { success: true, status: Some(status), error: None },
            Err(e) => {
                tracing::error!(error = %e, "Status query failed.");
                ScanResponse::Status { success: false, status: None, error: Some(e.to_string()) }
            }
        }
    }
}

fn check(name: &str, ok: bool, detail: impl Into<String>) -> ConnectivityCheck {
    ConnectivityCheck { name: name.to_string(), ok, detail: detail.into() }
}

/// The network id as text when it is right-padded ASCII, hex otherwise.
fn network_label(network: &B256) -> String {
    let trimmed: Vec<u8> = network.iter().copied().take_while(|b| *b != 0).collect();
    let padded = network[trimmed.len()..].iter().all(|b| *b == 0);
    match std::str::from_utf8(&trimmed) {
        Ok(text) if padded && !text.is_empty() && text.chars().all(|c| c.is_ascii_graphic()) => {
            text.to_string()
        }
        _ => network.to_string(),
    }
}
